//! Directory replay source
//!
//! Serves the files of a directory, in file name order, as frame payloads.
//! Useful to replay a recorded sequence of encoded frames.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{FileSourceSettings, FrameSource, FrameSourceFactory, SourceError};
use tracing::{debug, warn};

use crate::pacing::Pacer;

/// Opens [`FileSequenceSource`]s over one directory
pub struct FileSequenceFactory {
    source_id: String,
    settings: FileSourceSettings,
}

impl FileSequenceFactory {
    /// Create new factory
    pub fn new(source_id: impl Into<String>, settings: FileSourceSettings) -> Self {
        Self {
            source_id: source_id.into(),
            settings,
        }
    }

    fn list_frames(&self, directory: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let entries = std::fs::read_dir(directory).map_err(|e| {
            SourceError::open_with(
                &self.source_id,
                format!("cannot read directory {}", directory.display()),
                e,
            )
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }
}

impl FrameSourceFactory for FileSequenceFactory {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn open(&self) -> Result<Box<dyn FrameSource>, SourceError> {
        let files = self.list_frames(&self.settings.directory)?;
        if files.is_empty() {
            return Err(SourceError::open(
                &self.source_id,
                format!("no frames in {}", self.settings.directory.display()),
            ));
        }

        debug!(
            source_id = %self.source_id,
            directory = %self.settings.directory.display(),
            frames = files.len(),
            "file sequence opened"
        );

        Ok(Box::new(FileSequenceSource {
            source_id: self.source_id.clone(),
            files,
            position: 0,
            loop_playback: self.settings.loop_playback,
            pacer: Pacer::new(self.settings.frequency_hz),
        }))
    }
}

/// One opened directory replay
pub struct FileSequenceSource {
    source_id: String,
    files: Vec<PathBuf>,
    position: usize,
    loop_playback: bool,
    pacer: Pacer,
}

impl FileSequenceSource {
    /// Number of files in the sequence
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the sequence is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for FileSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Bytes>, SourceError> {
        if self.position >= self.files.len() {
            if !self.loop_playback {
                return Ok(None);
            }
            self.position = 0;
        }

        self.pacer.wait();
        let path = &self.files[self.position];
        self.position += 1;

        match std::fs::read(path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) => {
                warn!(source_id = %self.source_id, path = %path.display(), error = %e, "frame file unreadable");
                Err(SourceError::transient(
                    &self.source_id,
                    format!("cannot read {}: {e}", path.display()),
                ))
            }
        }
    }

    fn close(&mut self) {
        debug!(source_id = %self.source_id, position = self.position, "file sequence closed");
    }
}
