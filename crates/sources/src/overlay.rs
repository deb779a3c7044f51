//! Overlay text reload task
//!
//! Re-reads the overlay text file on every run and publishes the trimmed,
//! non-empty lines. Frame sources read the latest snapshot through an
//! [`OverlayHandle`]; line wrapping and drawing are left to them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use contracts::{SideTask, SideTaskError};
use tracing::debug;

/// Snapshot of the overlay text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayText {
    /// Trimmed non-empty lines
    pub lines: Vec<String>,

    /// Number of successful reloads so far (0 = never loaded)
    pub version: u64,

    /// When the text was last reloaded
    pub loaded_at: Option<Instant>,
}

/// Read side of the overlay text, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct OverlayHandle {
    inner: Arc<RwLock<OverlayText>>,
}

impl OverlayHandle {
    /// Current snapshot
    pub fn snapshot(&self) -> OverlayText {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current version
    pub fn version(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .version
    }

    fn replace(&self, lines: Vec<String>) -> u64 {
        let mut text = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        text.lines = lines;
        text.version += 1;
        text.loaded_at = Some(Instant::now());
        text.version
    }
}

/// Side task reloading the overlay text file
pub struct OverlayTextTask {
    name: String,
    path: PathBuf,
    handle: OverlayHandle,
}

impl OverlayTextTask {
    /// Create task for `path`
    pub fn new(source_id: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: format!("{source_id}:overlay"),
            path: path.into(),
            handle: OverlayHandle::default(),
        }
    }

    /// Read side for frame sources
    pub fn handle(&self) -> OverlayHandle {
        self.handle.clone()
    }

    /// Watched file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl SideTask for OverlayTextTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> Result<(), SideTaskError> {
        // On failure the previous text stays in place.
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| SideTaskError::io(&self.name, e))?;
        let lines = Self::parse(&content);
        let line_count = lines.len();
        let version = self.handle.replace(lines);

        debug!(
            task = %self.name,
            path = %self.path.display(),
            lines = line_count,
            version,
            "overlay text reloaded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reload_trims_and_drops_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  Chocen plaza  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "\tlive view").unwrap();

        let task = OverlayTextTask::new("plaza", file.path());
        task.run().unwrap();

        let text = task.handle().snapshot();
        assert_eq!(text.lines, vec!["Chocen plaza", "live view"]);
        assert_eq!(text.version, 1);
        assert!(text.loaded_at.is_some());
    }

    #[test]
    fn test_missing_file_keeps_previous_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.txt");
        std::fs::write(&path, "first\n").unwrap();

        let task = OverlayTextTask::new("plaza", &path);
        task.run().unwrap();

        std::fs::remove_file(&path).unwrap();
        let err = task.run().unwrap_err();
        assert!(matches!(err, SideTaskError::Io { .. }));

        let text = task.handle().snapshot();
        assert_eq!(text.lines, vec!["first"]);
        assert_eq!(text.version, 1);
    }

    #[test]
    fn test_task_name_includes_source() {
        let task = OverlayTextTask::new("plaza", "overlay.txt");
        assert_eq!(task.name(), "plaza:overlay");
        assert_eq!(task.handle().version(), 0);
    }
}
