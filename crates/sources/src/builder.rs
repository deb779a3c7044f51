//! Build a camera's source and side task from configuration

use std::sync::Arc;

use contracts::{CameraConfig, FrameSourceFactory, ScheduledTask, SideTask, SourceConfig};
use tracing::debug;

use crate::files::FileSequenceFactory;
use crate::mock::{MockSourceConfig, MockSourceFactory};
use crate::overlay::{OverlayHandle, OverlayTextTask};

/// Everything a camera needs from the source side
pub struct SourceBundle {
    /// Opens frame sources
    pub factory: Arc<dyn FrameSourceFactory>,
    /// Periodic side task, if configured
    pub side_task: Option<ScheduledTask>,
    /// Overlay text read side, if configured
    pub overlay: Option<OverlayHandle>,
}

/// Build the source bundle of one camera.
///
/// Nothing is opened here: a missing directory surfaces as a startup
/// failure on first access, like an unreachable camera would.
pub fn from_config(camera: &CameraConfig) -> SourceBundle {
    let overlay_task = camera.overlay.as_ref().map(|overlay| {
        (
            OverlayTextTask::new(&camera.id, &overlay.text_file),
            overlay.refresh_interval(),
        )
    });
    let overlay = overlay_task.as_ref().map(|(task, _)| task.handle());

    let factory: Arc<dyn FrameSourceFactory> = match &camera.source {
        SourceConfig::Mock(settings) => {
            let config = MockSourceConfig::new(&camera.id, settings.frequency_hz)
                .with_payload_size(settings.payload_size);
            let factory = match &overlay {
                Some(handle) => MockSourceFactory::new(config).with_overlay(handle.clone()),
                None => MockSourceFactory::new(config),
            };
            Arc::new(factory)
        }
        SourceConfig::Files(settings) => {
            Arc::new(FileSequenceFactory::new(&camera.id, settings.clone()))
        }
    };

    let side_task = overlay_task
        .map(|(task, interval)| ScheduledTask::new(Arc::new(task) as Arc<dyn SideTask>, interval));

    debug!(
        source_id = %camera.id,
        kind = camera.source.kind(),
        side_task = side_task.is_some(),
        "source bundle built"
    );

    SourceBundle {
        factory,
        side_task,
        overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MockSourceSettings, OverlayConfig};
    use std::time::Duration;

    #[test]
    fn test_mock_bundle_without_overlay() {
        let camera = CameraConfig::new("cam", SourceConfig::Mock(MockSourceSettings::default()));
        let bundle = from_config(&camera);

        assert_eq!(bundle.factory.source_id(), "cam");
        assert!(bundle.side_task.is_none());
        assert!(bundle.overlay.is_none());
    }

    #[test]
    fn test_overlay_task_feeds_mock_payloads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"hello\n").unwrap();

        let camera = CameraConfig::new(
            "cam",
            SourceConfig::Mock(MockSourceSettings {
                frequency_hz: 1000.0,
                payload_size: 32,
            }),
        )
        .overlay(OverlayConfig::new(file.path()));

        let bundle = from_config(&camera);
        let scheduled = bundle.side_task.expect("overlay task configured");
        assert_eq!(scheduled.interval, Duration::from_secs(3));
        assert_eq!(scheduled.task.name(), "cam:overlay");

        scheduled.task.run().unwrap();
        let mut source = bundle.factory.open().unwrap();
        let payload = source.next_frame().unwrap().unwrap();
        assert_eq!(crate::MockFrameSource::overlay_version_of(&payload), Some(1));
        assert_eq!(bundle.overlay.unwrap().snapshot().lines, vec!["hello"]);
    }
}
