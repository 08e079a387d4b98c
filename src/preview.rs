//! Preview surface: holds the session feeding the live preview and the
//! orientation of its video connection.

use crate::orientation::{DeviceOrientation, VideoOrientation};
use crate::session::CaptureSession;
use crate::types::CameraFrame;
use std::time::Duration;

#[derive(Default)]
pub struct PreviewSurface {
    session: Option<CaptureSession>,
    video_orientation: Option<VideoOrientation>,
}

impl PreviewSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// Attaching a session opens the preview connection in the default
    /// orientation; detaching closes it.
    pub fn set_session(&mut self, session: Option<CaptureSession>) {
        self.video_orientation = session.as_ref().map(|_| VideoOrientation::default());
        self.session = session;
    }

    /// `None` while no session is attached
    pub fn video_orientation(&self) -> Option<VideoOrientation> {
        self.video_orientation
    }

    /// Recompute the connection orientation for `device`. No-op without a
    /// connection or when the device lies flat / reports unknown.
    pub fn update_video_orientation(&mut self, device: DeviceOrientation) {
        let Some(current) = self.video_orientation.as_mut() else {
            return;
        };
        let Some(mapped) = VideoOrientation::for_device(device) else {
            log::trace!("Ignoring device orientation {}", device);
            return;
        };
        if *current != mapped {
            log::debug!("Preview orientation {} -> {}", current, mapped);
        }
        *current = mapped;
    }

    pub fn latest_frame(&self, timeout: Duration) -> Option<CameraFrame> {
        self.session
            .as_ref()
            .and_then(|s| s.latest_preview_frame(timeout))
    }
}
