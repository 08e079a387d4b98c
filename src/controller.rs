//! Capture controller: owns the session, wires a camera input and a photo
//! output into it, and snaps photos.

use crate::config::QrSnapConfig;
use crate::errors::CameraError;
use crate::orientation::DeviceOrientation;
use crate::photo::{PhotoCaptureDelegate, PhotoOutput, PhotoSettings};
use crate::platform::DeviceDiscovery;
use crate::preview::PreviewSurface;
use crate::session::{CaptureDeviceInput, CaptureSession};
use std::sync::Arc;
use std::thread::JoinHandle;

pub struct CaptureController {
    session: CaptureSession,
    preview: PreviewSurface,
    discovery: Box<dyn DeviceDiscovery>,
    photo_output: Option<PhotoOutput>,
    photo_settings: PhotoSettings,
    live_photo: bool,
}

impl CaptureController {
    pub fn new(discovery: Box<dyn DeviceDiscovery>, config: &QrSnapConfig) -> Self {
        Self {
            session: CaptureSession::with_preview_capacity(config.camera.preview_buffer),
            preview: PreviewSurface::new(),
            discovery,
            photo_output: None,
            photo_settings: config.capture.photo_settings(),
            live_photo: config.capture.live_photo,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn preview(&self) -> &PreviewSurface {
        &self.preview
    }

    pub fn photo_output(&self) -> Option<&PhotoOutput> {
        self.photo_output.as_ref()
    }

    /// Wire the default video device and a photo output into the session.
    ///
    /// Any rejected step aborts the whole configuration; nothing staged is
    /// kept. Calling this twice is the caller's problem.
    pub fn configure(&mut self, orientation: DeviceOrientation) -> Result<(), CameraError> {
        let device = self.discovery.default_video_device().map_err(|e| {
            log::error!("Could not acquire a video device: {}", e);
            e
        })?;

        let input = CaptureDeviceInput::new(device).map_err(|e| {
            log::error!("Could not create video device input: {}", e);
            e
        })?;

        let output = PhotoOutput::new();
        output.set_high_resolution_capture_enabled(true);

        let mut configuration = self.session.begin_configuration().map_err(|e| {
            log::error!("Could not begin session configuration: {}", e);
            e
        })?;

        if !configuration.can_add_input(&input) {
            log::error!("Could not add video device input to the session");
            return Err(CameraError::ConfigurationError(
                "Session rejected the video input".to_string(),
            ));
        }
        configuration.add_input(input)?;

        if !configuration.can_add_output(&output) {
            log::error!("Could not add photo output to the session");
            return Err(CameraError::ConfigurationError(
                "Session rejected the photo output".to_string(),
            ));
        }
        configuration.add_output(output.clone())?;
        configuration.commit()?;

        if self.live_photo && output.is_live_photo_capture_supported() {
            output.set_live_photo_capture_enabled(true)?;
        }

        self.preview.set_session(Some(self.session.clone()));
        self.preview.update_video_orientation(orientation);
        self.photo_output = Some(output);
        log::info!("Capture session configured");
        Ok(())
    }

    pub fn start(&self) -> Result<(), CameraError> {
        if self.session.is_running() {
            return Ok(());
        }
        self.session.start_running()
    }

    pub fn stop(&self) -> Result<(), CameraError> {
        if !self.session.is_running() {
            return Ok(());
        }
        self.session.stop_running()
    }

    pub fn device_orientation_changed(&mut self, orientation: DeviceOrientation) {
        self.preview.update_video_orientation(orientation);
    }

    /// Capture one photo; the result is delivered to `delegate` on a
    /// background thread.
    pub fn snap_photo(
        &self,
        delegate: Arc<dyn PhotoCaptureDelegate>,
    ) -> Result<JoinHandle<()>, CameraError> {
        let output = self.photo_output.as_ref().ok_or_else(|| {
            log::warn!("Photo output not configured; ignoring capture request");
            CameraError::CaptureError("Photo output not configured".to_string())
        })?;

        if let Some(orientation) = self.preview.video_orientation() {
            output.set_video_orientation(orientation);
        }

        let mut settings = self.photo_settings;
        if settings.high_resolution_photo_enabled && !output.is_high_resolution_capture_enabled() {
            settings.high_resolution_photo_enabled = false;
        }

        output.capture_photo(settings, delegate).map_err(|e| {
            log::error!("Could not start photo capture: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::VideoOrientation;
    use crate::platform::{StillImageDevice, StillImageDiscovery, VideoDevice};
    use crate::photo::CapturedPhoto;
    use image::DynamicImage;
    use std::sync::mpsc;
    use std::sync::Mutex;

    struct UnavailableDiscovery;

    impl DeviceDiscovery for UnavailableDiscovery {
        fn default_video_device(&self) -> Result<Box<dyn VideoDevice>, CameraError> {
            Ok(Box::new(
                StillImageDevice::new(DynamicImage::new_rgb8(4, 4), "gone").unavailable(),
            ))
        }
    }

    struct NoDevice;

    impl DeviceDiscovery for NoDevice {
        fn default_video_device(&self) -> Result<Box<dyn VideoDevice>, CameraError> {
            Err(CameraError::DeviceUnavailable("none".to_string()))
        }
    }

    struct Collect(Mutex<mpsc::Sender<Result<CapturedPhoto, CameraError>>>);

    impl PhotoCaptureDelegate for Collect {
        fn photo_output_did_finish(&self, result: Result<CapturedPhoto, CameraError>) {
            let _ = self.0.lock().unwrap().send(result);
        }
    }

    fn still_controller() -> CaptureController {
        let discovery = StillImageDiscovery::new(DynamicImage::new_rgb8(6, 3), "fixture");
        CaptureController::new(Box::new(discovery), &QrSnapConfig::default())
    }

    #[test]
    fn test_configure_wires_session() {
        let mut controller = still_controller();
        controller.configure(DeviceOrientation::Portrait).unwrap();

        assert!(controller.session().is_configured());
        assert!(controller.preview().session().is_some());
        assert_eq!(
            controller.preview().video_orientation(),
            Some(VideoOrientation::Portrait)
        );
        let output = controller.photo_output().unwrap();
        assert!(output.is_high_resolution_capture_enabled());
        assert!(!output.is_live_photo_capture_enabled());
    }

    #[test]
    fn test_configure_aborts_on_missing_device() {
        let mut controller = CaptureController::new(Box::new(NoDevice), &QrSnapConfig::default());
        assert!(controller.configure(DeviceOrientation::Portrait).is_err());
        assert!(!controller.session().is_configured());
        assert!(controller.photo_output().is_none());
    }

    #[test]
    fn test_configure_aborts_on_unavailable_device() {
        let mut controller =
            CaptureController::new(Box::new(UnavailableDiscovery), &QrSnapConfig::default());
        let err = controller.configure(DeviceOrientation::Unknown).unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
        assert!(controller.preview().session().is_none());
    }

    #[test]
    fn test_second_configure_is_rejected_by_session() {
        let mut controller = still_controller();
        controller.configure(DeviceOrientation::Portrait).unwrap();
        assert!(controller.configure(DeviceOrientation::Portrait).is_err());
        assert!(controller.session().is_configured());
    }

    #[test]
    fn test_configure_rejected_while_transaction_open() {
        let mut controller = still_controller();
        let session = controller.session().clone();
        let open = session.begin_configuration().unwrap();

        let err = controller.configure(DeviceOrientation::Portrait).unwrap_err();
        assert!(matches!(err, CameraError::ConfigurationError(_)));
        assert!(controller.photo_output().is_none());
        assert!(controller.preview().session().is_none());

        drop(open);
        controller.configure(DeviceOrientation::Portrait).unwrap();
        assert!(controller.session().is_configured());
    }

    #[test]
    fn test_snap_before_configure() {
        let controller = still_controller();
        let (tx, _rx) = mpsc::channel();
        assert!(controller
            .snap_photo(Arc::new(Collect(Mutex::new(tx))))
            .is_err());
    }

    #[test]
    fn test_snap_photo_uses_preview_orientation() {
        let mut controller = still_controller();
        controller.configure(DeviceOrientation::Portrait).unwrap();
        controller.start().unwrap();
        controller.device_orientation_changed(DeviceOrientation::LandscapeLeft);

        let (tx, rx) = mpsc::channel();
        controller
            .snap_photo(Arc::new(Collect(Mutex::new(tx))))
            .unwrap()
            .join()
            .unwrap();
        let photo = rx.recv().unwrap().unwrap();
        assert_eq!(photo.orientation, VideoOrientation::LandscapeRight);
        assert_eq!((photo.image.width(), photo.image.height()), (6, 3));

        controller.stop().unwrap();
        assert!(!controller.session().is_running());
    }
}
