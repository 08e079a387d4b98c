//! Video device abstraction.
//!
//! `VideoDevice` is the seam between the capture session and whatever
//! produces frames: a physical camera through nokhwa, or a still image.

pub mod native;
pub mod still;

use crate::errors::CameraError;
use crate::types::{CameraDeviceInfo, CameraFormat, CameraFrame};
use std::time::Duration;

pub use native::NativeCamera;
pub use still::StillImageDevice;

/// A source of RGB8 frames
pub trait VideoDevice: Send {
    fn info(&self) -> &CameraDeviceInfo;

    fn format(&self) -> &CameraFormat;

    fn start_stream(&mut self) -> Result<(), CameraError>;

    fn stop_stream(&mut self) -> Result<(), CameraError>;

    fn is_streaming(&self) -> bool;

    /// Block until the next frame is available
    fn capture_frame(&mut self) -> Result<CameraFrame, CameraError>;

    fn has_flash(&self) -> bool {
        false
    }

    fn supports_live_photo(&self) -> bool {
        false
    }

    /// Nominal time between frames, derived from the format's fps
    fn frame_interval(&self) -> Duration {
        let fps = self.format().fps.max(1.0);
        Duration::from_secs_f32(1.0 / fps)
    }
}

/// Finds the video device a controller should use
pub trait DeviceDiscovery: Send {
    fn default_video_device(&self) -> Result<Box<dyn VideoDevice>, CameraError>;
}

/// Discovery over the host's cameras
#[derive(Debug, Clone)]
pub struct CameraSystem {
    device_id: Option<String>,
    format: CameraFormat,
}

impl CameraSystem {
    pub fn new(device_id: Option<String>, format: CameraFormat) -> Self {
        Self { device_id, format }
    }

    /// List the cameras the native backend can see
    pub fn list_cameras() -> Result<Vec<CameraDeviceInfo>, CameraError> {
        native::list_cameras()
    }
}

impl DeviceDiscovery for CameraSystem {
    fn default_video_device(&self) -> Result<Box<dyn VideoDevice>, CameraError> {
        let device_id = match &self.device_id {
            Some(id) => id.clone(),
            None => {
                let cameras = Self::list_cameras()?;
                let first = cameras.into_iter().next().ok_or_else(|| {
                    CameraError::DeviceUnavailable("No video capture device found".to_string())
                })?;
                log::debug!("Using default video device {} ({})", first.id, first.name);
                first.id
            }
        };

        let camera = NativeCamera::open(&device_id, self.format.clone())?;
        Ok(Box::new(camera))
    }
}

/// Discovery that always yields a still-image device
#[derive(Debug, Clone)]
pub struct StillImageDiscovery {
    image: image::DynamicImage,
    name: String,
}

impl StillImageDiscovery {
    pub fn new(image: image::DynamicImage, name: impl Into<String>) -> Self {
        Self {
            image,
            name: name.into(),
        }
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let image = image::open(path)?;
        Ok(Self::new(image, path.display().to_string()))
    }
}

impl DeviceDiscovery for StillImageDiscovery {
    fn default_video_device(&self) -> Result<Box<dyn VideoDevice>, CameraError> {
        Ok(Box::new(StillImageDevice::new(
            self.image.clone(),
            self.name.clone(),
        )))
    }
}
