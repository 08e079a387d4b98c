//! Still photo output.
//!
//! A `PhotoOutput` is attached to the session's video input on commit. Each
//! capture runs on its own thread and reports to a [`PhotoCaptureDelegate`].

use crate::errors::CameraError;
use crate::orientation::VideoOrientation;
use crate::session::SharedDevice;
use crate::types::CameraFormat;
use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    Auto,
    On,
    Off,
}

/// Per-capture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSettings {
    pub flash_mode: FlashMode,
    pub auto_still_image_stabilization: bool,
    pub high_resolution_photo_enabled: bool,
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            flash_mode: FlashMode::Auto,
            auto_still_image_stabilization: true,
            high_resolution_photo_enabled: true,
        }
    }
}

/// A finished still capture
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub device_id: String,
    pub orientation: VideoOrientation,
    pub settings: PhotoSettings,
    pub flash_fired: bool,
    pub image: DynamicImage,
}

impl CapturedPhoto {
    /// Suggested file name: capture time plus id
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.png",
            self.captured_at.format("%Y%m%d_%H%M%S"),
            self.id.simple()
        )
    }

    /// Write the photo as PNG into `dir`, creating it if needed
    pub fn save_png(&self, dir: impl AsRef<Path>) -> Result<PathBuf, CameraError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        self.image.save_with_format(&path, ImageFormat::Png)?;
        log::info!("Saved photo to {:?}", path);
        Ok(path)
    }
}

/// Receives the result of an asynchronous capture
pub trait PhotoCaptureDelegate: Send + Sync {
    fn photo_output_did_finish(&self, result: Result<CapturedPhoto, CameraError>);
}

struct PhotoConnection {
    device: SharedDevice,
    video_orientation: VideoOrientation,
    live_photo_supported: bool,
    has_flash: bool,
}

struct PhotoOutputState {
    high_resolution_capture_enabled: bool,
    live_photo_capture_enabled: bool,
    connection: Option<PhotoConnection>,
}

#[derive(Clone)]
pub struct PhotoOutput {
    state: Arc<Mutex<PhotoOutputState>>,
}

impl Default for PhotoOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoOutput {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PhotoOutputState {
                high_resolution_capture_enabled: false,
                live_photo_capture_enabled: false,
                connection: None,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PhotoOutputState>, CameraError> {
        self.state
            .lock()
            .map_err(|_| CameraError::poisoned("photo output"))
    }

    pub fn set_high_resolution_capture_enabled(&self, enabled: bool) {
        if let Ok(mut state) = self.lock() {
            state.high_resolution_capture_enabled = enabled;
        }
    }

    pub fn is_high_resolution_capture_enabled(&self) -> bool {
        self.lock()
            .map(|s| s.high_resolution_capture_enabled)
            .unwrap_or(false)
    }

    /// Only known once the output is attached to a device
    pub fn is_live_photo_capture_supported(&self) -> bool {
        self.lock()
            .ok()
            .and_then(|s| s.connection.as_ref().map(|c| c.live_photo_supported))
            .unwrap_or(false)
    }

    pub fn set_live_photo_capture_enabled(&self, enabled: bool) -> Result<(), CameraError> {
        let mut state = self.lock()?;
        let supported = state
            .connection
            .as_ref()
            .is_some_and(|c| c.live_photo_supported);
        if enabled && !supported {
            return Err(CameraError::ConfigurationError(
                "Live photo capture is not supported by this device".to_string(),
            ));
        }
        state.live_photo_capture_enabled = enabled;
        Ok(())
    }

    pub fn is_live_photo_capture_enabled(&self) -> bool {
        self.lock()
            .map(|s| s.live_photo_capture_enabled)
            .unwrap_or(false)
    }

    pub fn is_attached(&self) -> bool {
        self.lock().map(|s| s.connection.is_some()).unwrap_or(false)
    }

    pub fn video_orientation(&self) -> Option<VideoOrientation> {
        self.lock()
            .ok()
            .and_then(|s| s.connection.as_ref().map(|c| c.video_orientation))
    }

    /// Returns false when there is no connection to orient
    pub fn set_video_orientation(&self, orientation: VideoOrientation) -> bool {
        match self.lock() {
            Ok(mut state) => match state.connection.as_mut() {
                Some(connection) => {
                    connection.video_orientation = orientation;
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    pub(crate) fn attach(&self, device: SharedDevice) -> Result<(), CameraError> {
        let (live_photo_supported, has_flash) = {
            let guard = device.lock().map_err(|_| CameraError::poisoned("device"))?;
            (guard.supports_live_photo(), guard.has_flash())
        };
        self.lock()?.connection = Some(PhotoConnection {
            device,
            video_orientation: VideoOrientation::default(),
            live_photo_supported,
            has_flash,
        });
        Ok(())
    }

    /// Start an asynchronous capture. Precondition failures are returned
    /// directly; capture failures go to the delegate.
    pub fn capture_photo(
        &self,
        settings: PhotoSettings,
        delegate: Arc<dyn PhotoCaptureDelegate>,
    ) -> Result<JoinHandle<()>, CameraError> {
        let state = self.lock()?;
        let connection = state.connection.as_ref().ok_or_else(|| {
            CameraError::CaptureError("Photo output has no active video connection".to_string())
        })?;

        if settings.high_resolution_photo_enabled && !state.high_resolution_capture_enabled {
            return Err(CameraError::CaptureError(
                "High resolution photo requested but not enabled on the output".to_string(),
            ));
        }

        let device = connection.device.clone();
        let orientation = connection.video_orientation;
        let has_flash = connection.has_flash;
        drop(state);

        std::thread::Builder::new()
            .name("qrsnap-photo-capture".to_string())
            .spawn(move || {
                let result = capture_still(&device, orientation, settings, has_flash);
                delegate.photo_output_did_finish(result);
            })
            .map_err(|e| CameraError::CaptureError(format!("spawn failed: {e}")))
    }
}

fn capture_still(
    device: &SharedDevice,
    orientation: VideoOrientation,
    settings: PhotoSettings,
    has_flash: bool,
) -> Result<CapturedPhoto, CameraError> {
    let frame = {
        let mut device = device.lock().map_err(|_| CameraError::poisoned("device"))?;
        if !device.is_streaming() {
            return Err(CameraError::CaptureError(
                "Session is not running".to_string(),
            ));
        }
        if settings.flash_mode == FlashMode::On && !has_flash {
            log::warn!("Flash requested but {} has no flash", device.info().id);
        }
        if settings.auto_still_image_stabilization {
            // The first frame after a pause is often stale
            device.capture_frame()?;
        }
        device.capture_frame()?
    };

    let rgb = frame.to_rgb_image().ok_or_else(|| {
        CameraError::CaptureError(format!(
            "Frame buffer of {} bytes does not match {}x{}",
            frame.data.len(),
            frame.width,
            frame.height
        ))
    })?;
    let mut image = DynamicImage::ImageRgb8(rgb);

    if !settings.high_resolution_photo_enabled {
        let limit = CameraFormat::standard();
        if image.width() > limit.width || image.height() > limit.height {
            image = image.resize(limit.width, limit.height, FilterType::Triangle);
        }
    }

    let photo = CapturedPhoto {
        id: Uuid::new_v4(),
        captured_at: frame.timestamp,
        device_id: frame.device_id,
        orientation,
        settings,
        flash_fired: settings.flash_mode == FlashMode::On && has_flash,
        image: orientation.apply(image),
    };
    log::debug!(
        "Captured photo {} ({}x{}, {})",
        photo.id,
        photo.image.width(),
        photo.image.height(),
        photo.orientation
    );
    Ok(photo)
}
