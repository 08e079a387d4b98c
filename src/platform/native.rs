//! nokhwa-backed cameras

use crate::errors::CameraError;
use crate::platform::VideoDevice;
use crate::types::{CameraDeviceInfo, CameraFormat, CameraFrame};
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    CallbackCamera,
};

/// List cameras visible to the native backend
pub fn list_cameras() -> Result<Vec<CameraDeviceInfo>, CameraError> {
    let cameras = query(ApiBackend::Auto)
        .map_err(|e| CameraError::InitializationError(format!("Failed to query cameras: {}", e)))?;

    let device_list = cameras
        .into_iter()
        .map(|camera_info| {
            CameraDeviceInfo::new(camera_info.index().to_string(), camera_info.human_name())
                .with_description(camera_info.description().to_string())
                .with_formats(vec![
                    CameraFormat::hd().with_format_type("MJPEG".to_string()),
                    CameraFormat::standard().with_format_type("MJPEG".to_string()),
                    CameraFormat::low().with_format_type("YUYV".to_string()),
                ])
        })
        .collect();

    Ok(device_list)
}

fn camera_index(device_id: &str) -> CameraIndex {
    match device_id.parse::<u32>() {
        Ok(index) => CameraIndex::Index(index),
        Err(_) => CameraIndex::String(device_id.to_string()),
    }
}

/// Camera driven by nokhwa's native backend (V4L2, AVFoundation, MSMF)
pub struct NativeCamera {
    camera: CallbackCamera,
    info: CameraDeviceInfo,
    format: CameraFormat,
}

impl NativeCamera {
    pub fn open(device_id: &str, format: CameraFormat) -> Result<Self, CameraError> {
        let closest = nokhwa::utils::CameraFormat::new(
            Resolution::new(format.width, format.height),
            FrameFormat::MJPEG,
            format.fps.round().max(1.0) as u32,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(closest));

        let camera = CallbackCamera::new(camera_index(device_id), requested, |_| {}).map_err(|e| {
            CameraError::InitializationError(format!("Failed to initialize camera {}: {}", device_id, e))
        })?;

        let info = list_cameras()
            .ok()
            .and_then(|cameras| cameras.into_iter().find(|c| c.id == device_id))
            .unwrap_or_else(|| CameraDeviceInfo::new(device_id.to_string(), device_id.to_string()));

        log::info!("Opened camera {} ({})", info.id, info.name);

        Ok(Self {
            camera,
            info,
            format,
        })
    }
}

impl VideoDevice for NativeCamera {
    fn info(&self) -> &CameraDeviceInfo {
        &self.info
    }

    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn start_stream(&mut self) -> Result<(), CameraError> {
        self.camera
            .open_stream()
            .map_err(|e| CameraError::StreamError(format!("Failed to start stream: {}", e)))
    }

    fn stop_stream(&mut self) -> Result<(), CameraError> {
        self.camera
            .stop_stream()
            .map_err(|e| CameraError::StreamError(format!("Failed to stop stream: {}", e)))
    }

    fn is_streaming(&self) -> bool {
        self.camera.is_stream_open().unwrap_or(false)
    }

    fn capture_frame(&mut self) -> Result<CameraFrame, CameraError> {
        let buffer = self
            .camera
            .poll_frame()
            .map_err(|e| CameraError::CaptureError(format!("Failed to capture frame: {}", e)))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureError(format!("Failed to decode frame: {}", e)))?;
        let (width, height) = (decoded.width(), decoded.height());

        Ok(CameraFrame::new(decoded.into_raw(), width, height, self.info.id.clone()))
    }
}

impl Drop for NativeCamera {
    fn drop(&mut self) {
        if self.camera.is_stream_open().unwrap_or(false) {
            let _ = self.camera.stop_stream();
        }
    }
}

// CallbackCamera is only touched through the session's device mutex
unsafe impl Send for NativeCamera {}
