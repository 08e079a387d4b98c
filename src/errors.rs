use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Session configuration error: {0}")]
    ConfigurationError(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Stream error: {0}")]
    StreamError(String),
    #[error("Detection error: {0}")]
    DetectionError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl CameraError {
    pub(crate) fn poisoned(what: &str) -> Self {
        CameraError::CaptureError(format!("{} lock poisoned by previous panic", what))
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::IoError(err.to_string())
    }
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        CameraError::IoError(format!("image: {}", err))
    }
}
