use crate::errors::CameraError;
use crate::platform::VideoDevice;
use crate::types::{CameraDeviceInfo, CameraFormat, CameraFrame};
use image::{DynamicImage, RgbImage};

/// A "camera" that serves the same still image as every frame
pub struct StillImageDevice {
    image: RgbImage,
    info: CameraDeviceInfo,
    format: CameraFormat,
    streaming: bool,
}

impl StillImageDevice {
    pub fn new(image: DynamicImage, name: impl Into<String>) -> Self {
        let image = image.to_rgb8();
        let name = name.into();
        let format = CameraFormat::new(image.width(), image.height(), 30.0);
        let info = CameraDeviceInfo::new(format!("still:{}", name), name)
            .with_description("Still image source".to_string())
            .with_formats(vec![format.clone()]);

        Self {
            image,
            info,
            format,
            streaming: false,
        }
    }

    /// Mark the device unavailable; inputs cannot be built from it
    pub fn unavailable(mut self) -> Self {
        self.info = self.info.unavailable();
        self
    }
}

impl VideoDevice for StillImageDevice {
    fn info(&self) -> &CameraDeviceInfo {
        &self.info
    }

    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn start_stream(&mut self) -> Result<(), CameraError> {
        self.streaming = true;
        Ok(())
    }

    fn stop_stream(&mut self) -> Result<(), CameraError> {
        self.streaming = false;
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn capture_frame(&mut self) -> Result<CameraFrame, CameraError> {
        if !self.streaming {
            return Err(CameraError::StreamError(format!(
                "Stream for {} is not open",
                self.info.id
            )));
        }
        Ok(CameraFrame::new(
            self.image.as_raw().clone(),
            self.image.width(),
            self.image.height(),
            self.info.id.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_open_stream() {
        let mut device = StillImageDevice::new(DynamicImage::new_rgb8(8, 4), "blank");
        assert!(device.capture_frame().is_err());

        device.start_stream().unwrap();
        let frame = device.capture_frame().unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert!(frame.is_valid());
        assert_eq!(frame.device_id, "still:blank");
    }
}
