//! Barcode detection.
//!
//! A [`DetectionRequest`] prepares an image (greyscale, optional downscale)
//! and hands it to a [`BarcodeDetector`]. Observations come back in the
//! coordinates of the original image.

pub mod observation;
pub mod rqrr_detector;

pub use observation::{
    BarcodeDescriptor, BarcodeObservation, ErrorCorrectionLevel, Point, QrDescriptor, Symbology,
};
pub use rqrr_detector::RqrrDetector;

use crate::errors::CameraError;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Finds and decodes barcodes in a greyscale image
pub trait BarcodeDetector: Send + Sync {
    fn symbologies(&self) -> &[Symbology];

    fn detect(&self, image: &GrayImage) -> Result<Vec<BarcodeObservation>, CameraError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOptions {
    /// Symbologies to report; empty means all the detector supports
    pub symbologies: Vec<Symbology>,
    /// Longest side an image is downscaled to before detection
    pub max_dimension: Option<u32>,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            symbologies: vec![Symbology::Qr],
            max_dimension: Some(1280),
        }
    }
}

#[derive(Clone)]
pub struct DetectionRequest {
    detector: Arc<dyn BarcodeDetector>,
    options: DetectionOptions,
}

impl Default for DetectionRequest {
    fn default() -> Self {
        Self::new(Arc::new(RqrrDetector::new()), DetectionOptions::default())
    }
}

impl DetectionRequest {
    pub fn new(detector: Arc<dyn BarcodeDetector>, options: DetectionOptions) -> Self {
        Self { detector, options }
    }

    pub fn options(&self) -> &DetectionOptions {
        &self.options
    }

    pub fn perform(&self, image: &DynamicImage) -> Result<Vec<BarcodeObservation>, CameraError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CameraError::DetectionError("Image is empty".to_string()));
        }

        let wanted: Vec<Symbology> = self
            .options
            .symbologies
            .iter()
            .copied()
            .filter(|s| self.detector.symbologies().contains(s))
            .collect();
        if !self.options.symbologies.is_empty() && wanted.is_empty() {
            log::warn!(
                "Detector supports none of the requested symbologies {:?}",
                self.options.symbologies
            );
            return Ok(Vec::new());
        }

        let (grey, scale) = self.prepare(image);
        let start = std::time::Instant::now();
        let mut observations = self.detector.detect(&grey)?;
        log::debug!(
            "Detection on {}x{} took {}ms",
            grey.width(),
            grey.height(),
            start.elapsed().as_millis()
        );

        if !wanted.is_empty() {
            observations.retain(|o| wanted.contains(&o.symbology));
        }
        if scale != 1.0 {
            for observation in &mut observations {
                observation.scale_bounds(scale);
            }
        }
        Ok(observations)
    }

    /// Greyscale copy and the factor to map its coordinates back
    fn prepare(&self, image: &DynamicImage) -> (GrayImage, f32) {
        match self.options.max_dimension {
            Some(max) if max > 0 && image.width().max(image.height()) > max => {
                let scale = image.width().max(image.height()) as f32 / max as f32;
                let width = ((image.width() as f32 / scale) as u32).max(1);
                let height = ((image.height() as f32 / scale) as u32).max(1);
                let resized = image.resize_exact(width, height, FilterType::Triangle);
                (resized.to_luma8(), scale)
            }
            _ => (image.to_luma8(), 1.0),
        }
    }
}
