//! QR detection backed by rqrr

use crate::detection::observation::{
    BarcodeDescriptor, BarcodeObservation, ErrorCorrectionLevel, Point, QrDescriptor, Symbology,
};
use crate::detection::BarcodeDetector;
use crate::errors::CameraError;
use image::GrayImage;
use rqrr::PreparedImage;

#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDetector;

impl RqrrDetector {
    pub fn new() -> Self {
        Self
    }
}

impl BarcodeDetector for RqrrDetector {
    fn symbologies(&self) -> &[Symbology] {
        &[Symbology::Qr]
    }

    fn detect(&self, image: &GrayImage) -> Result<Vec<BarcodeObservation>, CameraError> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let mut prepared = PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            image.get_pixel(x as u32, y as u32)[0]
        });
        let grids = prepared.detect_grids();
        log::trace!("rqrr found {} candidate grids", grids.len());

        let mut observations = Vec::with_capacity(grids.len());
        for grid in grids {
            let mut raw = Vec::new();
            let meta = match grid.decode_to(&mut raw) {
                Ok(meta) => meta,
                Err(e) => {
                    log::debug!("Failed to decode QR grid: {}", e);
                    continue;
                }
            };

            let Some(level) = ErrorCorrectionLevel::from_format_bits(meta.ecc_level) else {
                log::debug!("Unexpected ECC level bits {}", meta.ecc_level);
                continue;
            };

            let descriptor = QrDescriptor {
                error_correction_level: level,
                symbol_version: meta.version.0 as u8,
                mask_pattern: meta.mask as u8,
                error_corrected_payload: raw,
            };
            let payload = descriptor.payload_utf8().map(str::to_string);
            let bounds = grid.bounds.map(|p| Point { x: p.x, y: p.y });

            let mut observation = BarcodeObservation::new(Symbology::Qr, payload)
                .with_descriptor(BarcodeDescriptor::Qr(descriptor));
            observation.bounds = Some(bounds);
            observations.push(observation);
        }

        Ok(observations)
    }
}
