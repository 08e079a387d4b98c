use crate::detection::{
    BarcodeDescriptor, BarcodeDetector, BarcodeObservation, ErrorCorrectionLevel, QrDescriptor,
    Symbology,
};
use crate::errors::CameraError;
use crate::reporter::{DetectionReport, ReportSink};
use image::GrayImage;
use std::sync::{Arc, Mutex};

/// QR observation carrying `payload` as its raw bytes
pub fn qr_observation(payload: &[u8]) -> BarcodeObservation {
    let descriptor = QrDescriptor {
        error_correction_level: ErrorCorrectionLevel::M,
        symbol_version: 1,
        mask_pattern: 0,
        error_corrected_payload: payload.to_vec(),
    };
    let text = descriptor.payload_utf8().map(str::to_string);
    BarcodeObservation::new(Symbology::Qr, text).with_descriptor(BarcodeDescriptor::Qr(descriptor))
}

/// Detector that returns the same observations for every image
#[derive(Debug, Clone, Default)]
pub struct CannedDetector {
    observations: Vec<BarcodeObservation>,
}

impl CannedDetector {
    pub fn new(observations: Vec<BarcodeObservation>) -> Self {
        Self { observations }
    }
}

impl BarcodeDetector for CannedDetector {
    fn symbologies(&self) -> &[Symbology] {
        &[Symbology::Qr]
    }

    fn detect(&self, _image: &GrayImage) -> Result<Vec<BarcodeObservation>, CameraError> {
        Ok(self.observations.clone())
    }
}

/// Keeps every emitted report; clones share the same storage
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<DetectionReport>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<DetectionReport> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, report: &DetectionReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report.clone());
        }
    }
}
