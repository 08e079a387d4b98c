//! Detection reporter: runs the barcode request on each captured photo and
//! reports what it found.

use crate::detection::{BarcodeObservation, DetectionRequest};
use crate::errors::CameraError;
use crate::photo::{CapturedPhoto, PhotoCaptureDelegate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Shown when a raw payload cannot be decoded as UTF-8
pub const NO_VALUE: &str = "<no value>";

/// Results of one detection pass over one photo
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub photo_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub device_id: String,
    pub observations: Vec<BarcodeObservation>,
}

impl DetectionReport {
    pub fn lines(&self) -> Vec<String> {
        format_observations(&self.observations)
    }
}

/// Human-readable report, one line per entry
pub fn format_observations(observations: &[BarcodeObservation]) -> Vec<String> {
    if observations.is_empty() {
        return vec!["No results found.".to_string()];
    }

    let mut lines = vec![format!("Number of results found: {}", observations.len())];
    for observation in observations {
        lines.push(format!("Symbology: {}", observation.symbology));
        if let Some(payload) = &observation.payload {
            lines.push(format!("Payload: {}", payload));
        }
        if let Some(qr) = observation.qr_descriptor() {
            lines.push(format!(
                "Raw-Payload: {}",
                qr.payload_utf8().unwrap_or(NO_VALUE)
            ));
            lines.push(format!("Error-Correction-Level: {}", qr.error_correction_level));
            lines.push(format!("Symbol-Version: {}", qr.symbol_version));
        }
    }
    lines
}

/// Where finished reports go
pub trait ReportSink: Send + Sync {
    fn emit(&self, report: &DetectionReport);
}

/// Logs each report line at info level
#[derive(Debug, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn emit(&self, report: &DetectionReport) {
        for line in report.lines() {
            log::info!("{}", line);
        }
    }
}

/// Prints each report as a single JSON document on stdout
#[derive(Debug, Default)]
pub struct JsonSink;

impl ReportSink for JsonSink {
    fn emit(&self, report: &DetectionReport) {
        match serde_json::to_string(report) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize detection report: {}", e),
        }
    }
}

pub struct DetectionReporter {
    request: DetectionRequest,
    sink: Box<dyn ReportSink>,
    save_dir: Option<PathBuf>,
}

impl DetectionReporter {
    pub fn new(request: DetectionRequest) -> Self {
        Self::with_sink(request, Box::new(LogSink))
    }

    pub fn with_sink(request: DetectionRequest, sink: Box<dyn ReportSink>) -> Self {
        Self {
            request,
            sink,
            save_dir: None,
        }
    }

    /// Also save every captured photo as PNG into `dir`
    pub fn save_photos_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Run detection on `photo` and emit the report
    pub fn process(&self, photo: &CapturedPhoto) -> Result<DetectionReport, CameraError> {
        if let Some(dir) = &self.save_dir {
            if let Err(e) = photo.save_png(dir) {
                log::warn!("Could not save photo {}: {}", photo.id, e);
            }
        }

        let observations = self.request.perform(&photo.image)?;
        let report = DetectionReport {
            photo_id: photo.id,
            captured_at: photo.captured_at,
            device_id: photo.device_id.clone(),
            observations,
        };
        self.sink.emit(&report);
        Ok(report)
    }
}

impl PhotoCaptureDelegate for DetectionReporter {
    fn photo_output_did_finish(&self, result: Result<CapturedPhoto, CameraError>) {
        let photo = match result {
            Ok(photo) => photo,
            Err(e) => {
                log::error!("Error capturing photo: {}", e);
                return;
            }
        };

        if let Err(e) = self.process(&photo) {
            log::error!("Could not perform barcode request: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BarcodeDescriptor, ErrorCorrectionLevel, QrDescriptor, Symbology};

    fn qr(payload: &[u8]) -> BarcodeObservation {
        let descriptor = QrDescriptor {
            error_correction_level: ErrorCorrectionLevel::M,
            symbol_version: 3,
            mask_pattern: 1,
            error_corrected_payload: payload.to_vec(),
        };
        let text = descriptor.payload_utf8().map(str::to_string);
        BarcodeObservation::new(Symbology::Qr, text).with_descriptor(BarcodeDescriptor::Qr(descriptor))
    }

    #[test]
    fn test_no_results() {
        assert_eq!(format_observations(&[]), vec!["No results found."]);
    }

    #[test]
    fn test_counts_and_groups() {
        let lines = format_observations(&[qr(b"one"), qr(b"two")]);
        assert_eq!(lines[0], "Number of results found: 2");
        assert_eq!(
            &lines[1..6],
            &[
                "Symbology: QR",
                "Payload: one",
                "Raw-Payload: one",
                "Error-Correction-Level: M",
                "Symbol-Version: 3",
            ]
        );
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[7], "Payload: two");
    }

    #[test]
    fn test_invalid_utf8_payload_shows_no_value() {
        let lines = format_observations(&[qr(&[0xc3, 0x28, 0xff])]);
        assert!(lines.contains(&"Raw-Payload: <no value>".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Payload:")));
    }

    #[test]
    fn test_observation_without_descriptor() {
        let lines = format_observations(&[BarcodeObservation::new(Symbology::Qr, None)]);
        assert_eq!(lines, vec!["Number of results found: 1", "Symbology: QR"]);
    }
}
