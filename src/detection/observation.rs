use serde::{Deserialize, Serialize};
use std::fmt;

/// Barcode family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Symbology {
    Qr,
}

impl Symbology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbology::Qr => "QR",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrectionLevel {
    L,
    M,
    Q,
    H,
}

impl ErrorCorrectionLevel {
    /// Decode the two format-information bits (M=0, L=1, H=2, Q=3)
    pub fn from_format_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(ErrorCorrectionLevel::M),
            1 => Some(ErrorCorrectionLevel::L),
            2 => Some(ErrorCorrectionLevel::H),
            3 => Some(ErrorCorrectionLevel::Q),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCorrectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCorrectionLevel::L => "L",
            ErrorCorrectionLevel::M => "M",
            ErrorCorrectionLevel::Q => "Q",
            ErrorCorrectionLevel::H => "H",
        };
        f.write_str(s)
    }
}

/// QR-specific metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrDescriptor {
    pub error_correction_level: ErrorCorrectionLevel,
    pub symbol_version: u8,
    pub mask_pattern: u8,
    /// Concatenated segment data after error correction and segment
    /// decoding; not the raw codewords
    pub error_corrected_payload: Vec<u8>,
}

impl QrDescriptor {
    /// UTF-8 view of the raw payload, `None` when it is not valid UTF-8
    pub fn payload_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.error_corrected_payload).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BarcodeDescriptor {
    Qr(QrDescriptor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// One detected symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeObservation {
    pub symbology: Symbology,
    pub payload: Option<String>,
    pub descriptor: Option<BarcodeDescriptor>,
    /// Corners clockwise from top-left, in image pixels
    pub bounds: Option<[Point; 4]>,
}

impl BarcodeObservation {
    pub fn new(symbology: Symbology, payload: Option<String>) -> Self {
        Self {
            symbology,
            payload,
            descriptor: None,
            bounds: None,
        }
    }

    pub fn with_descriptor(mut self, descriptor: BarcodeDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn qr_descriptor(&self) -> Option<&QrDescriptor> {
        match &self.descriptor {
            Some(BarcodeDescriptor::Qr(qr)) => Some(qr),
            None => None,
        }
    }

    pub(crate) fn scale_bounds(&mut self, scale: f32) {
        if let Some(bounds) = self.bounds.as_mut() {
            for p in bounds.iter_mut() {
                p.x = (p.x as f32 * scale).round() as i32;
                p.y = (p.y as f32 * scale).round() as i32;
            }
        }
    }
}
