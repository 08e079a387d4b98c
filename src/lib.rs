//! qrsnap: snap a photo from a camera and report the barcodes in it
//!
//! The pipeline has three pieces:
//! - a [`PreviewSurface`] that holds the live session and the orientation of
//!   its video connection,
//! - a [`CaptureController`] that configures the [`CaptureSession`] and
//!   snaps still photos,
//! - a [`DetectionReporter`] that runs barcode detection on each photo and
//!   logs what it found.
//!
//! [`App`] ties them to an event loop.
//!
//! # Usage
//! ```rust,no_run
//! use qrsnap::{DetectionReporter, DetectionRequest, StillImageDiscovery};
//! use qrsnap::{CaptureController, DeviceOrientation, QrSnapConfig};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! qrsnap::init_logging();
//! let config = QrSnapConfig::default();
//! let discovery = StillImageDiscovery::from_path("qr-code.png")?;
//! let mut controller = CaptureController::new(Box::new(discovery), &config);
//! controller.configure(DeviceOrientation::Portrait)?;
//! controller.start()?;
//!
//! let reporter = Arc::new(DetectionReporter::new(DetectionRequest::default()));
//! controller.snap_photo(reporter)?.join().ok();
//! controller.stop()?;
//! # Ok(())
//! # }
//! ```
pub mod app;
pub mod config;
pub mod controller;
pub mod detection;
pub mod errors;
pub mod orientation;
pub mod photo;
pub mod platform;
pub mod preview;
pub mod reporter;
pub mod session;
pub mod state;
pub mod types;

// Synthetic frames and sinks for offline testing
pub mod testing;

pub use app::{AlertPresenter, App, TerminalAlert, UiEvent};
pub use config::QrSnapConfig;
pub use controller::CaptureController;
pub use detection::{
    BarcodeDescriptor, BarcodeDetector, BarcodeObservation, DetectionOptions, DetectionRequest,
    ErrorCorrectionLevel, QrDescriptor, RqrrDetector, Symbology,
};
pub use errors::CameraError;
pub use orientation::{DeviceOrientation, VideoOrientation};
pub use photo::{CapturedPhoto, FlashMode, PhotoCaptureDelegate, PhotoOutput, PhotoSettings};
pub use platform::{CameraSystem, DeviceDiscovery, StillImageDiscovery, VideoDevice};
pub use preview::PreviewSurface;
pub use reporter::{DetectionReport, DetectionReporter, JsonSink, LogSink, ReportSink};
pub use session::{CaptureDeviceInput, CaptureSession, SessionConfiguration};
pub use state::{AppState, StateStore};
pub use types::{CameraDeviceInfo, CameraFormat, CameraFrame, Platform};

/// Initialize logging; `RUST_LOG` overrides the default `qrsnap=info`
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("qrsnap=info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        platform: Platform::current(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub platform: Platform,
}
