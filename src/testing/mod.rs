//! Testing utilities for qrsnap
//!
//! Synthetic images plus a canned detector and an in-memory report sink,
//! so the whole capture → detect → report path runs without a camera.

pub mod fixtures;
pub mod synthetic_data;

pub use fixtures::{qr_observation, CannedDetector, MemorySink};
pub use synthetic_data::synthetic_image;
