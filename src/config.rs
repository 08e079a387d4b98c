//! Configuration management for qrsnap
//!
//! Settings live in a TOML file (`qrsnap.toml` by default). `load_layered`
//! additionally applies `QRSNAP__SECTION__KEY` environment overrides.

use crate::detection::{DetectionOptions, Symbology};
use crate::errors::CameraError;
use crate::photo::{FlashMode, PhotoSettings};
use crate::types::CameraFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrSnapConfig {
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub detection: DetectionConfig,
    pub storage: StorageConfig,
    pub state: StateConfig,
}

/// Which camera to open and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device id; first camera found when unset
    pub device_id: Option<String>,
    /// Requested resolution [width, height]
    pub resolution: [u32; 2],
    pub fps: u32,
    /// Preview frames buffered before the oldest is dropped
    pub preview_buffer: usize,
}

/// Still capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub flash_mode: FlashMode,
    pub auto_still_image_stabilization: bool,
    pub high_resolution: bool,
    /// Enable live photo capture when the device supports it
    pub live_photo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub symbologies: Vec<Symbology>,
    /// 0 disables downscaling
    pub max_dimension: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub save_photos: bool,
    pub output_directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Persisted app state file; platform data dir when unset
    pub path: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            resolution: [1280, 720],
            fps: 30,
            preview_buffer: 2,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            flash_mode: FlashMode::Auto,
            auto_still_image_stabilization: true,
            high_resolution: true,
            live_photo: true,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            symbologies: vec![Symbology::Qr],
            max_dimension: 1280,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_photos: false,
            output_directory: "./captures".to_string(),
        }
    }
}

impl CameraConfig {
    pub fn format(&self) -> CameraFormat {
        CameraFormat::new(self.resolution[0], self.resolution[1], self.fps as f32)
    }
}

impl CaptureConfig {
    pub fn photo_settings(&self) -> PhotoSettings {
        PhotoSettings {
            flash_mode: self.flash_mode,
            auto_still_image_stabilization: self.auto_still_image_stabilization,
            high_resolution_photo_enabled: self.high_resolution,
        }
    }
}

impl DetectionConfig {
    pub fn options(&self) -> DetectionOptions {
        DetectionOptions {
            symbologies: self.symbologies.clone(),
            max_dimension: (self.max_dimension > 0).then_some(self.max_dimension),
        }
    }
}

impl QrSnapConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CameraError::InitializationError(format!("Failed to read config file: {}", e))
        })?;

        let config: QrSnapConfig = toml::from_str(&contents).map_err(|e| {
            CameraError::InitializationError(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the file (if any) and apply `QRSNAP__*` environment overrides
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("QRSNAP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| {
                CameraError::InitializationError(format!("Failed to load configuration: {}", e))
            })?;

        let config: QrSnapConfig = settings.try_deserialize().map_err(|e| {
            CameraError::InitializationError(format!("Invalid configuration: {}", e))
        })?;
        log::debug!("Layered configuration loaded from {:?} and environment", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CameraError::InitializationError(format!(
                        "Failed to create config directory: {}",
                        e
                    ))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CameraError::InitializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            CameraError::InitializationError(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("qrsnap.toml")
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.camera.resolution[0] == 0 || self.camera.resolution[1] == 0 {
            return Err("Invalid camera resolution".to_string());
        }
        if self.camera.fps == 0 || self.camera.fps > 240 {
            return Err("Invalid camera FPS (must be 1-240)".to_string());
        }
        if self.camera.preview_buffer == 0 || self.camera.preview_buffer > 64 {
            return Err("Preview buffer must be between 1 and 64 frames".to_string());
        }
        if self.detection.symbologies.is_empty() {
            return Err("At least one symbology must be enabled".to_string());
        }
        if self.detection.max_dimension != 0 && self.detection.max_dimension < 64 {
            return Err("Detection max dimension must be 0 or at least 64".to_string());
        }
        if self.storage.save_photos && self.storage.output_directory.trim().is_empty() {
            return Err("Output directory required when saving photos".to_string());
        }
        Ok(())
    }
}
