//! Configuration management for the calibration harness
//!
//! This module loads calibrator settings from JSON files so a camera setup
//! (pedestal location, dimensions, module serial numbers) can be changed
//! without recompiling.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::{
    BufferPolicy, ReferenceFactory, SerialNumber, SourceFactory, WaveformCalibrator,
};
use crate::error::{CalibrationError, ErrorCode};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub calibrator: CalibratorConfig,
    #[serde(default)]
    pub reference: ReferenceFactory,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Waveform calibrator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratorConfig {
    /// Pedestal data location handed to the calibration source
    pub pedestal_path: PathBuf,
    /// Pixel rows per event
    pub n_pixels: usize,
    /// Samples per pixel waveform
    pub n_samples: usize,
    /// Per-module serial numbers; absent selects the single-file source
    #[serde(default)]
    pub serial_numbers: Option<Vec<SerialNumber>>,
    /// Output buffer allocation policy
    #[serde(default)]
    pub buffer_policy: BufferPolicy,
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            pedestal_path: PathBuf::from("pedestal.tcal"),
            // 32 modules x 64 pixels
            n_pixels: 2048,
            n_samples: 128,
            serial_numbers: None,
            buffer_policy: BufferPolicy::Eager,
        }
    }
}

impl CalibratorConfig {
    /// Reject settings no calibrator can be built from
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.n_pixels == 0 || self.n_samples == 0 {
            return Err(CalibrationError::Config {
                reason: format!(
                    "n_pixels and n_samples must be positive (got {}x{})",
                    self.n_pixels, self.n_samples
                ),
            });
        }
        if matches!(&self.serial_numbers, Some(sns) if sns.is_empty()) {
            return Err(CalibrationError::Config {
                reason: "serial_numbers must be omitted or non-empty".to_string(),
            });
        }
        Ok(())
    }

    /// Build a calibrator from these settings
    pub fn build<F: SourceFactory + ?Sized>(
        &self,
        factory: &F,
    ) -> Result<WaveformCalibrator, CalibrationError> {
        self.validate()?;
        WaveformCalibrator::new(
            factory,
            &self.pedestal_path,
            self.n_pixels,
            self.n_samples,
            self.serial_numbers.as_deref(),
            self.buffer_policy,
        )
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Maximum level: error, warn, info, debug or trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the default configuration if the file
    /// is missing or its JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!(
                    "[Config] Failed to load {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err.message()
                );
                Self::default()
            }
        }
    }

    /// Load and validate configuration from JSON file
    ///
    /// # Errors
    /// * `Config` - unreadable file, invalid JSON, or invalid calibrator settings
    pub fn try_load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let contents = fs::read_to_string(&path)?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|err| CalibrationError::Config {
                reason: format!("{:?}: {}", path.as_ref(), err),
            })?;
        config.calibrator.validate()?;
        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }
}
