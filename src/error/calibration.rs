// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`CalibrationError::code`], so callers outside Rust can match on them.
///
/// Error code range: 2001-2007
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Input waveform shape does not match the output buffer
    pub const SHAPE_MISMATCH: i32 = 2001;

    /// First cell index length does not match the pixel count
    pub const FIRST_CELL_MISMATCH: i32 = 2002;

    /// Multi-file source requested without any serial numbers
    pub const EMPTY_SERIAL_NUMBERS: i32 = 2003;

    /// Calibration source could not be constructed
    pub const SOURCE_INIT: i32 = 2004;

    /// Calibration source failed while applying an event
    pub const SOURCE_APPLY: i32 = 2005;

    /// Configuration could not be read or is invalid
    pub const CONFIG: i32 = 2006;

    /// Event input is malformed
    pub const INVALID_EVENT: i32 = 2007;
}

/// Log a calibration error with structured context
///
/// Emits a single `error!` line carrying the error code, the component and
/// the caller-supplied context. Never panics.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=WaveformCalibrator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// Covers construction of the calibration source, per-event application and
/// the configuration/event inputs feeding them.
///
/// Error code ranges: 2001-2007
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Input waveform shape differs from the (pixel, sample) output buffer
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// One first cell id is required per pixel
    FirstCellMismatch { pixels: usize, first_cells: usize },

    /// Multi-file calibration needs at least one module serial number
    EmptySerialNumbers,

    /// Calibration source construction failed
    SourceInit { reason: String },

    /// Calibration source rejected or failed an event
    SourceApply { reason: String },

    /// Configuration file unreadable, unparsable or invalid
    Config { reason: String },

    /// Event fixture is ragged or empty
    InvalidEvent { reason: String },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::ShapeMismatch { .. } => CalibrationErrorCodes::SHAPE_MISMATCH,
            CalibrationError::FirstCellMismatch { .. } => {
                CalibrationErrorCodes::FIRST_CELL_MISMATCH
            }
            CalibrationError::EmptySerialNumbers => CalibrationErrorCodes::EMPTY_SERIAL_NUMBERS,
            CalibrationError::SourceInit { .. } => CalibrationErrorCodes::SOURCE_INIT,
            CalibrationError::SourceApply { .. } => CalibrationErrorCodes::SOURCE_APPLY,
            CalibrationError::Config { .. } => CalibrationErrorCodes::CONFIG,
            CalibrationError::InvalidEvent { .. } => CalibrationErrorCodes::INVALID_EVENT,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::ShapeMismatch { expected, actual } => format!(
                "Waveform shape mismatch: buffer is {}x{}, input is {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            CalibrationError::FirstCellMismatch {
                pixels,
                first_cells,
            } => format!(
                "First cell index mismatch: {} pixels, {} first cell ids",
                pixels, first_cells
            ),
            CalibrationError::EmptySerialNumbers => {
                "Multi-file calibration requires at least one serial number".to_string()
            }
            CalibrationError::SourceInit { reason } => {
                format!("Calibration source init failed: {}", reason)
            }
            CalibrationError::SourceApply { reason } => {
                format!("Calibration source apply failed: {}", reason)
            }
            CalibrationError::Config { reason } => format!("Invalid configuration: {}", reason),
            CalibrationError::InvalidEvent { reason } => format!("Invalid event: {}", reason),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

/// Convert from std::io::Error, which only surfaces while loading inputs
impl From<std::io::Error> for CalibrationError {
    fn from(err: std::io::Error) -> Self {
        CalibrationError::Config {
            reason: err.to_string(),
        }
    }
}
