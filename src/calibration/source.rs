// CalibrationSource - seam to the external calibration engine
//
// The per-sample calibration (pedestal subtraction, cell alignment, lookup
// tables) lives outside this crate. Callers hand a SourceFactory to the
// calibrator, which picks the single-file or multi-file constructor once and
// keeps the resulting source for its whole lifetime.

use std::path::Path;

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Identifier selecting the calibration dataset of one acquisition module
pub type SerialNumber = u32;

/// Which constructor path produced a calibration source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One pedestal file for the whole camera
    SingleFile,
    /// One pedestal file per acquisition module, selected by serial number
    MultiFile,
}

/// Calibration engine applying pedestal data to one event
///
/// Implementations write into `calibrated` in place; the caller guarantees
/// `calibrated` has the same shape as `waveforms` and `first_cell_ids` holds
/// one entry per pixel row.
pub trait CalibrationSource: Send {
    /// Constructor path this source was built through
    fn kind(&self) -> SourceKind;

    /// Calibrate one event's raw waveforms into `calibrated`
    fn apply_event(
        &mut self,
        waveforms: ArrayView2<'_, u16>,
        first_cell_ids: ArrayView1<'_, u16>,
        calibrated: ArrayViewMut2<'_, f32>,
    ) -> Result<(), CalibrationError>;
}

/// Builds calibration sources for either constructor path
///
/// This is the only place an external calibration library is touched, so
/// the calibrator itself carries no load-time dependency on it.
pub trait SourceFactory {
    /// Source bound to a single pedestal file
    fn single_file(
        &self,
        pedestal_path: &Path,
    ) -> Result<Box<dyn CalibrationSource>, CalibrationError>;

    /// Source bound to a pedestal file plus one serial number per module
    fn multi_file(
        &self,
        pedestal_path: &Path,
        serial_numbers: &[SerialNumber],
    ) -> Result<Box<dyn CalibrationSource>, CalibrationError>;
}
