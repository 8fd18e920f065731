// Reference calibration source
//
// Deterministic stand-in for the external engine: every sample becomes
// (raw - offset) * gain. It ignores the pedestal file contents and the first
// cell ids, which makes CLI and integration runs reproducible without the
// native calibration library.

use std::path::{Path, PathBuf};

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2, Zip};
use serde::{Deserialize, Serialize};

use super::source::{CalibrationSource, SerialNumber, SourceFactory, SourceKind};
use crate::error::CalibrationError;

/// Flat offset/gain transform applied to every sample
#[derive(Debug, Clone)]
pub struct ReferenceSource {
    kind: SourceKind,
    pedestal_path: PathBuf,
    serial_numbers: Vec<SerialNumber>,
    offset: f32,
    gain: f32,
}

impl ReferenceSource {
    pub fn pedestal_path(&self) -> &Path {
        &self.pedestal_path
    }

    /// Module serial numbers, empty for a single-file source
    pub fn serial_numbers(&self) -> &[SerialNumber] {
        &self.serial_numbers
    }
}

impl CalibrationSource for ReferenceSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn apply_event(
        &mut self,
        waveforms: ArrayView2<'_, u16>,
        _first_cell_ids: ArrayView1<'_, u16>,
        calibrated: ArrayViewMut2<'_, f32>,
    ) -> Result<(), CalibrationError> {
        if waveforms.dim() != calibrated.dim() {
            return Err(CalibrationError::SourceApply {
                reason: format!(
                    "output {:?} does not match input {:?}",
                    calibrated.dim(),
                    waveforms.dim()
                ),
            });
        }

        let (offset, gain) = (self.offset, self.gain);
        Zip::from(calibrated)
            .and(&waveforms)
            .for_each(|out, &raw| *out = (raw as f32 - offset) * gain);
        Ok(())
    }
}

/// Builds [`ReferenceSource`]s with a fixed offset and gain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFactory {
    pub offset: f32,
    pub gain: f32,
}

impl Default for ReferenceFactory {
    fn default() -> Self {
        Self {
            offset: 0.0,
            gain: 1.0,
        }
    }
}

impl ReferenceFactory {
    fn build(
        &self,
        kind: SourceKind,
        pedestal_path: &Path,
        serial_numbers: &[SerialNumber],
    ) -> Result<Box<dyn CalibrationSource>, CalibrationError> {
        if pedestal_path.as_os_str().is_empty() {
            return Err(CalibrationError::SourceInit {
                reason: "pedestal path is empty".to_string(),
            });
        }

        Ok(Box::new(ReferenceSource {
            kind,
            pedestal_path: pedestal_path.to_path_buf(),
            serial_numbers: serial_numbers.to_vec(),
            offset: self.offset,
            gain: self.gain,
        }))
    }
}

impl SourceFactory for ReferenceFactory {
    fn single_file(
        &self,
        pedestal_path: &Path,
    ) -> Result<Box<dyn CalibrationSource>, CalibrationError> {
        self.build(SourceKind::SingleFile, pedestal_path, &[])
    }

    fn multi_file(
        &self,
        pedestal_path: &Path,
        serial_numbers: &[SerialNumber],
    ) -> Result<Box<dyn CalibrationSource>, CalibrationError> {
        self.build(SourceKind::MultiFile, pedestal_path, serial_numbers)
    }
}
