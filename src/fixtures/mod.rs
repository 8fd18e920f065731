//! Event fixtures for the deterministic CLI harness.
//!
//! A fixture is a JSON file holding one event's raw waveforms, its first
//! cell ids and, optionally, the calibrated values the event should produce.
//! The harness loads it, turns it into arrays for the calibrator and checks
//! the output against the expectations.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::calibration::SourceKind;
use crate::error::CalibrationError;

/// Default location for fixture JSON assets.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

/// One event as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFixture {
    /// Raw ADC counts, one row per pixel
    pub waveforms: Vec<Vec<u16>>,
    /// One first cell id per pixel
    pub first_cell_ids: Vec<u16>,
    /// Expected calibrated output, same layout as `waveforms`
    #[serde(default)]
    pub expected: Option<Vec<Vec<f32>>>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
}

fn default_tolerance() -> f32 {
    1e-3
}

impl EventFixture {
    /// Load a fixture from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let contents = fs::read_to_string(&path).map_err(|err| CalibrationError::InvalidEvent {
            reason: format!("{:?}: {}", path.as_ref(), err),
        })?;
        serde_json::from_str(&contents).map_err(|err| CalibrationError::InvalidEvent {
            reason: format!("{:?}: {}", path.as_ref(), err),
        })
    }

    /// Raw waveforms as a (pixels, samples) array plus the first cell ids
    ///
    /// # Errors
    /// * `InvalidEvent` - no pixels, or rows of differing length
    pub fn to_arrays(&self) -> Result<(Array2<u16>, Array1<u16>), CalibrationError> {
        let waveforms = rows_to_array(&self.waveforms)?;
        Ok((waveforms, Array1::from_vec(self.first_cell_ids.clone())))
    }

    /// Compare calibrated output against the fixture's expectations
    ///
    /// Fixtures without expectations always pass.
    pub fn verify(&self, calibrated: ArrayView2<'_, f32>) -> Result<(), ExpectationDiff> {
        let Some(expected) = &self.expected else {
            return Ok(());
        };

        let mut failures = Vec::new();
        for (pixel, row) in expected.iter().enumerate() {
            for (sample, &value) in row.iter().enumerate() {
                let actual = calibrated.get((pixel, sample)).copied();
                let within = actual.is_some_and(|actual| (actual - value).abs() <= self.tolerance);
                if !within {
                    failures.push(ExpectationFailure {
                        pixel,
                        sample,
                        expected: value,
                        actual,
                    });
                }
            }
        }

        let expected_shape = (
            expected.len(),
            expected.first().map(Vec::len).unwrap_or_default(),
        );
        let shape_matches = calibrated.dim() == expected_shape;

        if failures.is_empty() && shape_matches {
            Ok(())
        } else {
            Err(ExpectationDiff {
                expected_shape,
                actual_shape: calibrated.dim(),
                failures,
            })
        }
    }
}

fn rows_to_array(rows: &[Vec<u16>]) -> Result<Array2<u16>, CalibrationError> {
    let n_pixels = rows.len();
    let n_samples = rows.first().map(Vec::len).ok_or_else(|| {
        CalibrationError::InvalidEvent {
            reason: "event has no pixels".to_string(),
        }
    })?;

    if let Some(pixel) = rows.iter().position(|row| row.len() != n_samples) {
        return Err(CalibrationError::InvalidEvent {
            reason: format!(
                "pixel {} has {} samples, expected {}",
                pixel,
                rows[pixel].len(),
                n_samples
            ),
        });
    }

    let flat: Vec<u16> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((n_pixels, n_samples), flat).map_err(|err| {
        CalibrationError::InvalidEvent {
            reason: err.to_string(),
        }
    })
}

/// Outcome of comparing calibrated output with expectations.
#[derive(Debug, Serialize)]
pub struct ExpectationDiff {
    pub expected_shape: (usize, usize),
    pub actual_shape: (usize, usize),
    pub failures: Vec<ExpectationFailure>,
}

/// Single sample that missed its expected value.
#[derive(Debug, Serialize)]
pub struct ExpectationFailure {
    pub pixel: usize,
    pub sample: usize,
    pub expected: f32,
    pub actual: Option<f32>,
}

/// JSON report emitted by the harness for one calibrated event.
#[derive(Debug, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub fixture: String,
    pub source_kind: SourceKind,
    pub shape: (usize, usize),
    pub calibrated: Vec<Vec<f32>>,
}

impl CalibrationReport {
    pub fn new(fixture: &str, source_kind: SourceKind, calibrated: ArrayView2<'_, f32>) -> Self {
        Self {
            fixture: fixture.to_string(),
            source_kind,
            shape: calibrated.dim(),
            calibrated: calibrated.rows().into_iter().map(|row| row.to_vec()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fixture(expected: Option<Vec<Vec<f32>>>) -> EventFixture {
        EventFixture {
            waveforms: vec![vec![1, 2, 3], vec![4, 5, 6]],
            first_cell_ids: vec![0, 7],
            expected,
            tolerance: default_tolerance(),
        }
    }

    #[test]
    fn test_to_arrays_preserves_layout() {
        let (waveforms, first_cells) = fixture(None).to_arrays().unwrap();
        assert_eq!(waveforms, array![[1u16, 2, 3], [4, 5, 6]]);
        assert_eq!(first_cells, array![0u16, 7]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut event = fixture(None);
        event.waveforms[1].pop();
        let err = event.to_arrays().unwrap_err();
        assert_eq!(
            err,
            CalibrationError::InvalidEvent {
                reason: "pixel 1 has 2 samples, expected 3".to_string()
            }
        );
    }

    #[test]
    fn test_empty_event_rejected() {
        let mut event = fixture(None);
        event.waveforms.clear();
        assert!(event.to_arrays().is_err());
    }

    #[test]
    fn test_verify_without_expectations_passes() {
        let out = Array2::<f32>::zeros((2, 3));
        assert!(fixture(None).verify(out.view()).is_ok());
    }

    #[test]
    fn test_verify_reports_mismatched_samples() {
        let event = fixture(Some(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]));
        let out = array![[1.0f32, 2.0, 3.0], [4.0, 9.0, 6.0]];

        let diff = event.verify(out.view()).unwrap_err();
        assert_eq!(diff.failures.len(), 1);
        assert_eq!(diff.failures[0].pixel, 1);
        assert_eq!(diff.failures[0].sample, 1);
        assert_eq!(diff.failures[0].actual, Some(9.0));
    }

    #[test]
    fn test_verify_reports_shape_difference() {
        let event = fixture(Some(vec![vec![1.0, 2.0]]));
        let out = array![[1.0f32, 2.0], [3.0, 4.0]];

        let diff = event.verify(out.view()).unwrap_err();
        assert!(diff.failures.is_empty());
        assert_eq!(diff.expected_shape, (1, 2));
        assert_eq!(diff.actual_shape, (2, 2));
    }

    #[test]
    fn test_report_rows() {
        let out = array![[0.5f32, 1.5], [2.5, 3.5]];
        let report = CalibrationReport::new("two_pixels", SourceKind::MultiFile, out.view());
        assert_eq!(report.shape, (2, 2));
        assert_eq!(report.calibrated, vec![vec![0.5, 1.5], vec![2.5, 3.5]]);
    }
}
