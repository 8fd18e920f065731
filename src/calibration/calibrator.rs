// WaveformCalibrator - applies an external calibration source per event
//
// Construction picks the calibration source once:
// - no serial numbers  -> single-file source
// - serial numbers     -> multi-file source (one serial number per module)
//
// Each apply call validates the event against the scratch buffer, lets the
// source write into it in place and hands back a view of that same buffer.
// The view borrows the calibrator, so a result cannot outlive the next call;
// callers that need a snapshot copy it with `to_owned()` or use
// `apply_owned`.

use std::fmt;
use std::path::Path;

use log::info;
use ndarray::{Array2, ArrayView1, ArrayView2};

use super::buffer::{BufferPolicy, ScratchBuffer};
use super::source::{CalibrationSource, SerialNumber, SourceFactory, SourceKind};
use crate::error::{log_calibration_error, CalibrationError};

/// Calibrates raw (pixel, sample) waveforms one event at a time
pub struct WaveformCalibrator {
    source: Box<dyn CalibrationSource>,
    n_pixels: usize,
    n_samples: usize,
    buffer: ScratchBuffer,
}

impl WaveformCalibrator {
    /// Create a calibrator, selecting the source from `serial_numbers`
    ///
    /// # Arguments
    /// * `factory` - Builds the external calibration source
    /// * `pedestal_path` - Pedestal data location handed to the source
    /// * `n_pixels` - Pixel rows per event
    /// * `n_samples` - Samples per pixel
    /// * `serial_numbers` - `None` for a single-file source, `Some` for a
    ///   multi-file source with one serial number per module in module order
    /// * `policy` - Output buffer allocation policy
    ///
    /// # Returns
    /// * `Err(EmptySerialNumbers)` - `Some` with an empty slice
    /// * `Err(SourceInit)` - the factory could not build the source
    pub fn new<F: SourceFactory + ?Sized>(
        factory: &F,
        pedestal_path: impl AsRef<Path>,
        n_pixels: usize,
        n_samples: usize,
        serial_numbers: Option<&[SerialNumber]>,
        policy: BufferPolicy,
    ) -> Result<Self, CalibrationError> {
        match serial_numbers {
            None => Self::single_file(factory, pedestal_path, n_pixels, n_samples, policy),
            Some(serial_numbers) => Self::multi_file(
                factory,
                pedestal_path,
                serial_numbers,
                n_pixels,
                n_samples,
                policy,
            ),
        }
    }

    /// Create a calibrator backed by a single pedestal file
    pub fn single_file<F: SourceFactory + ?Sized>(
        factory: &F,
        pedestal_path: impl AsRef<Path>,
        n_pixels: usize,
        n_samples: usize,
        policy: BufferPolicy,
    ) -> Result<Self, CalibrationError> {
        let pedestal_path = pedestal_path.as_ref();
        info!(
            "[WaveformCalibrator] Single-file source from {:?}",
            pedestal_path
        );
        let source = factory.single_file(pedestal_path).map_err(|err| {
            log_calibration_error(&err, "single_file");
            err
        })?;
        Ok(Self::from_source(source, n_pixels, n_samples, policy))
    }

    /// Create a calibrator backed by per-module pedestal files
    pub fn multi_file<F: SourceFactory + ?Sized>(
        factory: &F,
        pedestal_path: impl AsRef<Path>,
        serial_numbers: &[SerialNumber],
        n_pixels: usize,
        n_samples: usize,
        policy: BufferPolicy,
    ) -> Result<Self, CalibrationError> {
        if serial_numbers.is_empty() {
            let err = CalibrationError::EmptySerialNumbers;
            log_calibration_error(&err, "multi_file");
            return Err(err);
        }

        let pedestal_path = pedestal_path.as_ref();
        info!(
            "[WaveformCalibrator] Multi-file source from {:?} ({} modules)",
            pedestal_path,
            serial_numbers.len()
        );
        let source = factory
            .multi_file(pedestal_path, serial_numbers)
            .map_err(|err| {
                log_calibration_error(&err, "multi_file");
                err
            })?;
        Ok(Self::from_source(source, n_pixels, n_samples, policy))
    }

    /// Wrap an already constructed calibration source
    pub fn from_source(
        source: Box<dyn CalibrationSource>,
        n_pixels: usize,
        n_samples: usize,
        policy: BufferPolicy,
    ) -> Self {
        Self {
            source,
            n_pixels,
            n_samples,
            buffer: ScratchBuffer::new(policy, (n_pixels, n_samples)),
        }
    }

    pub fn n_pixels(&self) -> usize {
        self.n_pixels
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn buffer_policy(&self) -> BufferPolicy {
        self.buffer.policy()
    }

    /// Current contents of the scratch buffer, `None` until a lazy buffer is set
    pub fn buffer(&self) -> Option<ArrayView2<'_, f32>> {
        self.buffer.view()
    }

    /// Calibrate one event into the reused scratch buffer
    ///
    /// # Arguments
    /// * `waveforms` - Raw ADC counts, shape (pixels, samples)
    /// * `first_cell_ids` - One alignment offset per pixel, passed through untouched
    ///
    /// # Returns
    /// A view of the scratch buffer. Its contents are overwritten by the next call.
    ///
    /// # Errors
    /// * `FirstCellMismatch` - `first_cell_ids.len()` differs from the pixel count
    /// * `ShapeMismatch` - input shape differs from the allocated buffer
    /// * anything the calibration source reports
    pub fn apply(
        &mut self,
        waveforms: ArrayView2<'_, u16>,
        first_cell_ids: ArrayView1<'_, u16>,
    ) -> Result<ArrayView2<'_, f32>, CalibrationError> {
        let shape = waveforms.dim();
        check_first_cells(shape.0, first_cell_ids.len())
            .and_then(|()| self.buffer.check(shape))
            .map_err(|err| {
                log_calibration_error(&err, "apply");
                err
            })?;

        let calibrated = self.buffer.prepare(shape)?;
        tracing::debug!(
            "[WaveformCalibrator] Applying event {}x{}",
            shape.0,
            shape.1
        );
        self.source
            .apply_event(waveforms, first_cell_ids, calibrated.view_mut())
            .map_err(|err| {
                log_calibration_error(&err, "apply");
                err
            })?;

        Ok(calibrated.view())
    }

    /// Calibrate one event into a freshly allocated array
    ///
    /// Validates like [`apply`](Self::apply) but never touches the scratch
    /// buffer, so an unset lazy buffer stays unset.
    pub fn apply_owned(
        &mut self,
        waveforms: ArrayView2<'_, u16>,
        first_cell_ids: ArrayView1<'_, u16>,
    ) -> Result<Array2<f32>, CalibrationError> {
        let shape = waveforms.dim();
        check_first_cells(shape.0, first_cell_ids.len())
            .and_then(|()| self.buffer.check(shape))
            .map_err(|err| {
                log_calibration_error(&err, "apply_owned");
                err
            })?;

        let mut calibrated = Array2::zeros(shape);
        self.source
            .apply_event(waveforms, first_cell_ids, calibrated.view_mut())
            .map_err(|err| {
                log_calibration_error(&err, "apply_owned");
                err
            })?;
        Ok(calibrated)
    }
}

impl fmt::Debug for WaveformCalibrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveformCalibrator")
            .field("source_kind", &self.source.kind())
            .field("n_pixels", &self.n_pixels)
            .field("n_samples", &self.n_samples)
            .field("buffer", &self.buffer)
            .finish()
    }
}

fn check_first_cells(pixels: usize, first_cells: usize) -> Result<(), CalibrationError> {
    if pixels == first_cells {
        Ok(())
    } else {
        Err(CalibrationError::FirstCellMismatch {
            pixels,
            first_cells,
        })
    }
}
