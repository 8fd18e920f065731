// Derived construction from a camera reader
//
// A reader describes the camera an event file was taken with: how many
// acquisition modules it has, the serial number of each, and the pixel and
// sample totals. build_from_reader turns that into a multi-file calibrator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::buffer::BufferPolicy;
use super::calibrator::WaveformCalibrator;
use super::source::{SerialNumber, SourceFactory};
use crate::error::CalibrationError;

/// Camera description needed to derive calibration parameters
pub trait ModuleReader {
    /// Number of acquisition modules
    fn n_modules(&self) -> usize;

    /// Serial number of the module at `module` (0-based)
    fn serial_number(&self, module: usize) -> SerialNumber;

    /// Total pixel count across all modules
    fn n_pixels(&self) -> usize;

    /// Samples per pixel waveform
    fn n_samples(&self) -> usize;
}

/// Build a multi-file calibrator from a reader's camera description
///
/// Serial numbers are collected by querying modules `0..n_modules` in order.
///
/// # Errors
/// * `EmptySerialNumbers` - the reader reports zero modules
/// * `SourceInit` - the factory could not build the source
pub fn build_from_reader<F, R>(
    factory: &F,
    pedestal_path: impl AsRef<Path>,
    reader: &R,
    policy: BufferPolicy,
) -> Result<WaveformCalibrator, CalibrationError>
where
    F: SourceFactory + ?Sized,
    R: ModuleReader + ?Sized,
{
    let serial_numbers: Vec<SerialNumber> = (0..reader.n_modules())
        .map(|module| reader.serial_number(module))
        .collect();

    WaveformCalibrator::multi_file(
        factory,
        pedestal_path,
        &serial_numbers,
        reader.n_pixels(),
        reader.n_samples(),
        policy,
    )
}

/// In-memory camera description, one serial number per module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraLayout {
    pub serial_numbers: Vec<SerialNumber>,
    pub n_pixels: usize,
    pub n_samples: usize,
}

impl ModuleReader for CameraLayout {
    fn n_modules(&self) -> usize {
        self.serial_numbers.len()
    }

    fn serial_number(&self, module: usize) -> SerialNumber {
        self.serial_numbers[module]
    }

    fn n_pixels(&self) -> usize {
        self.n_pixels
    }

    fn n_samples(&self) -> usize {
        self.n_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationSource, SourceKind};
    use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2};
    use std::cell::RefCell;

    struct NullSource(SourceKind);

    impl CalibrationSource for NullSource {
        fn kind(&self) -> SourceKind {
            self.0
        }

        fn apply_event(
            &mut self,
            _waveforms: ArrayView2<'_, u16>,
            _first_cell_ids: ArrayView1<'_, u16>,
            _calibrated: ArrayViewMut2<'_, f32>,
        ) -> Result<(), CalibrationError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct SerialCapture {
        serial_numbers: RefCell<Option<Vec<SerialNumber>>>,
    }

    impl SourceFactory for SerialCapture {
        fn single_file(
            &self,
            _pedestal_path: &Path,
        ) -> Result<Box<dyn CalibrationSource>, CalibrationError> {
            Ok(Box::new(NullSource(SourceKind::SingleFile)))
        }

        fn multi_file(
            &self,
            _pedestal_path: &Path,
            serial_numbers: &[SerialNumber],
        ) -> Result<Box<dyn CalibrationSource>, CalibrationError> {
            *self.serial_numbers.borrow_mut() = Some(serial_numbers.to_vec());
            Ok(Box::new(NullSource(SourceKind::MultiFile)))
        }
    }

    /// Reader that counts serial number lookups
    struct CountingReader {
        layout: CameraLayout,
        lookups: RefCell<Vec<usize>>,
    }

    impl ModuleReader for CountingReader {
        fn n_modules(&self) -> usize {
            self.layout.n_modules()
        }

        fn serial_number(&self, module: usize) -> SerialNumber {
            self.lookups.borrow_mut().push(module);
            self.layout.serial_number(module)
        }

        fn n_pixels(&self) -> usize {
            self.layout.n_pixels
        }

        fn n_samples(&self) -> usize {
            self.layout.n_samples
        }
    }

    #[test]
    fn test_serial_numbers_in_module_order() {
        let factory = SerialCapture::default();
        let reader = CountingReader {
            layout: CameraLayout {
                serial_numbers: vec![10, 20, 30],
                n_pixels: 192,
                n_samples: 96,
            },
            lookups: RefCell::new(Vec::new()),
        };

        let calibrator =
            build_from_reader(&factory, "ped.tcal", &reader, BufferPolicy::Eager).unwrap();

        assert_eq!(
            factory.serial_numbers.borrow().as_deref(),
            Some(&[10, 20, 30][..])
        );
        assert_eq!(*reader.lookups.borrow(), vec![0, 1, 2]);
        assert_eq!(calibrator.source_kind(), SourceKind::MultiFile);
    }

    #[test]
    fn test_counts_come_from_reader() {
        let factory = SerialCapture::default();
        let layout = CameraLayout {
            serial_numbers: vec![1],
            n_pixels: 2048,
            n_samples: 128,
        };

        let calibrator =
            build_from_reader(&factory, "ped.tcal", &layout, BufferPolicy::Eager).unwrap();

        assert_eq!(calibrator.n_pixels(), 2048);
        assert_eq!(calibrator.n_samples(), 128);
        assert_eq!(calibrator.buffer().unwrap().dim(), (2048, 128));
    }

    #[test]
    fn test_reader_without_modules_rejected() {
        let factory = SerialCapture::default();
        let layout = CameraLayout {
            serial_numbers: Vec::new(),
            n_pixels: 64,
            n_samples: 128,
        };

        let err =
            build_from_reader(&factory, "ped.tcal", &layout, BufferPolicy::Lazy).unwrap_err();

        assert_eq!(err, CalibrationError::EmptySerialNumbers);
        assert!(factory.serial_numbers.borrow().is_none());
    }
}
