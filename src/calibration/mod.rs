// Calibration module - waveform calibration adapter
//
// This module provides the pieces around an external calibration engine:
// 1. CalibrationSource / SourceFactory: the seam to the engine
// 2. ScratchBuffer: the reused (pixel, sample) output buffer
// 3. WaveformCalibrator: source selection and per-event apply
// 4. build_from_reader: derive a calibrator from a camera description
//
// Typical use:
// 1. Build a WaveformCalibrator from a factory (or a reader)
// 2. Call apply() once per event with raw waveforms and first cell ids
// 3. Copy the returned view if it must outlive the next event

pub mod buffer;
pub mod calibrator;
pub mod reader;
pub mod reference;
pub mod source;

pub use buffer::{BufferPolicy, ScratchBuffer};
pub use calibrator::WaveformCalibrator;
pub use reader::{build_from_reader, CameraLayout, ModuleReader};
pub use reference::{ReferenceFactory, ReferenceSource};
pub use source::{CalibrationSource, SerialNumber, SourceFactory, SourceKind};
