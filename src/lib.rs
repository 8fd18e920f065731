// Waveform Calibration Adapter
// Forwards raw detector waveforms to an external calibration engine per event

// Module declarations
pub mod calibration;
pub mod config;
pub mod error;
pub mod fixtures;

// Re-exports for convenience
pub use calibration::{
    build_from_reader, BufferPolicy, CalibrationSource, ModuleReader, SerialNumber,
    SourceFactory, SourceKind, WaveformCalibrator,
};
pub use error::{CalibrationError, ErrorCode};

use log::info;

/// Install the stderr log subscriber
///
/// `level` is one of error, warn, info, debug or trace; anything else falls
/// back to info. Records emitted through `log` are forwarded as well. Safe to
/// call more than once: later calls leave the first subscriber in place.
pub fn init_logging(level: &str) {
    let max_level = level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let installed = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        info!("Logging initialized at {}", max_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging("debug");
        init_logging("not-a-level");
    }
}
