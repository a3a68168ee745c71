//! Level estimation constants

use std::time::Duration;

/// Maximum magnitude of a 16-bit signed sample, the 0 dBFS reference
pub const FULL_SCALE: f64 = 32767.0;

/// Offset added to the dBFS value so a quiet room reads roughly 30-40
/// and a full-scale signal reads 96
pub const DB_OFFSET: f64 = 96.0;

/// RMS floor applied before the logarithm
pub const MIN_RMS: f64 = 1.0;

/// Sub-interval between calibration samples
pub const CALIBRATION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default audio sampling rate (Hz)
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Default number of samples per buffer
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
