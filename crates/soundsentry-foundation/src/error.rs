use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Audio subsystem error: {0}")]
    Audio(#[from] AudioError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Input device not found: index {index:?}")]
    DeviceNotFound { index: Option<usize> },

    #[error("No input devices available")]
    NoInputDevices,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("No audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("Short read: got {got} of {want} samples")]
    ShortRead { got: usize, want: usize },

    #[error("Device enumeration error: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

/// Errors raised by the monitor lifecycle and calibration path.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Monitor is not running")]
    NotRunning,

    #[error("Calibration collected no valid readings")]
    CalibrationEmpty,

    #[error("Failed to spawn monitor thread: {0}")]
    Spawn(String),
}
