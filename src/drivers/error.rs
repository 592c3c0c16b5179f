use thiserror::Error;

use crate::types::Sample;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("sample rate must be at least 1 Hz")]
    InvalidSampleRate,
    #[error("sample {sample} exceeds ADC full scale {max}")]
    SampleOutOfRange { sample: Sample, max: Sample },
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}
