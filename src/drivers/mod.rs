// src/drivers/mod.rs
// Sample sources feeding the monitor core, plus the crate error type.
pub mod error;
pub mod serial;
pub mod source;
pub mod tone;

pub use error::MonitorError;
pub use serial::{SerialSource, WordDecoder};
pub use source::{ManualSource, SampleBatch, SampleSource};
pub use tone::{ToneConfig, ToneSource};
