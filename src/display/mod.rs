// src/display/mod.rs
// Presentation adapters: each turns a `Reading` into one device-specific output.
pub mod indicator;
pub mod segment;
pub mod text;

use std::io;

use crate::config::AppConfig;
use crate::drivers::MonitorError;
use crate::recorder::CsvRecorder;
use crate::types::Reading;

pub use indicator::{ColorIndicator, DeviationBand, Rgb};
pub use segment::{Digit, SegmentDisplay, SegmentFrame};
pub use text::TextLog;

/// A consumer of display-ready readings.
pub trait Presenter: Send {
    fn name(&self) -> &'static str;

    fn render(&mut self, reading: &Reading) -> Result<(), MonitorError>;
}

/// Builds the adapters enabled in `config`. The GUI is fed over its own channel and is not listed here.
pub fn presenters_from_config(config: &AppConfig) -> Result<Vec<Box<dyn Presenter>>, MonitorError> {
    let mut presenters: Vec<Box<dyn Presenter>> = Vec::new();
    if config.display.text_log {
        presenters.push(Box::new(TextLog::new()));
    }
    if config.display.segment {
        presenters.push(Box::new(SegmentDisplay::new(io::stdout())));
    }
    if config.display.indicator {
        presenters.push(Box::new(ColorIndicator::new()));
    }
    if let Some(path) = &config.recording {
        let mut recorder = CsvRecorder::new();
        recorder.start(path)?;
        presenters.push(Box::new(recorder));
    }
    Ok(presenters)
}
