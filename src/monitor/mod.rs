//! Sampling and estimation core.
//!
//! Samples flow one way: [`detector::WaveformDetector`] inside
//! [`window::WindowAggregator`] (producer context) publishes a
//! [`crate::types::WindowSnapshot`] through [`mailbox`]; the consumer context
//! feeds it to [`smoothing::SmoothingFilter`], which emits a new
//! [`crate::types::SmoothedValue`] once per ring wrap.
pub mod detector;
pub mod mailbox;
pub mod pipeline;
pub mod scale;
pub mod smoothing;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use detector::WaveformDetector;
pub use mailbox::{window_mailbox, WindowPublisher, WindowReceiver};
pub use pipeline::{AcquisitionPipeline, MonitorPipeline};
pub use scale::{Calibration, OptionInput, OptionPin, ScaleSelection};
pub use smoothing::{DefaultSmoothingFilter, SmoothingFilter};
pub use window::{DefaultWindowAggregator, WindowAggregator};
