// src/types.rs
use std::path::PathBuf;

use crate::monitor::scale::ScaleSelection;

/// One ADC conversion result, in `[0, ADC_MAX]`.
pub type Sample = u16;

/// Peaks of one confirmed waveform cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveformEvent {
    pub peak_high: Sample,
    pub peak_low: Sample,
}

impl WaveformEvent {
    pub fn peak_to_peak(&self) -> u32 {
        u32::from(self.peak_high.saturating_sub(self.peak_low))
    }
}

/// Raw sample statistics of one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawStats {
    pub sum: u64,
    pub count: u32,
    pub min: Sample,
    pub max: Sample,
}

impl RawStats {
    /// Mean sample value; `None` for an empty window.
    pub fn average(&self) -> Option<f32> {
        (self.count > 0).then(|| self.sum as f32 / self.count as f32)
    }
}

/// Waveform statistics of one window. Only exists when at least one cycle was confirmed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaveformStats {
    pub sum: u64,
    pub count: u32,
    /// Largest peak-to-peak value seen in the window.
    pub peak_max: u32,
    /// Smallest peak-to-peak value seen in the window.
    pub peak_min: u32,
}

impl WaveformStats {
    pub fn average(&self) -> Option<f32> {
        (self.count > 0).then(|| self.sum as f32 / self.count as f32)
    }
}

/// Immutable result of one completed sample window.
///
/// `waveform` is `None` when no full cycle was detected (silence, or a signal
/// below the jitter threshold); consumers hold their previous output instead
/// of computing a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub raw: RawStats,
    pub waveform: Option<WaveformStats>,
}

impl WindowSnapshot {
    pub fn has_waveform_data(&self) -> bool {
        self.waveform.is_some()
    }

    pub fn waveform_average(&self) -> Option<f32> {
        self.waveform.and_then(|w| w.average())
    }
}

/// The two numbers every presentation layer shows.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothedValue {
    /// Scaled deviation (kHz-equivalent units).
    pub max_deviation: f32,
    /// Average DC level of the window, volts.
    pub average_dc: f32,
}

/// Raw counters for text/log adapters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Diagnostics {
    pub raw_min: Sample,
    pub raw_max: Sample,
    pub waveform_count: u32,
    pub waveform_peak_max: u32,
    pub waveform_peak_min: u32,
    /// Smoothed peak-to-peak level in volts.
    pub peak_to_peak_volts: f32,
    pub windows_published: u64,
    pub overruns: u64,
}

/// A display-ready value plus the context it was computed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub value: SmoothedValue,
    pub diagnostics: Diagnostics,
    pub scale: ScaleSelection,
}

// GUI -> engine
#[derive(Clone, Debug)]
pub enum MonitorCommand {
    SetAlternateScale(bool),
    StartRecording(PathBuf),
    StopRecording,
    Shutdown,
}

// engine -> GUI
#[derive(Clone, Debug)]
pub enum MonitorMessage {
    Log(String),
    SourceStatus(bool),
    Reading(Reading),
    RecordingStatus(bool),
    Overruns(u64),
}
