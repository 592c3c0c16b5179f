// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::drivers::tone::ToneConfig;
use crate::drivers::MonitorError;
use crate::types::Sample;

/// Resolution of the free-running ADC, fixed at build time by Cargo feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdcResolution {
    Bits8,
    Bits10,
    Bits12,
}

impl AdcResolution {
    pub const fn bits(self) -> u32 {
        match self {
            AdcResolution::Bits8 => 8,
            AdcResolution::Bits10 => 10,
            AdcResolution::Bits12 => 12,
        }
    }
    /// Number of distinct codes; the divisor used for every volt/deviation conversion.
    pub const fn full_scale(self) -> u32 {
        1 << self.bits()
    }
    pub const fn max_sample(self) -> Sample {
        (self.full_scale() - 1) as Sample
    }
}

#[cfg(feature = "adc-12bit")]
pub const ADC_RESOLUTION: AdcResolution = AdcResolution::Bits12;
#[cfg(all(feature = "adc-10bit", not(feature = "adc-12bit")))]
pub const ADC_RESOLUTION: AdcResolution = AdcResolution::Bits10;
#[cfg(all(
    feature = "adc-8bit",
    not(any(feature = "adc-10bit", feature = "adc-12bit"))
))]
pub const ADC_RESOLUTION: AdcResolution = AdcResolution::Bits8;
#[cfg(not(any(feature = "adc-8bit", feature = "adc-10bit", feature = "adc-12bit")))]
pub const ADC_RESOLUTION: AdcResolution = AdcResolution::Bits12;

/// ADC full-scale count (256 / 1024 / 4096).
pub const ADC_BITS: u32 = ADC_RESOLUTION.full_scale();
/// Largest sample the ADC can produce.
pub const ADC_MAX: Sample = ADC_RESOLUTION.max_sample();

/// Samples aggregated per window before a snapshot is published.
pub const SAMPLE_WINDOW: usize = 750;
/// Per-window averages held by the smoothing ring.
pub const SMOOTHING_WINDOW: usize = 64;
/// Minimum backward movement (counts) from a tracked peak that counts as a reversal.
pub const JITTER: Sample = 5;
/// A waveform is accepted once the reversal count exceeds this value (one period once primed).
pub const CYCLES_TO_CONFIRM: u32 = 3;
/// Supply voltage used for volt conversion.
pub const SUPPLY_VOLTS: f32 = 3.3;
/// Deviation scale for the primary receiver (option input high or floating).
pub const SCALE_PRIMARY: f32 = 5.12;
/// Deviation scale for the alternate signal source (option input pulled low).
pub const SCALE_ALTERNATE: f32 = 10.35;
/// Approximate rate of the free-running ADC.
pub const NOMINAL_SAMPLE_RATE_HZ: f32 = 23_000.0;
/// Frequency of the tune tone used for alignment.
pub const TUNE_TONE_HZ: f32 = 1500.0;

/// Host-side settings: which collaborators feed and consume the core.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    /// Initial state of the scale option input.
    pub alternate_scale: bool,
    pub display: DisplayConfig,
    /// Append every reading to this CSV file when set.
    pub recording: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Simulated(ToneConfig),
    Serial {
        port: String,
        baud_rate: u32,
        sample_rate_hz: f32,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Simulated(ToneConfig::default())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub gui: bool,
    pub text_log: bool,
    pub segment: bool,
    pub indicator: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            gui: false,
            text_log: true,
            segment: false,
            indicator: false,
        }
    }
}

impl AppConfig {
    /// Loads settings from a JSON file. No path, or a path that does not exist, yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            log::warn!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, MonitorError> {
        serde_json::from_str(text)
            .map_err(|e| MonitorError::Config(format!("failed to parse config: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), MonitorError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MonitorError::Config(format!("failed to serialize config: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }
}
