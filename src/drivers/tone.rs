use std::f64::consts::TAU;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{ADC_BITS, NOMINAL_SAMPLE_RATE_HZ, TUNE_TONE_HZ};
use crate::drivers::source::is_valid_sample_rate;
use crate::drivers::{MonitorError, SampleBatch, SampleSource};
use crate::types::Sample;

/// Parameters of the simulated demodulated receiver output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub sample_rate_hz: f32,
    pub tone_hz: f32,
    /// DC level in ADC counts.
    pub center: f32,
    /// Tone amplitude in ADC counts (half of peak-to-peak).
    pub amplitude: f32,
    /// Sub-audible PL tone riding on the tune tone.
    pub pl_tone_hz: Option<f32>,
    pub pl_amplitude: f32,
    /// Uniform dither, +/- counts.
    pub noise: f32,
    pub batch_len: usize,
    /// Sleep for the duration of each batch so the stream arrives at the nominal rate.
    pub realtime: bool,
    pub seed: u64,
    /// Stop after this many samples; runs forever when unset.
    pub total_samples: Option<u64>,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: NOMINAL_SAMPLE_RATE_HZ,
            tone_hz: TUNE_TONE_HZ,
            center: ADC_BITS as f32 / 2.0,
            amplitude: ADC_BITS as f32 * 0.15,
            pl_tone_hz: Some(100.0),
            pl_amplitude: ADC_BITS as f32 * 0.01,
            noise: 2.0,
            batch_len: 230,
            realtime: true,
            seed: 0x1500,
            total_samples: None,
        }
    }
}

/// Synthetic tune tone, quantized and clamped like a real ADC.
pub struct ToneSource {
    config: ToneConfig,
    rng: StdRng,
    index: u64,
    adc_max: Sample,
}

impl ToneSource {
    pub fn new(config: ToneConfig, adc_max: Sample) -> Result<Self, MonitorError> {
        if !is_valid_sample_rate(config.sample_rate_hz) {
            return Err(MonitorError::InvalidSampleRate);
        }
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            rng,
            index: 0,
            adc_max,
        })
    }

    pub fn samples_generated(&self) -> u64 {
        self.index
    }

    fn sample_at(&mut self, n: u64) -> Sample {
        let t = n as f64 / f64::from(self.config.sample_rate_hz);
        let mut value = f64::from(self.config.center)
            + f64::from(self.config.amplitude) * (TAU * f64::from(self.config.tone_hz) * t).sin();
        if let Some(pl_hz) = self.config.pl_tone_hz {
            value += f64::from(self.config.pl_amplitude) * (TAU * f64::from(pl_hz) * t).sin();
        }
        if self.config.noise > 0.0 {
            let noise = f64::from(self.config.noise);
            value += self.rng.gen_range(-noise..=noise);
        }
        value.round().clamp(0.0, f64::from(self.adc_max)) as Sample
    }
}

impl SampleSource for ToneSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, MonitorError> {
        let mut len = self.config.batch_len.max(1) as u64;
        if let Some(total) = self.config.total_samples {
            len = len.min(total.saturating_sub(self.index));
            if len == 0 {
                return Ok(None);
            }
        }
        let start = self.index;
        let samples: Vec<Sample> = (start..start + len).map(|n| self.sample_at(n)).collect();
        self.index += len;
        let batch = SampleBatch::new(self.config.sample_rate_hz, samples);
        if self.config.realtime {
            thread::sleep(batch.duration());
        }
        Ok(Some(batch))
    }
}
