use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use crate::drivers::MonitorError;
use crate::types::Sample;

/// Slowest sample rate any source may report.
pub const MIN_SAMPLE_RATE_HZ: f32 = 1.0;

/// `false` for rates below [`MIN_SAMPLE_RATE_HZ`] and for NaN.
pub fn is_valid_sample_rate(sample_rate_hz: f32) -> bool {
    sample_rate_hz >= MIN_SAMPLE_RATE_HZ
}

/// Consecutive ADC samples delivered by a source in one read.
#[derive(Clone, Debug)]
pub struct SampleBatch {
    pub started_at: SystemTime,
    pub sample_rate_hz: f32,
    pub samples: Vec<Sample>,
}

impl SampleBatch {
    pub fn new(sample_rate_hz: f32, samples: Vec<Sample>) -> Self {
        Self {
            started_at: SystemTime::now(),
            sample_rate_hz,
            samples,
        }
    }

    /// Rejects the whole batch if the rate is unusable or any sample exceeds `adc_max`.
    pub fn validate(&self, adc_max: Sample) -> Result<(), MonitorError> {
        if !is_valid_sample_rate(self.sample_rate_hz) {
            return Err(MonitorError::InvalidSampleRate);
        }
        if let Some(&sample) = self.samples.iter().find(|&&s| s > adc_max) {
            return Err(MonitorError::SampleOutOfRange {
                sample,
                max: adc_max,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate_hz <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f32(self.samples.len() as f32 / self.sample_rate_hz).unwrap_or(Duration::MAX)
    }
}

/// Anything that can yield ADC sample batches on demand. `Ok(None)` means the source is exhausted.
pub trait SampleSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, MonitorError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, MonitorError> {
        (**self).next_batch()
    }
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<SampleBatch>,
}

impl ManualSource {
    pub fn new(batches: impl IntoIterator<Item = SampleBatch>) -> Self {
        Self {
            queue: batches.into_iter().collect(),
        }
    }

    /// Splits one long recording into batches of `batch_len` samples.
    pub fn from_samples(sample_rate_hz: f32, samples: &[Sample], batch_len: usize) -> Self {
        Self::new(
            samples
                .chunks(batch_len.max(1))
                .map(|chunk| SampleBatch::new(sample_rate_hz, chunk.to_vec())),
        )
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl SampleSource for ManualSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, MonitorError> {
        Ok(self.queue.pop_front())
    }
}
