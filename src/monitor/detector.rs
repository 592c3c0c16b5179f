use crate::config::{CYCLES_TO_CONFIRM, JITTER};
use crate::types::{Sample, WaveformEvent};

/// Reconstructs waveform cycles from the raw sample stream by tracking
/// direction reversals ("crossings") around the running peaks.
///
/// A reversal only counts once the signal has moved back more than the
/// jitter tolerance from the tracked peak, so ADC dither and PL-tone ripple do
/// not register. A cycle is accepted once the crossing count exceeds
/// [`CYCLES_TO_CONFIRM`]. Peaks are not reset on a turn, so right after a
/// trough the stale crest forces the next two crossings at once: on a steady
/// tone that yields one event per period after the first. The threshold is a
/// heuristic rather than a precise cycle boundary; a period estimator based
/// on true zero crossings would be the principled replacement.
///
/// Amplitude changes produce spurious events whose peak-to-peak values mix
/// old and new extrema. A drop in amplitude settles within a period. A rise
/// can leave the detector alternating between two partial values (their mean
/// is about half the true swing) for as long as the new amplitude holds.
#[derive(Clone, Debug)]
pub struct WaveformDetector {
    rising: bool,
    crossings: u32,
    peak_high: Sample,
    peak_low: Sample,
    jitter: Sample,
}

impl WaveformDetector {
    pub fn new(adc_max: Sample) -> Self {
        Self::with_jitter(adc_max, JITTER)
    }

    /// Peaks start as inverted sentinels so the first cycle reports real extrema.
    pub fn with_jitter(adc_max: Sample, jitter: Sample) -> Self {
        Self {
            rising: true,
            crossings: 0,
            peak_high: 0,
            peak_low: adc_max,
            jitter,
        }
    }

    pub fn observe(&mut self, sample: Sample) -> Option<WaveformEvent> {
        if self.rising {
            if sample > self.peak_high {
                self.peak_high = sample;
            } else if self.peak_high - sample > self.jitter {
                self.rising = false;
                self.crossings += 1;
            }
        } else if sample < self.peak_low {
            self.peak_low = sample;
        } else if sample - self.peak_low > self.jitter {
            self.rising = true;
            self.crossings += 1;
        }

        if self.crossings <= CYCLES_TO_CONFIRM {
            return None;
        }
        let event = WaveformEvent {
            peak_high: self.peak_high,
            peak_low: self.peak_low,
        };
        // Start each tracker from the opposite peak so the boundary sample can't pose as a new extreme.
        self.peak_high = event.peak_low;
        self.peak_low = event.peak_high;
        self.crossings = 0;
        Some(event)
    }

    pub fn is_rising(&self) -> bool {
        self.rising
    }

    pub fn crossings(&self) -> u32 {
        self.crossings
    }
}
