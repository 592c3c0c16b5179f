// Synthetic signals and readings shared by the tests.
use crate::monitor::scale::ScaleSelection;
use crate::types::{Diagnostics, Reading, Sample, SmoothedValue};

/// Symmetric triangle between `low` and `high`, `half_period` samples per slope.
/// Both peaks are hit exactly once per period.
pub(crate) fn triangle_wave(low: Sample, high: Sample, half_period: usize, periods: usize) -> Vec<Sample> {
    let period = half_period * 2;
    let span = f32::from(high - low);
    (0..period * periods)
        .map(|i| {
            let phase = i % period;
            let tri = if phase <= half_period { phase } else { period - phase };
            low + (tri as f32 * span / half_period as f32).round() as Sample
        })
        .collect()
}

/// A reading as the consumer would produce it, with plausible diagnostics.
pub(crate) fn reading(max_deviation: f32, average_dc: f32) -> Reading {
    Reading {
        value: SmoothedValue {
            max_deviation,
            average_dc,
        },
        diagnostics: Diagnostics {
            raw_min: 1448,
            raw_max: 2648,
            waveform_count: 3,
            waveform_peak_max: 1203,
            waveform_peak_min: 1198,
            peak_to_peak_volts: 0.9668,
            windows_published: 64,
            overruns: 0,
        },
        scale: ScaleSelection::Primary,
    }
}
