use crate::config::SAMPLE_WINDOW;
use crate::monitor::detector::WaveformDetector;
use crate::types::{RawStats, Sample, WaveformEvent, WaveformStats, WindowSnapshot};

/// Accumulates raw-sample and waveform statistics over `W` samples.
///
/// Lives entirely in the producer context. `on_sample` does a fixed amount of
/// work and never blocks; every `W`-th call hands back the finished window as
/// an owned snapshot and starts the next one from scratch.
pub struct WindowAggregator<const W: usize> {
    detector: WaveformDetector,
    adc_max: Sample,
    raw_sum: u64,
    raw_count: u32,
    raw_min: Sample,
    raw_max: Sample,
    wf_sum: u64,
    wf_count: u32,
    wf_peak_max: u32,
    wf_peak_min: u32,
}

pub type DefaultWindowAggregator = WindowAggregator<SAMPLE_WINDOW>;

impl<const W: usize> WindowAggregator<W> {
    pub fn new(adc_max: Sample) -> Self {
        Self::with_detector(WaveformDetector::new(adc_max), adc_max)
    }

    pub fn with_detector(detector: WaveformDetector, adc_max: Sample) -> Self {
        Self {
            detector,
            adc_max,
            raw_sum: 0,
            raw_count: 0,
            raw_min: adc_max,
            raw_max: 0,
            wf_sum: 0,
            wf_count: 0,
            wf_peak_max: 0,
            wf_peak_min: u32::from(adc_max),
        }
    }

    pub const fn window_len(&self) -> usize {
        W
    }

    /// Samples accumulated in the window currently being built.
    pub fn pending_samples(&self) -> u32 {
        self.raw_count
    }

    pub fn on_sample(&mut self, sample: Sample) -> Option<WindowSnapshot> {
        self.raw_sum += u64::from(sample);
        self.raw_count += 1;
        if sample > self.raw_max {
            self.raw_max = sample;
        }
        if sample < self.raw_min {
            self.raw_min = sample;
        }

        if let Some(event) = self.detector.observe(sample) {
            self.fold_waveform(event);
        }

        if (self.raw_count as usize) < W {
            return None;
        }
        Some(self.take_snapshot())
    }

    fn fold_waveform(&mut self, event: WaveformEvent) {
        let p2p = event.peak_to_peak();
        self.wf_sum += u64::from(p2p);
        self.wf_count += 1;
        self.wf_peak_max = self.wf_peak_max.max(p2p);
        self.wf_peak_min = self.wf_peak_min.min(p2p);
    }

    fn take_snapshot(&mut self) -> WindowSnapshot {
        let waveform = (self.wf_count > 0).then(|| WaveformStats {
            sum: self.wf_sum,
            count: self.wf_count,
            peak_max: self.wf_peak_max,
            peak_min: self.wf_peak_min,
        });
        let snapshot = WindowSnapshot {
            raw: RawStats {
                sum: self.raw_sum,
                count: self.raw_count,
                min: self.raw_min,
                max: self.raw_max,
            },
            waveform,
        };
        self.reset();
        snapshot
    }

    // Detector state carries over: a cycle may straddle the boundary.
    fn reset(&mut self) {
        self.raw_sum = 0;
        self.raw_count = 0;
        self.raw_min = self.adc_max;
        self.raw_max = 0;
        self.wf_sum = 0;
        self.wf_count = 0;
        self.wf_peak_max = 0;
        self.wf_peak_min = u32::from(self.adc_max);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::monitor::testing::triangle_wave;

    fn feed<const W: usize>(agg: &mut WindowAggregator<W>, samples: &[Sample]) -> Vec<WindowSnapshot> {
        samples.iter().filter_map(|&s| agg.on_sample(s)).collect()
    }

    #[test]
    fn publishes_exactly_once_per_window() {
        let mut agg = WindowAggregator::<750>::new(4095);
        let samples = vec![2048; 749];
        assert!(feed(&mut agg, &samples).is_empty());
        assert_eq!(agg.pending_samples(), 749);
        let snapshot = agg.on_sample(2048).expect("window should close");
        assert_eq!(snapshot.raw.count, 750);
        assert_eq!(agg.pending_samples(), 0);
        assert_eq!(agg.window_len(), 750);
    }

    #[test]
    fn raw_extrema_and_sum_cover_exactly_the_window() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<Sample> = (0..32 * 5).map(|_| rng.gen_range(0..=4095)).collect();
        let mut agg = WindowAggregator::<32>::new(4095);
        let snapshots = feed(&mut agg, &samples);
        assert_eq!(snapshots.len(), 5);
        for (snapshot, chunk) in snapshots.iter().zip(samples.chunks(32)) {
            assert_eq!(snapshot.raw.min, *chunk.iter().min().unwrap());
            assert_eq!(snapshot.raw.max, *chunk.iter().max().unwrap());
            assert_eq!(snapshot.raw.sum, chunk.iter().map(|&s| u64::from(s)).sum::<u64>());
            assert!(snapshot.raw.min <= snapshot.raw.max);
        }
    }

    #[test]
    fn first_sample_sets_both_bounds() {
        let mut agg = WindowAggregator::<1>::new(4095);
        let snapshot = agg.on_sample(1234).unwrap();
        assert_eq!((snapshot.raw.min, snapshot.raw.max), (1234, 1234));
    }

    #[test]
    fn bounds_reset_between_windows() {
        let mut agg = WindowAggregator::<4>::new(4095);
        let snapshots = feed(&mut agg, &[100, 200, 150, 120, 1000, 1100, 1050, 1010]);
        assert_eq!((snapshots[0].raw.min, snapshots[0].raw.max), (100, 200));
        assert_eq!((snapshots[1].raw.min, snapshots[1].raw.max), (1000, 1100));
    }

    #[test]
    fn flat_signal_carries_no_waveform_marker() {
        let mut agg = WindowAggregator::<750>::new(4095);
        let snapshots = feed(&mut agg, &[2048; 1500]);
        assert_eq!(snapshots.len(), 2);
        for snapshot in snapshots {
            assert!(!snapshot.has_waveform_data());
            assert_eq!(snapshot.waveform_average(), None);
            assert_eq!(snapshot.raw.average(), Some(2048.0));
        }
    }

    #[test]
    fn triangle_windows_report_peak_to_peak() {
        // Period 250 samples, three cycles per window.
        let samples = triangle_wave(1448, 2648, 125, 9);
        let mut agg = WindowAggregator::<750>::new(4095);
        let snapshots = feed(&mut agg, &samples);
        assert_eq!(snapshots.len(), 3);
        // First window spends a period priming the detector.
        assert_eq!(snapshots[0].waveform.unwrap().count, 2);
        for snapshot in &snapshots[1..] {
            let wf = snapshot.waveform.unwrap();
            assert_eq!(wf.count, 3);
            assert_eq!(wf.sum, 3600);
            assert_eq!((wf.peak_min, wf.peak_max), (1200, 1200));
        }
        for snapshot in &snapshots {
            assert_eq!(snapshot.waveform_average(), Some(1200.0));
            assert_eq!((snapshot.raw.min, snapshot.raw.max), (1448, 2648));
        }
    }

    #[test]
    fn waveform_extrema_match_detector_events() {
        // An amplitude step, which also yields mixed-extrema events.
        let mut samples = triangle_wave(1800, 2300, 50, 3);
        samples.extend(triangle_wave(1500, 2600, 50, 3));
        let p2p: Vec<u32> = samples
            .iter()
            .scan(WaveformDetector::new(4095), |detector, &s| Some(detector.observe(s)))
            .flatten()
            .map(|event| event.peak_to_peak())
            .collect();

        let mut agg = WindowAggregator::<600>::new(4095);
        let snapshot = feed(&mut agg, &samples).pop().unwrap();
        let wf = snapshot.waveform.unwrap();
        assert_eq!(wf.count as usize, p2p.len());
        assert_eq!(wf.sum, p2p.iter().map(|&v| u64::from(v)).sum::<u64>());
        assert_eq!(wf.peak_max, *p2p.iter().max().unwrap());
        assert_eq!(wf.peak_min, *p2p.iter().min().unwrap());
        assert!(wf.peak_min < 500);
    }
}
