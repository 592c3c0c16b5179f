use crate::drivers::{MonitorError, SampleBatch, SampleSource};
use crate::monitor::mailbox::{WindowPublisher, WindowReceiver};
use crate::monitor::scale::{Calibration, OptionInput};
use crate::monitor::smoothing::SmoothingFilter;
use crate::monitor::window::WindowAggregator;
use crate::types::{Diagnostics, Reading, Sample, WindowSnapshot};

/// Producer context: source -> detector/aggregator -> mailbox.
pub struct AcquisitionPipeline<S: SampleSource, const W: usize> {
    source: S,
    aggregator: WindowAggregator<W>,
    publisher: WindowPublisher,
    adc_max: Sample,
    samples_seen: u64,
}

impl<S: SampleSource, const W: usize> AcquisitionPipeline<S, W> {
    pub fn new(source: S, publisher: WindowPublisher, adc_max: Sample) -> Self {
        Self {
            source,
            aggregator: WindowAggregator::new(adc_max),
            publisher,
            adc_max,
            samples_seen: 0,
        }
    }

    /// Pulls one batch and runs it through the aggregator.
    ///
    /// Returns how many windows were published, or `None` once the source is exhausted.
    pub fn pump_once(&mut self) -> Result<Option<usize>, MonitorError> {
        let Some(batch) = self.source.next_batch()? else {
            return Ok(None);
        };
        let published = self.push_batch(&batch)?;
        Ok(Some(published))
    }

    /// Feeds every sample of `batch`, publishing each completed window.
    /// A batch holding an out-of-range sample is rejected before any sample is used.
    pub fn push_batch(&mut self, batch: &SampleBatch) -> Result<usize, MonitorError> {
        batch.validate(self.adc_max)?;
        let mut published = 0;
        for &sample in &batch.samples {
            if let Some(snapshot) = self.aggregator.on_sample(sample) {
                self.publisher.publish(snapshot);
                published += 1;
            }
        }
        self.samples_seen += batch.samples.len() as u64;
        Ok(published)
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }
}

/// Consumer context: mailbox -> smoothing filter -> display-ready [`Reading`].
pub struct MonitorPipeline<const N: usize> {
    receiver: WindowReceiver,
    filter: SmoothingFilter<N>,
    option: Box<dyn OptionInput>,
    last: Option<Reading>,
    last_snapshot: Option<WindowSnapshot>,
    reported_overruns: u64,
}

impl<const N: usize> MonitorPipeline<N> {
    pub fn new(receiver: WindowReceiver, calibration: Calibration, option: Box<dyn OptionInput>) -> Self {
        Self {
            receiver,
            filter: SmoothingFilter::new(calibration),
            option,
            last: None,
            last_snapshot: None,
            reported_overruns: 0,
        }
    }

    /// Drains at most one window. Returns a reading exactly when the ring wraps.
    pub fn poll(&mut self) -> Option<Reading> {
        let snapshot = self.receiver.take()?;
        self.last_snapshot = Some(snapshot);
        let value = self.filter.on_window_published(&snapshot, self.option.as_ref())?;
        let calibration = self.filter.calibration();
        let waveform = snapshot.waveform.unwrap_or_default();
        let reading = Reading {
            value,
            diagnostics: Diagnostics {
                raw_min: snapshot.raw.min,
                raw_max: snapshot.raw.max,
                waveform_count: waveform.count,
                waveform_peak_max: waveform.peak_max,
                waveform_peak_min: waveform.peak_min,
                peak_to_peak_volts: self
                    .filter
                    .ring_mean()
                    .map(|mean| calibration.volts(mean))
                    .unwrap_or_default(),
                windows_published: self.receiver.published(),
                overruns: self.receiver.overruns(),
            },
            scale: self.filter.last_selection(),
        };
        log::debug!(
            "reading: max dev {:.4} avg dc {:.4} ({} scale)",
            reading.value.max_deviation,
            reading.value.average_dc,
            reading.scale.label()
        );
        self.last = Some(reading);
        Some(reading)
    }

    /// The held display value.
    pub fn last(&self) -> Option<Reading> {
        self.last
    }

    pub fn last_snapshot(&self) -> Option<WindowSnapshot> {
        self.last_snapshot
    }

    pub fn has_pending(&self) -> bool {
        self.receiver.is_ready()
    }

    /// The producer half is gone and no window is left to drain.
    pub fn producer_finished(&self) -> bool {
        self.receiver.is_orphaned() && !self.receiver.is_ready()
    }

    /// Total overruns, if the count advanced since the previous call.
    pub fn new_overruns(&mut self) -> Option<u64> {
        let total = self.receiver.overruns();
        if total == self.reported_overruns {
            return None;
        }
        self.reported_overruns = total;
        Some(total)
    }

    pub fn overruns(&self) -> u64 {
        self.receiver.overruns()
    }

    pub fn windows_published(&self) -> u64 {
        self.receiver.published()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SCALE_PRIMARY, SUPPLY_VOLTS};
    use crate::drivers::ManualSource;
    use crate::monitor::mailbox::window_mailbox;
    use crate::monitor::testing::triangle_wave;

    const RATE: f32 = 23_000.0;

    fn pipelines<const W: usize, const N: usize>(
        source: ManualSource,
        alternate: bool,
    ) -> (AcquisitionPipeline<ManualSource, W>, MonitorPipeline<N>) {
        let (tx, rx) = window_mailbox();
        (
            AcquisitionPipeline::new(source, tx, 4095),
            MonitorPipeline::new(rx, Calibration::default(), Box::new(alternate)),
        )
    }

    /// Pumps the producer to exhaustion, polling after every batch.
    fn run<const W: usize, const N: usize>(
        acq: &mut AcquisitionPipeline<ManualSource, W>,
        mon: &mut MonitorPipeline<N>,
    ) -> Vec<Reading> {
        let mut readings = Vec::new();
        while acq.pump_once().unwrap().is_some() {
            while mon.has_pending() {
                readings.extend(mon.poll());
            }
        }
        readings
    }

    #[test]
    fn end_to_end_mid_scale_tone() {
        // 2048 +/- 600, 250-sample period: three cycles per window, 64 windows.
        let samples = triangle_wave(1448, 2648, 125, 3 * 64);
        assert_eq!(samples.len(), 750 * 64);
        let source = ManualSource::from_samples(RATE, &samples, 230);
        let (mut acq, mut mon) = pipelines::<750, 64>(source, false);

        let readings = run(&mut acq, &mut mon);
        assert_eq!(readings.len(), 1);
        let reading = readings[0];

        let expected = 600.0 * 2.0 * SCALE_PRIMARY / 4096.0;
        assert!((reading.value.max_deviation - expected).abs() < expected * 0.01);
        assert!((reading.value.average_dc - 1.65).abs() < 0.01);
        assert!((reading.diagnostics.peak_to_peak_volts - 1200.0 * SUPPLY_VOLTS / 4096.0).abs() < 1e-4);
        assert_eq!((reading.diagnostics.raw_min, reading.diagnostics.raw_max), (1448, 2648));
        assert_eq!(reading.diagnostics.waveform_count, 3);
        assert_eq!(reading.diagnostics.windows_published, 64);
        assert_eq!(reading.diagnostics.overruns, 0);
        assert_eq!(mon.last(), Some(reading));
        assert_eq!(acq.samples_seen(), 48_000);
    }

    #[test]
    fn alternate_scale_changes_only_deviation() {
        let samples = triangle_wave(1448, 2648, 125, 3 * 4);
        let (mut acq_p, mut mon_p) = pipelines::<750, 4>(ManualSource::from_samples(RATE, &samples, 750), false);
        let (mut acq_a, mut mon_a) = pipelines::<750, 4>(ManualSource::from_samples(RATE, &samples, 750), true);
        let primary = run(&mut acq_p, &mut mon_p)[0];
        let alternate = run(&mut acq_a, &mut mon_a)[0];
        assert!(alternate.value.max_deviation > primary.value.max_deviation);
        assert_eq!(alternate.value.average_dc, primary.value.average_dc);
        assert_eq!(alternate.scale.label(), "alternate");
    }

    #[test]
    fn silence_holds_the_last_reading() {
        let mut samples = triangle_wave(1448, 2648, 125, 3 * 2);
        samples.extend(std::iter::repeat(2048).take(750 * 10));
        let source = ManualSource::from_samples(RATE, &samples, 750);
        let (mut acq, mut mon) = pipelines::<750, 2>(source, false);

        let readings = run(&mut acq, &mut mon);
        assert_eq!(readings.len(), 1);
        assert_eq!(mon.last(), Some(readings[0]));
        let flat = mon.last_snapshot().unwrap();
        assert!(!flat.has_waveform_data());
        assert_eq!(mon.windows_published(), 12);
    }

    #[test]
    fn flat_input_never_produces_a_reading() {
        let source = ManualSource::from_samples(RATE, &[2048; 750 * 8], 750);
        let (mut acq, mut mon) = pipelines::<750, 2>(source, false);
        assert!(run(&mut acq, &mut mon).is_empty());
        assert_eq!(mon.last(), None);
    }

    #[test]
    fn overrun_replaces_unread_window() {
        let samples = triangle_wave(1448, 2648, 125, 3 * 3);
        let (tx, rx) = window_mailbox();
        let mut acq = AcquisitionPipeline::<_, 750>::new(ManualSource::from_samples(RATE, &samples, 2250), tx, 4095);
        let mut mon = MonitorPipeline::<1>::new(rx, Calibration::default(), Box::new(false));

        assert_eq!(acq.pump_once().unwrap(), Some(3));
        assert_eq!(mon.new_overruns(), Some(2));
        assert_eq!(mon.new_overruns(), None);

        let reading = mon.poll().unwrap();
        assert_eq!(reading.diagnostics.overruns, 2);
        assert_eq!(reading.diagnostics.windows_published, 3);
        // Only the latest window survives: it is a full three-cycle window.
        assert_eq!(reading.diagnostics.waveform_count, 3);
        assert!(mon.poll().is_none());
    }

    #[test]
    fn out_of_range_batch_is_rejected_whole() {
        let (tx, rx) = window_mailbox();
        let mut acq = AcquisitionPipeline::<_, 4>::new(ManualSource::new(Vec::new()), tx, 4095);
        let batch = SampleBatch::new(RATE, vec![10, 20, 5000, 30]);
        assert!(matches!(
            acq.push_batch(&batch),
            Err(MonitorError::SampleOutOfRange { sample: 5000, max: 4095 })
        ));
        assert_eq!(acq.samples_seen(), 0);
        assert!(!rx.is_ready());
    }

    #[test]
    fn producer_finished_after_drop_and_drain() {
        let source = ManualSource::from_samples(RATE, &[2048; 8], 8);
        let (mut acq, mut mon) = pipelines::<4, 1>(source, false);
        assert_eq!(acq.pump_once().unwrap(), Some(2));
        drop(acq);
        assert!(!mon.producer_finished());
        mon.poll();
        assert!(mon.producer_finished());
    }
}
