// src/engine.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::config::{AppConfig, SourceConfig, ADC_MAX, SAMPLE_WINDOW, SMOOTHING_WINDOW};
use crate::display::{presenters_from_config, Presenter};
use crate::drivers::{MonitorError, SampleSource, SerialSource, ToneSource};
use crate::monitor::{window_mailbox, AcquisitionPipeline, Calibration, MonitorPipeline, OptionPin};
use crate::recorder::CsvRecorder;
use crate::types::{MonitorCommand, MonitorMessage, Reading};

/// How long the consumer sleeps when no window is waiting.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);
const OVERRUN_LOG_INTERVAL: Duration = Duration::from_secs(1);

pub type BoxedSource = Box<dyn SampleSource + Send>;

pub fn open_source(config: &SourceConfig) -> Result<BoxedSource, MonitorError> {
    match config {
        SourceConfig::Simulated(tone) => {
            log::info!(
                "simulated tune tone: {} Hz at {} samples/s",
                tone.tone_hz,
                tone.sample_rate_hz
            );
            Ok(Box::new(ToneSource::new(tone.clone(), ADC_MAX)?))
        }
        SourceConfig::Serial {
            port,
            baud_rate,
            sample_rate_hz,
        } => Ok(Box::new(SerialSource::open(port, *baud_rate, *sample_rate_hz)?)),
    }
}

/// Producer context: pumps the acquisition pipeline until the source ends,
/// `stop` is raised, or the source fails.
pub fn spawn_producer<S>(mut pipeline: AcquisitionPipeline<S, SAMPLE_WINDOW>, stop: Arc<AtomicBool>) -> JoinHandle<()>
where
    S: SampleSource + Send + 'static,
{
    thread::spawn(move || {
        log::info!("producer started");
        while !stop.load(Ordering::Relaxed) {
            match pipeline.pump_once() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    log::info!("sample source exhausted");
                    break;
                }
                Err(e @ MonitorError::SampleOutOfRange { .. }) => {
                    log::warn!("dropping batch: {e}");
                }
                Err(e) => {
                    log::error!("sample source failed: {e}");
                    break;
                }
            }
        }
        log::info!("producer stopped after {} samples", pipeline.samples_seen());
    })
}

/// Consumer context plus ownership of the producer thread.
pub struct MonitorEngine {
    pipeline: MonitorPipeline<SMOOTHING_WINDOW>,
    presenters: Vec<Box<dyn Presenter>>,
    option: OptionPin,
    stop: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    last_overrun_log: Option<Instant>,
}

impl MonitorEngine {
    pub fn start(config: &AppConfig) -> anyhow::Result<Self> {
        let source = open_source(&config.source).context("failed to open sample source")?;
        let presenters = presenters_from_config(config).context("failed to set up presentation adapters")?;
        Ok(Self::with_source(source, presenters, config.alternate_scale))
    }

    pub fn with_source<S>(source: S, presenters: Vec<Box<dyn Presenter>>, alternate_scale: bool) -> Self
    where
        S: SampleSource + Send + 'static,
    {
        let (publisher, receiver) = window_mailbox();
        let option = OptionPin::new(alternate_scale);
        let pipeline = MonitorPipeline::new(receiver, Calibration::default(), Box::new(option.clone()));
        let stop = Arc::new(AtomicBool::new(false));
        let producer = spawn_producer(AcquisitionPipeline::new(source, publisher, ADC_MAX), stop.clone());
        Self {
            pipeline,
            presenters,
            option,
            stop,
            producer: Some(producer),
            last_overrun_log: None,
        }
    }

    /// Drains at most one window; renders and returns the reading when one is produced.
    pub fn step(&mut self) -> Option<Reading> {
        self.report_overruns();
        let reading = self.pipeline.poll()?;
        for presenter in &mut self.presenters {
            if let Err(e) = presenter.render(&reading) {
                log::warn!("{} failed to render: {e}", presenter.name());
            }
        }
        Some(reading)
    }

    fn report_overruns(&mut self) {
        let Some(total) = self.pipeline.new_overruns() else {
            return;
        };
        let due = self
            .last_overrun_log
            .map_or(true, |at| at.elapsed() >= OVERRUN_LOG_INTERVAL);
        if due {
            log::warn!("consumer fell behind: {total} windows overwritten so far");
            self.last_overrun_log = Some(Instant::now());
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pipeline.has_pending()
    }

    /// The producer has stopped and every published window has been drained.
    pub fn is_finished(&self) -> bool {
        self.pipeline.producer_finished()
    }

    pub fn option(&self) -> &OptionPin {
        &self.option
    }

    pub fn last(&self) -> Option<Reading> {
        self.pipeline.last()
    }

    pub fn overruns(&self) -> u64 {
        self.pipeline.overruns()
    }

    pub fn windows_published(&self) -> u64 {
        self.pipeline.windows_published()
    }

    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                log::error!("producer thread panicked");
            }
        }
    }
}

impl Drop for MonitorEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs the consumer on the calling thread until the source is exhausted.
pub fn run_headless(config: &AppConfig) -> anyhow::Result<()> {
    let mut engine = MonitorEngine::start(config)?;
    log::info!(
        "monitoring: {SAMPLE_WINDOW}-sample windows, {SMOOTHING_WINDOW}-window smoothing, {} scale",
        if config.alternate_scale { "alternate" } else { "primary" }
    );
    loop {
        engine.step();
        if engine.is_finished() {
            break;
        }
        if !engine.has_pending() {
            thread::sleep(POLL_INTERVAL);
        }
    }
    log::info!(
        "done: {} windows published, {} overwritten",
        engine.windows_published(),
        engine.overruns()
    );
    Ok(())
}

/// Runs the consumer on its own thread, driven by GUI commands.
pub fn spawn_thread(config: AppConfig, tx: Sender<MonitorMessage>, rx_cmd: Receiver<MonitorCommand>) -> JoinHandle<()> {
    thread::spawn(move || {
        tx.send(MonitorMessage::Log("Deviation monitor engine ready.".to_owned())).ok();

        // 1. Start the producer and adapters
        let mut engine = match MonitorEngine::start(&config) {
            Ok(engine) => {
                tx.send(MonitorMessage::SourceStatus(true)).ok();
                engine
            }
            Err(e) => {
                log::error!("engine failed to start: {e:#}");
                tx.send(MonitorMessage::Log(format!("Failed to start: {e:#}"))).ok();
                tx.send(MonitorMessage::SourceStatus(false)).ok();
                return;
            }
        };

        // 2. Recorder driven by GUI commands
        let mut recorder = CsvRecorder::new();
        let mut reported_overruns = 0;
        let mut source_done = false;

        'run: loop {
            // 3. Commands
            loop {
                let cmd = match rx_cmd.try_recv() {
                    Ok(cmd) => cmd,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'run,
                };
                match cmd {
                    MonitorCommand::SetAlternateScale(alternate) => {
                        engine.option().set_alternate(alternate);
                        let label = if alternate { "alternate" } else { "primary" };
                        tx.send(MonitorMessage::Log(format!("Scale: {label}"))).ok();
                    }
                    MonitorCommand::StartRecording(path) => match recorder.start(&path) {
                        Ok(()) => {
                            tx.send(MonitorMessage::RecordingStatus(true)).ok();
                            tx.send(MonitorMessage::Log(format!("Recording to {}", path.display()))).ok();
                        }
                        Err(e) => {
                            tx.send(MonitorMessage::Log(format!("Recording failed: {e}"))).ok();
                        }
                    },
                    MonitorCommand::StopRecording => {
                        if let Err(e) = recorder.stop() {
                            log::warn!("failed to close recording: {e}");
                        }
                        tx.send(MonitorMessage::RecordingStatus(false)).ok();
                    }
                    MonitorCommand::Shutdown => break 'run,
                }
            }

            // 4. Readings
            if let Some(reading) = engine.step() {
                if let Err(e) = recorder.write_record(&reading) {
                    log::warn!("failed to record reading: {e}");
                }
                if tx.send(MonitorMessage::Reading(reading)).is_err() {
                    break 'run;
                }
            }

            let overruns = engine.overruns();
            if overruns != reported_overruns {
                reported_overruns = overruns;
                tx.send(MonitorMessage::Overruns(overruns)).ok();
            }

            if !source_done && engine.is_finished() {
                source_done = true;
                tx.send(MonitorMessage::SourceStatus(false)).ok();
                tx.send(MonitorMessage::Log("Sample source finished.".to_owned())).ok();
            }

            if !engine.has_pending() {
                thread::sleep(POLL_INTERVAL);
            }
        }

        // 5. Shutdown
        if recorder.is_recording() {
            if let Err(e) = recorder.stop() {
                log::warn!("failed to close recording: {e}");
            }
            tx.send(MonitorMessage::RecordingStatus(false)).ok();
        }
        engine.shutdown();
        log::info!("engine stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, channel, RecvTimeoutError};
    use std::sync::Mutex;

    use super::*;
    use crate::config::SCALE_PRIMARY;
    use crate::drivers::{SampleBatch, ToneConfig};
    use crate::monitor::testing::triangle_wave;
    use crate::types::Sample;

    /// Yields one window per token so the consumer never falls behind.
    struct GatedSource {
        windows: Vec<Vec<Sample>>,
        gate: mpsc::Receiver<()>,
    }

    impl SampleSource for GatedSource {
        fn next_batch(&mut self) -> Result<Option<SampleBatch>, MonitorError> {
            if self.gate.recv().is_err() || self.windows.is_empty() {
                return Ok(None);
            }
            Ok(Some(SampleBatch::new(23_000.0, self.windows.remove(0))))
        }
    }

    struct Collect(Arc<Mutex<Vec<Reading>>>);

    impl Presenter for Collect {
        fn name(&self) -> &'static str {
            "collect"
        }

        fn render(&mut self, reading: &Reading) -> Result<(), MonitorError> {
            self.0.lock().unwrap().push(*reading);
            Ok(())
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn engine_renders_one_reading_per_ring() {
        let samples = triangle_wave(1448, 2648, 125, 3 * SMOOTHING_WINDOW);
        let windows = samples.chunks(SAMPLE_WINDOW).map(<[Sample]>::to_vec).collect();
        let (gate_tx, gate_rx) = channel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut engine = MonitorEngine::with_source(
            GatedSource {
                windows,
                gate: gate_rx,
            },
            vec![Box::new(Collect(seen.clone()))],
            false,
        );

        let mut returned = Vec::new();
        for published in 1..=SMOOTHING_WINDOW as u64 {
            gate_tx.send(()).unwrap();
            wait_for(|| engine.windows_published() == published);
            returned.extend(engine.step());
        }
        drop(gate_tx);
        wait_for(|| engine.is_finished());

        assert_eq!(engine.overruns(), 0);
        assert_eq!(returned.len(), 1);
        assert_eq!(*seen.lock().unwrap(), returned);
        let expected = 1200.0 * SCALE_PRIMARY / 4096.0;
        assert!((returned[0].value.max_deviation - expected).abs() < 1e-4);
        assert_eq!(engine.last(), Some(returned[0]));
    }

    #[test]
    fn option_pin_reaches_the_filter() {
        // A closed gate ends the source at once.
        let (gate_tx, gate_rx) = channel();
        drop(gate_tx);
        let engine = MonitorEngine::with_source(
            GatedSource {
                windows: Vec::new(),
                gate: gate_rx,
            },
            Vec::new(),
            true,
        );
        assert!(crate::monitor::OptionInput::alternate_selected(engine.option()));
        engine.option().set_alternate(false);
        assert!(!crate::monitor::OptionInput::alternate_selected(engine.option()));
    }

    #[test]
    fn gui_thread_reports_status_and_stops_on_shutdown() {
        let config = AppConfig {
            source: SourceConfig::Simulated(ToneConfig {
                realtime: false,
                total_samples: Some(SAMPLE_WINDOW as u64 * 4),
                ..ToneConfig::default()
            }),
            display: crate::config::DisplayConfig {
                text_log: false,
                ..Default::default()
            },
            ..AppConfig::default()
        };
        let path = std::env::temp_dir().join(format!("devmon-engine-{}.csv", std::process::id()));
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(config, tx, rx_cmd);
        tx_cmd.send(MonitorCommand::StartRecording(path.clone())).unwrap();

        let mut messages = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(10)) {
                Ok(msg) => {
                    let finished = matches!(msg, MonitorMessage::SourceStatus(false));
                    messages.push(msg);
                    if finished {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => panic!("engine never finished"),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tx_cmd.send(MonitorCommand::Shutdown).unwrap();
        handle.join().unwrap();
        messages.extend(rx.try_iter());
        std::fs::remove_file(&path).ok();

        assert!(matches!(messages.first(), Some(MonitorMessage::Log(_))));
        assert!(messages.iter().any(|m| matches!(m, MonitorMessage::SourceStatus(true))));
        assert!(messages.iter().any(|m| matches!(m, MonitorMessage::RecordingStatus(true))));
        assert!(matches!(messages.last(), Some(MonitorMessage::RecordingStatus(false))));
    }
}
