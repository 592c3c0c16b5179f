// src/recorder.rs
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::display::Presenter;
use crate::drivers::MonitorError;
use crate::types::Reading;

const HEADER: &str = "timestamp,max_deviation,average_dc,peak_to_peak_volts,raw_min,raw_max,waveform_count,scale";

/// Appends every reading to a CSV file while recording is active.
pub struct CsvRecorder {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    rows: u64,
}

impl Default for CsvRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRecorder {
    pub fn new() -> Self {
        Self {
            writer: None,
            path: None,
            rows: 0,
        }
    }

    /// Opens `path` for appending; the header is written only to a new or empty file.
    pub fn start(&mut self, path: &Path) -> Result<(), MonitorError> {
        self.stop()?;
        let file = File::options().create(true).append(true).open(path)?;
        let fresh = file.metadata()?.len() == 0;
        let mut w = BufWriter::new(file);
        if fresh {
            writeln!(w, "{HEADER}")?;
        }
        self.writer = Some(w);
        self.path = Some(path.to_path_buf());
        self.rows = 0;
        log::info!("recording readings to {}", path.display());
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), MonitorError> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
            if let Some(path) = self.path.take() {
                log::info!("recording saved: {} ({} rows)", path.display(), self.rows);
            }
        }
        Ok(())
    }

    pub fn write_record(&mut self, reading: &Reading) -> Result<(), MonitorError> {
        let Some(w) = &mut self.writer else {
            return Ok(());
        };
        let t = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        let d = &reading.diagnostics;
        writeln!(
            w,
            "{t:.3},{:.4},{:.4},{:.4},{},{},{},{}",
            reading.value.max_deviation,
            reading.value.average_dc,
            d.peak_to_peak_volts,
            d.raw_min,
            d.raw_max,
            d.waveform_count,
            reading.scale.label(),
        )?;
        self.rows += 1;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }
}

impl Presenter for CsvRecorder {
    fn name(&self) -> &'static str {
        "csv-recorder"
    }

    fn render(&mut self, reading: &Reading) -> Result<(), MonitorError> {
        self.write_record(reading)
    }
}

impl Drop for CsvRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("failed to flush recording: {e}");
        }
    }
}
