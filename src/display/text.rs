use crate::display::Presenter;
use crate::drivers::MonitorError;
use crate::types::Reading;

/// Serial-console style diagnostic line, one per reading, at `info`.
#[derive(Debug, Default)]
pub struct TextLog {
    lines: u64,
}

impl TextLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn format_line(reading: &Reading) -> String {
        let d = &reading.diagnostics;
        format!(
            "adcMin/Max {} {}  adcDiff {}  wfMax/Min {} {}  wfDiff {}  Vavg: {:.4}  Vpp: {:.4}  Max Dev: {:.4}",
            d.raw_min,
            d.raw_max,
            d.raw_max.saturating_sub(d.raw_min),
            d.waveform_peak_max,
            d.waveform_peak_min,
            d.waveform_peak_max.saturating_sub(d.waveform_peak_min),
            reading.value.average_dc,
            d.peak_to_peak_volts,
            reading.value.max_deviation,
        )
    }
}

impl Presenter for TextLog {
    fn name(&self) -> &'static str {
        "text-log"
    }

    fn render(&mut self, reading: &Reading) -> Result<(), MonitorError> {
        log::info!("{}", Self::format_line(reading));
        self.lines += 1;
        Ok(())
    }
}
