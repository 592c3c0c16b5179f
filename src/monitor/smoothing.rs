use crate::config::SMOOTHING_WINDOW;
use crate::monitor::scale::{Calibration, OptionInput, ScaleSelection};
use crate::types::{SmoothedValue, WindowSnapshot};

/// Sliding average over the last `N` per-window waveform averages.
///
/// A new display value is produced only when the write index wraps from
/// `N - 1` back to `0`, so the display cadence is `N` published windows.
pub struct SmoothingFilter<const N: usize> {
    ring: [f32; N],
    index: usize,
    filled: bool,
    calibration: Calibration,
    last: Option<SmoothedValue>,
    last_mean: Option<f32>,
    last_selection: ScaleSelection,
}

pub type DefaultSmoothingFilter = SmoothingFilter<SMOOTHING_WINDOW>;

impl<const N: usize> SmoothingFilter<N> {
    // Checked when `new` is instantiated, so a zero-length ring fails to build.
    const NON_EMPTY: () = assert!(N > 0, "smoothing ring needs at least one slot");

    pub fn new(calibration: Calibration) -> Self {
        let () = Self::NON_EMPTY;
        Self {
            ring: [0.0; N],
            index: 0,
            filled: false,
            calibration,
            last: None,
            last_mean: None,
            last_selection: ScaleSelection::default(),
        }
    }

    /// Feeds one published window. Returns a fresh value only on ring wrap.
    ///
    /// A window without waveform data leaves the ring untouched, so the
    /// previously displayed value is held.
    pub fn on_window_published(
        &mut self,
        snapshot: &WindowSnapshot,
        option: &dyn OptionInput,
    ) -> Option<SmoothedValue> {
        let window_avg = snapshot.waveform_average()?;
        self.ring[self.index] = window_avg;
        self.index += 1;
        if self.index < N {
            return None;
        }
        self.index = 0;
        self.filled = true;
        Some(self.on_ring_wrapped(snapshot, option))
    }

    fn on_ring_wrapped(&mut self, snapshot: &WindowSnapshot, option: &dyn OptionInput) -> SmoothedValue {
        let mean = self.ring.iter().sum::<f32>() / N as f32;
        let selection = option.selection();
        let average_dc = snapshot
            .raw
            .average()
            .map(|counts| self.calibration.volts(counts))
            .unwrap_or_default();
        let value = SmoothedValue {
            max_deviation: self.calibration.deviation(mean, selection),
            average_dc,
        };
        self.last_mean = Some(mean);
        self.last_selection = selection;
        self.last = Some(value);
        value
    }

    /// The held display value; `None` until the ring has wrapped once.
    pub fn last(&self) -> Option<SmoothedValue> {
        self.last
    }

    /// Mean peak-to-peak counts behind the last emitted value.
    pub fn ring_mean(&self) -> Option<f32> {
        self.last_mean
    }

    pub fn last_selection(&self) -> ScaleSelection {
        self.last_selection
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Windows written since the last wrap.
    pub fn pending(&self) -> usize {
        self.index
    }

    pub fn has_filled(&self) -> bool {
        self.filled
    }
}
