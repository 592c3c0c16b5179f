use std::fmt::Write as _;
use std::io::Write;

use crate::display::Presenter;
use crate::drivers::MonitorError;
use crate::types::{Reading, SmoothedValue};

pub const DIGIT_COUNT: usize = 8;

/// One seven-segment position: a character (blank when `None`) and its decimal point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Digit {
    pub ch: Option<char>,
    pub dp: bool,
}

/// Contents of the eight-digit display, indexed like the driver: 7 is leftmost.
///
/// Digits 7..4 hold the deviation in kHz as `d.ddd`, digit 3 is blank and
/// digits 2..0 hold the DC average in volts as `d.dd`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegmentFrame {
    pub digits: [Digit; DIGIT_COUNT],
}

impl SegmentFrame {
    pub fn from_value(value: &SmoothedValue) -> Self {
        let mut frame = SegmentFrame::default();
        // Values beyond the digit count are pinned to all nines.
        let dev = (((value.max_deviation + 0.0005) * 1000.0) as i32).clamp(0, 9999);
        let dc = (((value.average_dc + 0.005) * 100.0) as i32).clamp(0, 999);
        frame.place(7, &format!("{dev:04}"));
        frame.place(2, &format!("{dc:>3}"));
        frame.digits[7].dp = true;
        frame.digits[2].dp = true;
        frame
    }

    // Writes `text` leftwards-to-rightwards starting at digit `top`.
    fn place(&mut self, top: usize, text: &str) {
        for (offset, ch) in text.chars().enumerate() {
            let Some(index) = top.checked_sub(offset) else {
                break;
            };
            self.digits[index].ch = (ch != ' ').then_some(ch);
        }
    }

    /// Leftmost digit first, decimal points inline.
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(DIGIT_COUNT * 2);
        for digit in self.digits.iter().rev() {
            line.push(digit.ch.unwrap_or(' '));
            if digit.dp {
                line.push('.');
            }
        }
        line
    }
}

/// Eight-digit LED display emulated as text lines on any writer.
pub struct SegmentDisplay<W: Write + Send> {
    sink: W,
    last: Option<SegmentFrame>,
}

impl<W: Write + Send> SegmentDisplay<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, last: None }
    }

    pub fn last_frame(&self) -> Option<&SegmentFrame> {
        self.last.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write + Send> Presenter for SegmentDisplay<W> {
    fn name(&self) -> &'static str {
        "segment"
    }

    fn render(&mut self, reading: &Reading) -> Result<(), MonitorError> {
        let frame = SegmentFrame::from_value(&reading.value);
        let mut line = frame.to_line();
        let _ = write!(line, "  [{}]", reading.scale.label());
        writeln!(self.sink, "{line}")?;
        self.sink.flush()?;
        self.last = Some(frame);
        Ok(())
    }
}
