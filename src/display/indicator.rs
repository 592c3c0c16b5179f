use crate::display::Presenter;
use crate::drivers::MonitorError;
use crate::types::Reading;

/// Deviation (Hz) above which the tune tone is over-deviated.
pub const OVER_DEVIATION_HZ: i32 = 2758;
/// Deviation (Hz) below which the tune tone is under-deviated.
pub const UNDER_DEVIATION_HZ: i32 = 1854;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviationBand {
    Under,
    Nominal,
    Over,
}

impl DeviationBand {
    pub fn classify(max_deviation: f32) -> Self {
        let hz = (max_deviation * 1000.0) as i32;
        if hz > OVER_DEVIATION_HZ {
            DeviationBand::Over
        } else if hz < UNDER_DEVIATION_HZ {
            DeviationBand::Under
        } else {
            DeviationBand::Nominal
        }
    }

    /// Pixel colour, dimmed the way the status LED is driven.
    pub fn color(self) -> Rgb {
        match self {
            DeviationBand::Over => Rgb(25, 0, 0),
            DeviationBand::Under => Rgb(0, 0, 50),
            DeviationBand::Nominal => Rgb(0, 25, 0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeviationBand::Under => "under-deviation",
            DeviationBand::Nominal => "nominal",
            DeviationBand::Over => "over-deviation",
        }
    }
}

/// Single RGB status pixel. Starts dark until the first reading arrives.
#[derive(Debug, Default)]
pub struct ColorIndicator {
    band: Option<DeviationBand>,
}

impl ColorIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn band(&self) -> Option<DeviationBand> {
        self.band
    }

    pub fn color(&self) -> Rgb {
        self.band.map(DeviationBand::color).unwrap_or(Rgb(0, 0, 0))
    }
}

impl Presenter for ColorIndicator {
    fn name(&self) -> &'static str {
        "indicator"
    }

    fn render(&mut self, reading: &Reading) -> Result<(), MonitorError> {
        let band = DeviationBand::classify(reading.value.max_deviation);
        if self.band != Some(band) {
            let Rgb(r, g, b) = band.color();
            log::info!("indicator: {} ({r},{g},{b})", band.label());
            self.band = Some(band);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::testing::reading;

    #[test]
    fn thresholds_split_three_bands() {
        assert_eq!(DeviationBand::classify(2.759), DeviationBand::Over);
        assert_eq!(DeviationBand::classify(2.5), DeviationBand::Nominal);
        assert_eq!(DeviationBand::classify(1.9), DeviationBand::Nominal);
        assert_eq!(DeviationBand::classify(1.5), DeviationBand::Under);
        assert_eq!(DeviationBand::classify(0.0), DeviationBand::Under);
    }

    #[test]
    fn colors_follow_band() {
        assert_eq!(DeviationBand::Over.color(), Rgb(25, 0, 0));
        assert_eq!(DeviationBand::Under.color(), Rgb(0, 0, 50));
        assert_eq!(DeviationBand::Nominal.color(), Rgb(0, 25, 0));
    }

    #[test]
    fn pixel_is_dark_until_first_reading() {
        let mut pixel = ColorIndicator::new();
        assert_eq!(pixel.color(), Rgb(0, 0, 0));
        pixel.render(&reading(3.1, 1.65)).unwrap();
        assert_eq!(pixel.band(), Some(DeviationBand::Over));
        pixel.render(&reading(2.2, 1.65)).unwrap();
        assert_eq!(pixel.color(), Rgb(0, 25, 0));
    }
}
