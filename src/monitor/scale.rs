use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ADC_BITS, SCALE_ALTERNATE, SCALE_PRIMARY, SUPPLY_VOLTS};

/// Which deviation scale constant applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleSelection {
    #[default]
    Primary,
    Alternate,
}

impl ScaleSelection {
    pub fn from_alternate(alternate: bool) -> Self {
        if alternate {
            ScaleSelection::Alternate
        } else {
            ScaleSelection::Primary
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScaleSelection::Primary => "primary",
            ScaleSelection::Alternate => "alternate",
        }
    }
}

/// External binary option selecting the deviation scale.
///
/// Read by the core once per ring wrap, never per sample.
pub trait OptionInput: Send {
    fn alternate_selected(&self) -> bool;

    fn selection(&self) -> ScaleSelection {
        ScaleSelection::from_alternate(self.alternate_selected())
    }
}

impl OptionInput for bool {
    fn alternate_selected(&self) -> bool {
        *self
    }
}

/// Shared stand-in for the pulled-up option pin: whoever holds a clone may flip it.
#[derive(Clone, Debug, Default)]
pub struct OptionPin(Arc<AtomicBool>);

impl OptionPin {
    pub fn new(alternate: bool) -> Self {
        Self(Arc::new(AtomicBool::new(alternate)))
    }

    pub fn set_alternate(&self, alternate: bool) {
        self.0.store(alternate, Ordering::Relaxed);
    }
}

impl OptionInput for OptionPin {
    fn alternate_selected(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Physical constants turning ADC counts into display units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub full_scale: f32,
    pub supply_volts: f32,
    pub scale_primary: f32,
    pub scale_alternate: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            full_scale: ADC_BITS as f32,
            supply_volts: SUPPLY_VOLTS,
            scale_primary: SCALE_PRIMARY,
            scale_alternate: SCALE_ALTERNATE,
        }
    }
}

impl Calibration {
    pub fn scale(&self, selection: ScaleSelection) -> f32 {
        match selection {
            ScaleSelection::Primary => self.scale_primary,
            ScaleSelection::Alternate => self.scale_alternate,
        }
    }

    /// Peak-to-peak counts to deviation units.
    pub fn deviation(&self, counts: f32, selection: ScaleSelection) -> f32 {
        counts * self.scale(selection) / self.full_scale
    }

    pub fn volts(&self, counts: f32) -> f32 {
        counts * self.supply_volts / self.full_scale
    }
}
