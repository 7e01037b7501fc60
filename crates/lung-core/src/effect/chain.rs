//! Post-processing chain driven by the two effect knobs

use super::ladder::{LadderHighpass, LadderLowpass, MAX_COEFFICIENT};
use super::saturation::Saturation;
use crate::config::FilterKind;
use crate::types::{Sample, CONTROL_MAX};

/// Smallest coefficient a knob maps to, so a knob at zero never bypasses
pub const MIN_COEFFICIENT: u16 = 512;

/// Scale a 12-bit knob to a Q15 coefficient
#[inline]
pub fn knob_to_coefficient(knob: u16) -> u16 {
    let scaled = knob.min(CONTROL_MAX) as u32 * MAX_COEFFICIENT as u32 / CONTROL_MAX as u32;
    (scaled as u16).max(MIN_COEFFICIENT)
}

/// Saturation (FX 2) followed by a lowpass or highpass ladder (FX 1)
#[derive(Debug, Clone)]
pub struct PostChain {
    saturation: Saturation,
    lowpass: LadderLowpass,
    highpass: LadderHighpass,
    fx1: FilterKind,
}

impl PostChain {
    pub fn new(fx1: FilterKind) -> Self {
        Self {
            saturation: Saturation::new(),
            lowpass: LadderLowpass::new(),
            highpass: LadderHighpass::new(),
            fx1,
        }
    }

    #[inline]
    pub fn fx1(&self) -> FilterKind {
        self.fx1
    }

    /// Select the FX 1 filter; switching clears both ladders
    pub fn set_fx1(&mut self, kind: FilterKind) {
        if kind != self.fx1 {
            self.fx1 = kind;
            self.reset();
        }
    }

    /// Process one sample with raw 12-bit knob readings
    #[inline]
    pub fn process(&mut self, input: Sample, fx1_knob: u16, fx2_knob: u16) -> Sample {
        let saturated = self.saturation.process(input, knob_to_coefficient(fx2_knob));
        let coefficient = knob_to_coefficient(fx1_knob);
        match self.fx1 {
            FilterKind::Lowpass => self.lowpass.process(saturated, coefficient),
            FilterKind::Highpass => self.highpass.process(saturated, coefficient),
        }
    }

    pub fn reset(&mut self) {
        self.lowpass.reset();
        self.highpass.reset();
    }
}
