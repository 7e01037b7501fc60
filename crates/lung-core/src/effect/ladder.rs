//! Cascaded one-pole filters
//!
//! Each pole is `pole += ((input - pole) * c) >> 15` with `c` in Q15, and
//! each pole feeds the next. Eight poles give a steep lowpass; subtracting
//! that from the input gives the complementary highpass.
//!
//! A coefficient of 0 is bypass. Entering bypass clears the poles, and the
//! first sample after bypass (or construction) seeds every pole with the
//! input so re-enabling never replays stale state.

use crate::types::Sample;

/// Poles in the ladder
pub const POLES: usize = 8;

/// Largest Q15 coefficient (fully open)
pub const MAX_COEFFICIENT: u16 = 32767;

/// `N` chained one-pole lowpass sections
#[derive(Debug, Clone)]
pub struct OnePoleCascade<const N: usize> {
    poles: [Sample; N],
    seeded: bool,
    last_coefficient: u16,
}

impl<const N: usize> OnePoleCascade<N> {
    pub const fn new() -> Self {
        Self {
            poles: [0; N],
            seeded: false,
            last_coefficient: 0,
        }
    }

    /// Run one sample through all sections; returns the last section
    ///
    /// The coefficient is clamped to `MAX_COEFFICIENT`. Coefficient 0
    /// returns the input unchanged.
    #[inline]
    pub fn process(&mut self, input: Sample, coefficient: u16) -> Sample {
        let coefficient = coefficient.min(MAX_COEFFICIENT);
        if coefficient == 0 {
            if self.last_coefficient != 0 {
                self.poles = [0; N];
                self.seeded = false;
            }
            self.last_coefficient = 0;
            return input;
        }

        if !self.seeded {
            self.poles = [input; N];
            self.seeded = true;
        }
        self.last_coefficient = coefficient;

        let c = coefficient as i32;
        let mut x = input;
        for pole in self.poles.iter_mut() {
            let delta = x as i32 - *pole as i32;
            *pole = (*pole as i32 + ((delta * c) >> 15)) as Sample;
            x = *pole;
        }
        x
    }

    /// Output of the last section
    #[inline]
    pub fn output(&self) -> Sample {
        self.poles[N - 1]
    }

    /// Clear all sections; the next sample reseeds
    pub fn reset(&mut self) {
        self.poles = [0; N];
        self.seeded = false;
        self.last_coefficient = 0;
    }
}

impl<const N: usize> Default for OnePoleCascade<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// 8-pole lowpass, higher coefficient = higher cutoff
#[derive(Debug, Clone, Default)]
pub struct LadderLowpass {
    cascade: OnePoleCascade<POLES>,
}

impl LadderLowpass {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn process(&mut self, input: Sample, coefficient: u16) -> Sample {
        self.cascade.process(input, coefficient)
    }

    pub fn reset(&mut self) {
        self.cascade.reset();
    }
}

/// Complementary highpass: input minus the 8-pole lowpass
#[derive(Debug, Clone, Default)]
pub struct LadderHighpass {
    cascade: OnePoleCascade<POLES>,
}

impl LadderHighpass {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn process(&mut self, input: Sample, coefficient: u16) -> Sample {
        if coefficient == 0 {
            return self.cascade.process(input, 0);
        }
        let low = self.cascade.process(input, coefficient);
        (input as i32 - low as i32).clamp(Sample::MIN as i32, Sample::MAX as i32) as Sample
    }

    pub fn reset(&mut self) {
        self.cascade.reset();
    }
}
