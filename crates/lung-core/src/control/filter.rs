//! Per-channel control smoothing
//!
//! An optional median-of-3 spike rejector followed by a shift-based
//! exponential moving average. Integer only on the tick path; the
//! cutoff-to-shift conversion is the one floating point step and runs at
//! configuration time.

use std::f32::consts::PI;

/// Heaviest smoothing shift
pub const MAX_SHIFT: u8 = 15;

/// Median of three by compare-swap
#[inline]
fn median3(a: u16, b: u16, c: u16) -> u16 {
    let (lo, hi) = if a > b { (b, a) } else { (a, b) };
    let hi = hi.min(c);
    lo.max(hi)
}

/// Nearest EMA shift for a cutoff `cutoff_hz` at a tick rate `tick_rate_hz`
///
/// Returns `None` for non-positive inputs.
pub fn shift_for_cutoff(tick_rate_hz: f32, cutoff_hz: f32) -> Option<u8> {
    if !(tick_rate_hz > 0.0 && cutoff_hz > 0.0) {
        return None;
    }
    let alpha = (1.0 - (-2.0 * PI * cutoff_hz / tick_rate_hz).exp()).max(1e-6);
    let shift = (1.0 / alpha).log2().round();
    Some(shift.clamp(0.0, MAX_SHIFT as f32) as u8)
}

/// Smoothing filter for one control channel
#[derive(Debug, Clone)]
pub struct ControlFilter {
    shift: u8,
    median3: bool,
    primed: bool,
    value: i32,
    /// Previous two raw readings, oldest first
    history: [u16; 2],
}

impl ControlFilter {
    pub fn new(shift: u8, median3: bool) -> Self {
        Self {
            shift: shift.min(MAX_SHIFT),
            median3,
            primed: false,
            value: 0,
            history: [0; 2],
        }
    }

    /// Filter one raw reading
    ///
    /// The first reading after construction or [`reset`](Self::reset)
    /// seeds both the median history and the average, so the output starts
    /// at the input instead of ramping up from zero.
    #[inline]
    pub fn process(&mut self, raw: u16) -> u16 {
        if !self.primed {
            self.history = [raw; 2];
            self.value = raw as i32;
            self.primed = true;
            return raw;
        }

        let x = if self.median3 {
            let m = median3(raw, self.history[1], self.history[0]);
            self.history = [self.history[1], raw];
            m
        } else {
            raw
        };

        let delta = x as i32 - self.value;
        let mut step = delta >> self.shift;
        // Arithmetic shift already floors negative deltas to at least -1;
        // give positive deltas the same minimum so the average always lands
        // exactly on a held input.
        if step == 0 && delta > 0 {
            step = 1;
        }
        self.value += step;
        self.value as u16
    }

    /// Last output value
    #[inline]
    pub fn value(&self) -> u16 {
        self.value as u16
    }

    #[inline]
    pub fn shift(&self) -> u8 {
        self.shift
    }

    /// Set the smoothing shift (clamped to `0..=15`, 0 is passthrough)
    pub fn set_shift(&mut self, shift: u8) {
        self.shift = shift.min(MAX_SHIFT);
    }

    /// Set the smoothing from a cutoff frequency; ignored for non-positive inputs
    pub fn set_cutoff_hz(&mut self, tick_rate_hz: f32, cutoff_hz: f32) {
        if let Some(shift) = shift_for_cutoff(tick_rate_hz, cutoff_hz) {
            self.shift = shift;
        }
    }

    /// Set the smoothing from a time constant in milliseconds
    pub fn set_time_constant_ms(&mut self, tick_rate_hz: f32, tau_ms: f32) {
        if tau_ms > 0.0 {
            self.set_cutoff_hz(tick_rate_hz, 1000.0 / (2.0 * PI * tau_ms));
        }
    }

    pub fn set_median3(&mut self, enabled: bool) {
        self.median3 = enabled;
    }

    #[inline]
    pub fn median3_enabled(&self) -> bool {
        self.median3
    }

    /// Forget all history; the next reading reseeds the filter
    pub fn reset(&mut self) {
        self.primed = false;
        self.value = 0;
        self.history = [0; 2];
    }
}
