//! Speed, pitch and through-zero modulation
//!
//! Turns the octave selector, the tune knob and the modulation input into a
//! per-sample [`Increment`].

use super::phase::Increment;
use crate::types::{Direction, CONTROL_CENTER};

/// Number of octave selector positions
pub const OCTAVE_POSITIONS: u8 = 8;

/// Selector position that turns the tune knob into a slow LFO-rate control
pub const LFO_OCTAVE: u8 = 0;

/// Selector position that plays at the native rate with the tune knob centred
pub const UNITY_OCTAVE: u8 = 4;

/// Slowest LFO-mode speed
const LFO_MIN_RATIO: f32 = 0.001;

/// Modulation depths below this leave the increment untouched
const DEPTH_THRESHOLD: f32 = 0.001;

/// Map a 12-bit reading to `[-1, 1]` around the centre code
#[inline]
pub fn bipolar(raw: u16) -> f32 {
    let centred = raw as f32 - CONTROL_CENTER as f32;
    (centred / CONTROL_CENTER as f32).clamp(-1.0, 1.0)
}

/// Speed ratio for an octave selector position and tune reading
///
/// Position 0 sweeps from 0.5 (tune fully down) to 0.001 (tune fully up).
/// Positions 1..=7 span octaves -3..=+3 with the tune knob adding up to
/// half an octave either way.
pub fn speed_ratio(octave: u8, tune_raw: u16) -> f32 {
    let t = bipolar(tune_raw);
    if octave == LFO_OCTAVE {
        LFO_MIN_RATIO + (1.0 - t) * 0.5 * (1.0 - LFO_MIN_RATIO)
    } else {
        let octave = octave.min(OCTAVE_POSITIONS - 1) as i32 - UNITY_OCTAVE as i32;
        2f32.powi(octave) * 2f32.powf(0.5 * t)
    }
}

/// Ratio of native material rate to render rate
#[inline]
pub fn unity_ratio(native_rate: u32, output_rate: u32) -> f64 {
    if output_rate == 0 {
        return 1.0;
    }
    native_rate as f64 / output_rate as f64
}

/// Smoothed through-zero speed modulation
///
/// `increment = base * (1 + smoothed * depth)`. The product is allowed to
/// reach zero and change sign; only its magnitude is limited.
#[derive(Debug, Clone)]
pub struct SpeedModulator {
    smoothing: f32,
    smoothed: f32,
    ceiling: Increment,
}

impl SpeedModulator {
    /// `smoothing` is the one-pole coefficient on the previous value,
    /// `max_speed_ratio` bounds |increment|
    pub fn new(smoothing: f32, max_speed_ratio: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(0.0, 0.999),
            smoothed: 0.0,
            ceiling: Increment::from_ratio(max_speed_ratio as f64),
        }
    }

    /// Per-sample increment for `base` played in `direction`
    ///
    /// `modulation_raw` is the unfiltered 12-bit modulation reading. The
    /// smoothing state advances on every call so that turning the depth up
    /// does not expose a stale value.
    #[inline]
    pub fn increment(
        &mut self,
        base: Increment,
        direction: Direction,
        modulation_raw: u16,
        depth: f32,
    ) -> Increment {
        let target = bipolar(modulation_raw);
        self.smoothed = self.smoothing * self.smoothed + (1.0 - self.smoothing) * target;

        let base = if direction.is_reverse() { base.reversed() } else { base };
        let inc = if depth > DEPTH_THRESHOLD {
            let factor = 1.0 + self.smoothed as f64 * depth as f64;
            Increment::from_raw((base.raw() as f64 * factor) as i64)
        } else {
            base
        };
        inc.clamp_magnitude(self.ceiling)
    }

    /// Current smoothed modulation value in `[-1, 1]`
    #[inline]
    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}
