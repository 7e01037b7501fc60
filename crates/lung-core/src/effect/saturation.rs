//! Variable soft-clip saturation
//!
//! Drives the input into a polynomial tanh approximation and blends the
//! result with the dry signal by the same amount, so the effect fades in
//! continuously from the identity at amount 0.

use crate::types::Sample;

use super::ladder::MAX_COEFFICIENT;

/// Where the odd polynomial stops tracking tanh
const KNEE: f32 = 1.0;

/// `x - x³/3 + 2x⁵/15`, held at its knee value beyond ±1
#[inline]
fn soft_clip(x: f32) -> f32 {
    let x = x.clamp(-KNEE, KNEE);
    let x2 = x * x;
    x * (1.0 - x2 / 3.0 + 2.0 * x2 * x2 / 15.0)
}

/// Stateless soft clipper
#[derive(Debug, Clone, Copy, Default)]
pub struct Saturation;

impl Saturation {
    pub fn new() -> Self {
        Saturation
    }

    /// Saturate `input` with a Q15 amount (0 = bypass, 32767 = fully wet, 3x drive)
    #[inline]
    pub fn process(&self, input: Sample, coefficient: u16) -> Sample {
        if coefficient == 0 {
            return input;
        }
        let amount = coefficient.min(MAX_COEFFICIENT) as f32 / MAX_COEFFICIENT as f32;
        let dry = input as f32 / 32768.0;
        let wet = soft_clip(dry * (1.0 + 2.0 * amount));
        let out = dry * (1.0 - amount) + wet * amount;
        ((out * 32768.0) as i32).clamp(Sample::MIN as i32, Sample::MAX as i32) as Sample
    }
}
