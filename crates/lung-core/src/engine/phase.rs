//! 32.32 fixed-point playback position
//!
//! The upper 32 bits of a [`Phase`] are the sample index, the lower 32 bits
//! the sub-sample phase. Positions move by a signed [`Increment`] in the
//! same format; wrap arithmetic runs in wider signed integers so transient
//! negative offsets (reverse playback past the loop start) are exact.

const FRAC_BITS: u32 = 32;
const FRAC_MASK: u64 = (1 << FRAC_BITS) - 1;

/// Sample position in 32.32 fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Phase(u64);

impl Phase {
    pub const ZERO: Phase = Phase(0);

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Phase(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Position exactly on sample `index`
    #[inline]
    pub const fn from_index(index: u32) -> Self {
        Phase((index as u64) << FRAC_BITS)
    }

    /// Integer sample index
    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 >> FRAC_BITS) as u32
    }

    /// Sub-sample phase as a 0..2^32 fraction
    #[inline]
    pub const fn fraction(self) -> u32 {
        (self.0 & FRAC_MASK) as u32
    }

    /// Top 8 fractional bits, the interpolation weight
    #[inline]
    pub const fn weight(self) -> u8 {
        (self.fraction() >> 24) as u8
    }

    /// Move by `inc`, two's-complement wrapping
    #[inline]
    pub fn advance(self, inc: Increment) -> Self {
        Phase(self.0.wrapping_add_signed(inc.0))
    }

    /// Fold the position into `[start, end)` by modulo arithmetic
    ///
    /// Offsets past the end reduce modulo the span; negative offsets (a
    /// reverse overrun of `start`) map to `span - (-offset mod span)`, with
    /// an exact multiple landing on `start`. An empty or inverted region is
    /// left untouched. The stored value is read as signed so that a reverse
    /// step below zero is seen as negative rather than as a huge index.
    #[inline]
    pub fn wrapped(self, start: u32, end: u32) -> Self {
        if end <= start {
            return self;
        }
        let start_q = (start as i128) << FRAC_BITS;
        let span = ((end - start) as i128) << FRAC_BITS;
        let mut offset = self.0 as i64 as i128 - start_q;

        if offset >= span {
            offset %= span;
        } else if offset < 0 {
            offset = span - ((-offset) % span);
            if offset == span {
                offset = 0;
            }
        }
        Phase((start_q + offset) as u64)
    }
}

/// Signed per-sample position step in 32.32 fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Increment(i64);

impl Increment {
    pub const ZERO: Increment = Increment(0);

    /// One source sample per output sample
    pub const UNITY: Increment = Increment(1 << FRAC_BITS);

    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Increment(raw)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Increment for a speed ratio; saturates on overflow, NaN is zero
    #[inline]
    pub fn from_ratio(ratio: f64) -> Self {
        Increment((ratio * (1u64 << FRAC_BITS) as f64) as i64)
    }

    #[inline]
    pub fn ratio(self) -> f64 {
        self.0 as f64 / (1u64 << FRAC_BITS) as f64
    }

    #[inline]
    pub fn is_reverse(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn reversed(self) -> Self {
        Increment(self.0.saturating_neg())
    }

    /// Limit the magnitude to `max`
    #[inline]
    pub fn clamp_magnitude(self, max: Increment) -> Self {
        let max = max.0.saturating_abs();
        Increment(self.0.clamp(-max, max))
    }
}
