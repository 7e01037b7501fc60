//! Loop regions and the knob-to-region mapping

use crate::control::ControlSnapshot;
use crate::types::{Direction, CONTROL_MAX};

/// Half-open sample range `[start, end)` a voice loops over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoopRegion {
    pub start: u32,
    pub end: u32,
}

impl LoopRegion {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A region can only be played if it holds at least one sample
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    /// Whether `index` lies in the crossfade trigger zone
    ///
    /// The zone is the last `xfade_len` samples of the region when playing
    /// forward and the first `xfade_len` samples when playing in reverse.
    #[inline]
    pub fn in_trigger_zone(&self, index: u32, xfade_len: u32, direction: Direction) -> bool {
        match direction {
            Direction::Reverse => {
                let zone_end = self.start.saturating_add(xfade_len).min(self.end);
                index >= self.start && index < zone_end
            }
            Direction::Forward => {
                let zone_start = self.end.saturating_sub(xfade_len).max(self.start);
                index >= zone_start && index < self.end
            }
        }
    }

    /// Crossfade length for a 12-bit knob reading
    ///
    /// Scales up to half the loop, with `min_len` as a floor as long as the
    /// loop is long enough to hold it. Invalid regions get no crossfade.
    pub fn xfade_len(&self, knob: u16, min_len: u32) -> u32 {
        if !self.is_valid() {
            return 0;
        }
        let max_len = self.len() / 2;
        let scaled = ((max_len as u64 * knob.min(CONTROL_MAX) as u64) >> 12) as u32;
        scaled.max(min_len).min(max_len)
    }

    /// Start and length as 12-bit fractions of `total`, for display
    pub fn normalized(&self, total: u32) -> (u16, u16) {
        let total = total.max(1) as u64;
        let scale = |x: u32| ((x as u64 * CONTROL_MAX as u64) / total).min(CONTROL_MAX as u64) as u16;
        (scale(self.start), scale(self.len()))
    }
}

/// Maps loop start/length knobs to a region of a buffer
///
/// A fixed minimum loop length is reserved; the rest of the buffer is
/// shared out proportionally by the two knobs. Pure and side-effect free,
/// so the live region and a pending crossfade target can be computed
/// independently from the same inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopMapper {
    min_len: u32,
}

impl LoopMapper {
    pub const fn new(min_len: u32) -> Self {
        Self { min_len }
    }

    #[inline]
    pub fn min_len(&self) -> u32 {
        self.min_len
    }

    /// Region for raw 12-bit start/length readings over `total` samples
    pub fn map(&self, start_knob: u16, len_knob: u16, total: u32) -> LoopRegion {
        let span = total.saturating_sub(self.min_len) as u64;
        let proportion =
            |knob: u16| ((knob.min(CONTROL_MAX) as u64 * span) / CONTROL_MAX as u64) as u32;

        let start = proportion(start_knob);
        let len = self.min_len.saturating_add(proportion(len_knob));
        let end = start.saturating_add(len).min(total);
        LoopRegion { start, end }
    }

    /// Region for the loop knobs of a control snapshot
    #[inline]
    pub fn map_snapshot(&self, controls: &ControlSnapshot, total: u32) -> LoopRegion {
        self.map(controls.loop_start, controls.loop_length, total)
    }
}
