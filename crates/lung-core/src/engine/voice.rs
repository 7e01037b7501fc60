//! Playback voices and interpolated sample fetch

use super::loop_map::LoopRegion;
use super::phase::{Increment, Phase};
use crate::types::{Direction, Sample};

/// Two-point blend between neighbouring samples
///
/// `weight` is the top 8 bits of the sub-sample phase: 0 returns `from`,
/// 255 returns (almost) `to`.
pub trait Interpolator {
    fn interpolate(&self, from: Sample, to: Sample, weight: u8) -> Sample;
}

/// Integer linear interpolation
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl Interpolator for LinearInterpolator {
    #[inline]
    fn interpolate(&self, from: Sample, to: Sample, weight: u8) -> Sample {
        let a = from as i32;
        let b = to as i32;
        (a + (((b - a) * weight as i32) >> 8)) as Sample
    }
}

/// Tail handling for a fading primary voice that has run past the buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeGuard {
    /// Above this amplitude the read index clamps to the last sample;
    /// at or below it the index wraps
    pub clamp_amplitude: f32,
    /// Samples before the buffer tail over which the output fades to zero
    pub fade_len: u32,
}

impl Default for EdgeGuard {
    fn default() -> Self {
        Self {
            clamp_amplitude: 0.1,
            fade_len: 8,
        }
    }
}

/// One playback voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub position: Phase,
    pub region: LoopRegion,
    /// Mixing gain, 0.0..=1.0
    pub amplitude: f32,
    pub active: bool,
}

impl Voice {
    /// Inactive, silent, no region
    pub const fn silent() -> Self {
        Self {
            position: Phase::ZERO,
            region: LoopRegion::new(0, 0),
            amplitude: 0.0,
            active: false,
        }
    }

    /// Place the voice at the entry point of `region` for `direction`
    ///
    /// Forward playback enters at `start`, reverse at `end - 1`. The
    /// amplitude is left alone; the caller fades it in.
    pub fn enter(&mut self, region: LoopRegion, direction: Direction) {
        self.region = region;
        self.position = match direction {
            Direction::Forward => Phase::from_index(region.start),
            Direction::Reverse => Phase::from_index(region.end.saturating_sub(1).max(region.start)),
        };
        self.active = true;
    }

    #[inline]
    pub fn advance(&mut self, inc: Increment) {
        self.position = self.position.advance(inc);
    }

    /// Fold the position back into the loop region
    #[inline]
    pub fn wrap(&mut self) {
        self.position = self.position.wrapped(self.region.start, self.region.end);
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.position.index()
    }

    /// Deactivate and zero the gain
    pub fn silence(&mut self) {
        self.active = false;
        self.amplitude = 0.0;
    }

    /// Interpolated sample at the current position
    ///
    /// Returns 0 for an inactive or silent voice, an invalid region, or an
    /// index outside `samples`. With `edge` set (the voice is the fading-out
    /// primary and is not being wrapped) an index past the buffer is clamped
    /// to the buffer edge while the voice is still loud and wrapped once it
    /// is nearly silent. The last `edge.fade_len` samples before the edge in
    /// the direction of travel ramp to zero so the clamp itself is inaudible.
    #[inline]
    pub fn fetch<I: Interpolator>(
        &self,
        samples: &[Sample],
        direction: Direction,
        edge: Option<EdgeGuard>,
        interpolator: &I,
    ) -> Sample {
        if !self.active || self.amplitude <= 0.0 || !self.region.is_valid() || samples.is_empty() {
            return 0;
        }
        let total = samples.len().min(u32::MAX as usize) as u32;
        let mut index = self.position.index();
        let mut tail_gain = 1.0f32;

        match edge {
            Some(guard) => {
                let underrun = (self.position.raw() as i64) < 0;
                if underrun || index >= total {
                    index = match (self.amplitude > guard.clamp_amplitude, underrun) {
                        (true, true) => 0,
                        (true, false) => total - 1,
                        (false, _) => index % total,
                    };
                }
                let to_edge = match direction {
                    Direction::Forward => total - 1 - index,
                    Direction::Reverse => index,
                };
                let fade_len = guard.fade_len.min(total);
                if to_edge < fade_len {
                    let span = fade_len.saturating_sub(1).max(1) as f32;
                    tail_gain = (to_edge as f32 / span).clamp(0.0, 1.0);
                }
            }
            None if index >= total => return 0,
            None => {}
        }

        let LoopRegion { start, end } = self.region;
        let neighbour = match direction {
            Direction::Forward if index.saturating_add(1) < end => index + 1,
            Direction::Forward => start,
            Direction::Reverse if index > start => index - 1,
            Direction::Reverse => end - 1,
        };
        // Region ends may lie past a shorter buffer during a rebind race
        let neighbour = neighbour.min(total - 1);

        let a = samples[index as usize];
        let b = samples[neighbour as usize];
        let blended = interpolator.interpolate(a, b, self.position.weight());
        if tail_gain < 1.0 {
            (blended as f32 * tail_gain) as Sample
        } else {
            blended
        }
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::silent()
    }
}

/// Which slot of a [`VoicePair`] a role points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceSlot {
    A,
    B,
}

impl VoiceSlot {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            VoiceSlot::A => 0,
            VoiceSlot::B => 1,
        }
    }

    #[inline]
    pub fn other(self) -> Self {
        match self {
            VoiceSlot::A => VoiceSlot::B,
            VoiceSlot::B => VoiceSlot::A,
        }
    }
}

/// The two voices and which one is primary
///
/// Swapping roles flips the slot tag; the voice data never moves.
#[derive(Debug, Clone)]
pub struct VoicePair {
    voices: [Voice; 2],
    primary: VoiceSlot,
}

impl VoicePair {
    /// Slot A primary at full gain, slot B silent
    pub fn new() -> Self {
        let mut primary = Voice::silent();
        primary.active = true;
        primary.amplitude = 1.0;
        Self {
            voices: [primary, Voice::silent()],
            primary: VoiceSlot::A,
        }
    }

    #[inline]
    pub fn primary_slot(&self) -> VoiceSlot {
        self.primary
    }

    #[inline]
    pub fn primary(&self) -> &Voice {
        &self.voices[self.primary.index()]
    }

    #[inline]
    pub fn secondary(&self) -> &Voice {
        &self.voices[self.primary.other().index()]
    }

    #[inline]
    pub fn primary_mut(&mut self) -> &mut Voice {
        &mut self.voices[self.primary.index()]
    }

    #[inline]
    pub fn secondary_mut(&mut self) -> &mut Voice {
        &mut self.voices[self.primary.other().index()]
    }

    /// Both voices at once, primary first
    #[inline]
    pub fn split_mut(&mut self) -> (&mut Voice, &mut Voice) {
        let [a, b] = &mut self.voices;
        match self.primary {
            VoiceSlot::A => (a, b),
            VoiceSlot::B => (b, a),
        }
    }

    /// Exchange the primary and secondary roles
    #[inline]
    pub fn swap_roles(&mut self) {
        self.primary = self.primary.other();
    }
}

impl Default for VoicePair {
    fn default() -> Self {
        Self::new()
    }
}
