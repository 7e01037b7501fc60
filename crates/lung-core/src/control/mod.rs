//! Control inputs and conditioning
//!
//! Raw 12-bit readings arrive in [`ControlInputs`] (written by the ADC side,
//! read by the render side). Once per block the [`ControlBank`] filters them
//! into a [`ControlSnapshot`] that the whole block then uses. The modulation
//! channel is additionally read raw on every sample.

mod bank;
mod filter;

pub use bank::ControlBank;
pub use filter::{shift_for_cutoff, ControlFilter, MAX_SHIFT};

use std::sync::atomic::{AtomicU16, Ordering};

use crate::types::{CONTROL_MAX, NUM_CONTROL_INPUTS};

/// Analog control channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ControlChannel {
    LoopStart = 0,
    LoopLength = 1,
    Tune = 2,
    /// Speed modulation input, also read unfiltered every sample
    Modulation = 3,
    XfadeLength = 4,
    Fx1 = 5,
    Fx2 = 6,
    ModDepth = 7,
}

impl ControlChannel {
    /// All channels in index order
    pub const ALL: [ControlChannel; NUM_CONTROL_INPUTS] = [
        ControlChannel::LoopStart,
        ControlChannel::LoopLength,
        ControlChannel::Tune,
        ControlChannel::Modulation,
        ControlChannel::XfadeLength,
        ControlChannel::Fx1,
        ControlChannel::Fx2,
        ControlChannel::ModDepth,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Convert from index (0-7)
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlChannel::LoopStart => "Loop Start",
            ControlChannel::LoopLength => "Loop Length",
            ControlChannel::Tune => "Tune",
            ControlChannel::Modulation => "Modulation",
            ControlChannel::XfadeLength => "Crossfade",
            ControlChannel::Fx1 => "FX 1",
            ControlChannel::Fx2 => "FX 2",
            ControlChannel::ModDepth => "Mod Depth",
        }
    }
}

/// Latest raw reading of every control channel
///
/// Shared between the acquisition side and the render side through an
/// `Arc`. Each channel is an independent relaxed atomic; the render side
/// takes one coherent-enough copy per block with [`read_all`](Self::read_all).
#[derive(Debug, Default)]
pub struct ControlInputs {
    raw: [AtomicU16; NUM_CONTROL_INPUTS],
}

impl ControlInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading, clamped to 12 bits
    #[inline]
    pub fn set(&self, channel: ControlChannel, value: u16) {
        self.raw[channel.index()].store(value.min(CONTROL_MAX), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self, channel: ControlChannel) -> u16 {
        self.raw[channel.index()].load(Ordering::Relaxed)
    }

    /// Copy every channel
    #[inline]
    pub fn read_all(&self) -> [u16; NUM_CONTROL_INPUTS] {
        std::array::from_fn(|i| self.raw[i].load(Ordering::Relaxed))
    }
}

/// Conditioned control values for one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlSnapshot {
    pub loop_start: u16,
    pub loop_length: u16,
    pub xfade_length: u16,
    pub tune: u16,
    pub mod_depth: u16,
    pub fx1: u16,
    pub fx2: u16,
}

impl ControlSnapshot {
    /// Build from per-channel values in channel index order
    pub fn from_values(values: &[u16; NUM_CONTROL_INPUTS]) -> Self {
        let at = |ch: ControlChannel| values[ch.index()];
        Self {
            loop_start: at(ControlChannel::LoopStart),
            loop_length: at(ControlChannel::LoopLength),
            xfade_length: at(ControlChannel::XfadeLength),
            tune: at(ControlChannel::Tune),
            mod_depth: at(ControlChannel::ModDepth),
            fx1: at(ControlChannel::Fx1),
            fx2: at(ControlChannel::Fx2),
        }
    }

    /// Modulation depth as a 0..1 amount
    #[inline]
    pub fn mod_depth_amount(&self) -> f32 {
        self.mod_depth.min(CONTROL_MAX) as f32 / CONTROL_MAX as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_indices() {
        for (i, ch) in ControlChannel::ALL.iter().enumerate() {
            assert_eq!(ch.index(), i);
            assert_eq!(ControlChannel::from_index(i), Some(*ch));
        }
        assert_eq!(ControlChannel::from_index(NUM_CONTROL_INPUTS), None);
    }

    #[test]
    fn test_inputs_clamp_to_12_bits() {
        let inputs = ControlInputs::new();
        inputs.set(ControlChannel::Tune, u16::MAX);
        assert_eq!(inputs.get(ControlChannel::Tune), CONTROL_MAX);
        inputs.set(ControlChannel::Fx2, 1234);
        assert_eq!(inputs.read_all()[ControlChannel::Fx2.index()], 1234);
    }

    #[test]
    fn test_snapshot_from_values() {
        let values = [10, 11, 12, 13, 14, 15, 16, 4095];
        let snap = ControlSnapshot::from_values(&values);
        assert_eq!(snap.loop_start, 10);
        assert_eq!(snap.loop_length, 11);
        assert_eq!(snap.tune, 12);
        assert_eq!(snap.xfade_length, 14);
        assert_eq!(snap.fx1, 15);
        assert_eq!(snap.fx2, 16);
        assert_eq!(snap.mod_depth_amount(), 1.0);
    }
}
