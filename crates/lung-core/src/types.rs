//! Common types for Lung
//!
//! Fundamental sample, control and transport types shared by the control
//! conditioner, the playback engine and the observer side.

use crate::error::{EngineError, EngineResult};

/// Default render rate (48kHz)
pub const OUTPUT_SAMPLE_RATE: u32 = 48000;

/// Samples rendered per block by default
pub const BLOCK_SIZE: usize = 16;

/// Largest block the engine accepts
pub const MAX_BLOCK_SIZE: usize = 4096;

/// Number of raw control inputs (analog channels)
pub const NUM_CONTROL_INPUTS: usize = 8;

/// Full scale of a 12-bit control reading
pub const CONTROL_MAX: u16 = 4095;

/// Bipolar zero of a 12-bit control reading
pub const CONTROL_CENTER: u16 = 2048;

/// Audio sample type (signed 16-bit, Q15)
pub type Sample = i16;

/// How the loop is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackMode {
    #[default]
    Forward,
    Reverse,
    /// Ping-pong: direction flips every time a crossfade is triggered
    Alternate,
}

impl PlaybackMode {
    /// Get the name of this mode
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackMode::Forward => "Forward",
            PlaybackMode::Reverse => "Reverse",
            PlaybackMode::Alternate => "Alternate",
        }
    }
}

/// Current traversal direction of the playhead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    #[inline]
    pub fn is_reverse(self) -> bool {
        self == Direction::Reverse
    }

    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Transport state of the engine
///
/// Only `Playing` produces audio; every other state renders silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportState {
    #[default]
    Idle,
    /// Armed and waiting for play
    Ready,
    Playing,
    Paused,
}

/// An immutable block of mono PCM bound to the engine for playback
///
/// Handed to the render thread wrapped in `basedrop::Shared` so that
/// replacing it never frees memory on the render thread.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap PCM data recorded at `sample_rate`
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> EngineResult<Self> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Length in samples, saturated to the 32-bit index range
    #[inline]
    pub fn len(&self) -> u32 {
        self.samples.len().min(u32::MAX as usize) as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Native rate of the material in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_flip() {
        assert_eq!(Direction::Forward.flipped(), Direction::Reverse);
        assert_eq!(Direction::Reverse.flipped().flipped(), Direction::Reverse);
        assert!(Direction::Reverse.is_reverse());
    }

    #[test]
    fn test_sample_buffer_rejects_zero_rate() {
        assert!(SampleBuffer::new(vec![0; 16], 0).is_err());
        let buffer = SampleBuffer::new(vec![1, 2, 3], 44100).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.sample_rate(), 44100);
    }
}
