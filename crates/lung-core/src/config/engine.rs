//! Engine configuration
//!
//! Everything the render path needs to know up front. Values are checked by
//! [`EngineConfig::validate`] when the engine is built; the render path
//! itself never sees an invalid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{BLOCK_SIZE, MAX_BLOCK_SIZE, OUTPUT_SAMPLE_RATE};

/// Which cascade the effect 1 knob drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Lowpass,
    Highpass,
}

/// Control conditioner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    /// EMA cutoff applied to every conditioned channel (Hz)
    pub cutoff_hz: f32,
    /// Bit `i` enables the median-of-3 spike filter on channel `i`
    pub median3_mask: u32,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            cutoff_hz: 2.0,
            median3_mask: 0,
        }
    }
}

/// Configuration for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Render rate in Hz
    pub output_sample_rate: u32,
    /// Samples per render block
    pub block_size: usize,
    /// Output values span `0..output_resolution`
    pub output_resolution: u32,
    /// Loop length reserved at the minimum loop-length knob position
    pub min_loop_len: u32,
    /// Shortest crossfade, in source samples
    pub min_xfade_len: u32,
    /// Shortest crossfade, in output samples
    pub min_xfade_samples: u32,
    /// Floor on |speed| when converting a crossfade length to a duration
    pub speed_floor: f32,
    /// One-pole coefficient smoothing the modulation input
    pub modulation_smoothing: f32,
    /// Scale applied to the 0..1 modulation depth knob
    pub modulation_depth_range: f32,
    /// Ceiling on |speed| after modulation
    pub max_speed_ratio: f32,
    /// Samples before the buffer tail over which a fading primary fades to zero
    pub edge_fade_len: u32,
    /// Above this amplitude a fading primary clamps at the tail instead of wrapping
    pub edge_clamp_amplitude: f32,
    /// Effect 1 filter type
    pub fx1_filter: FilterKind,
    pub conditioner: ConditionerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_sample_rate: OUTPUT_SAMPLE_RATE,
            block_size: BLOCK_SIZE,
            output_resolution: 4096,
            min_loop_len: 2048,
            min_xfade_len: 8,
            min_xfade_samples: 16,
            speed_floor: 0.0001,
            modulation_smoothing: 0.85,
            modulation_depth_range: 1.0,
            max_speed_ratio: 32.0,
            edge_fade_len: 8,
            edge_clamp_amplitude: 0.1,
            fx1_filter: FilterKind::Lowpass,
            conditioner: ConditionerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Set the render rate
    pub fn with_output_sample_rate(mut self, rate: u32) -> Self {
        self.output_sample_rate = rate;
        self
    }

    /// Set the block size
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the conditioner cutoff
    pub fn with_cutoff_hz(mut self, cutoff_hz: f32) -> Self {
        self.conditioner.cutoff_hz = cutoff_hz;
        self
    }

    /// Rate at which the control conditioner is ticked (once per block)
    pub fn block_rate_hz(&self) -> f32 {
        self.output_sample_rate as f32 / self.block_size.max(1) as f32
    }

    /// Reject configurations the render path cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        if self.output_sample_rate == 0 {
            return Err(EngineError::InvalidOutputRate(self.output_sample_rate));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(EngineError::InvalidBlockSize(self.block_size));
        }
        if !(2..=65536).contains(&self.output_resolution) {
            return Err(EngineError::InvalidConfig(format!(
                "output_resolution {} outside 2..=65536",
                self.output_resolution
            )));
        }
        if !(0.0..1.0).contains(&self.modulation_smoothing) {
            return Err(EngineError::InvalidConfig(format!(
                "modulation_smoothing {} outside [0, 1)",
                self.modulation_smoothing
            )));
        }
        if !(self.max_speed_ratio > 0.0 && self.max_speed_ratio <= 1024.0) {
            return Err(EngineError::InvalidConfig(format!(
                "max_speed_ratio {} outside (0, 1024]",
                self.max_speed_ratio
            )));
        }
        if !(self.speed_floor > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "speed_floor {} must be positive",
                self.speed_floor
            )));
        }
        if !(self.modulation_depth_range >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "modulation_depth_range {} must not be negative",
                self.modulation_depth_range
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.block_rate_hz(), 3000.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::default().with_output_sample_rate(0).validate(),
            Err(EngineError::InvalidOutputRate(0))
        ));
        assert!(matches!(
            EngineConfig::default().with_block_size(0).validate(),
            Err(EngineError::InvalidBlockSize(0))
        ));
        assert!(matches!(
            EngineConfig::default().with_block_size(MAX_BLOCK_SIZE + 1).validate(),
            Err(EngineError::InvalidBlockSize(_))
        ));

        let mut config = EngineConfig::default();
        config.max_speed_ratio = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_kind_serializes_lowercase() {
        let yaml = serde_yaml::to_string(&FilterKind::Highpass).unwrap();
        assert_eq!(yaml.trim(), "highpass");
    }
}
