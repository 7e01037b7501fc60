//! Filter bank over all control channels

use super::filter::ControlFilter;
use super::ControlChannel;
use super::ControlSnapshot;
use crate::config::ConditionerConfig;
use crate::types::NUM_CONTROL_INPUTS;

/// One [`ControlFilter`] per channel, ticked once per block
#[derive(Debug, Clone)]
pub struct ControlBank {
    filters: [ControlFilter; NUM_CONTROL_INPUTS],
    values: [u16; NUM_CONTROL_INPUTS],
}

impl ControlBank {
    /// Build a bank ticked at `tick_rate_hz`
    pub fn new(config: &ConditionerConfig, tick_rate_hz: f32) -> Self {
        let mut bank = Self {
            filters: std::array::from_fn(|_| ControlFilter::new(0, false)),
            values: [0; NUM_CONTROL_INPUTS],
        };
        bank.set_cutoff_hz(tick_rate_hz, config.cutoff_hz);
        bank.set_median3_mask(config.median3_mask);
        bank
    }

    /// Filter one set of raw readings
    #[inline]
    pub fn update(&mut self, raw: &[u16; NUM_CONTROL_INPUTS]) {
        for ((filter, value), &reading) in self.filters.iter_mut().zip(&mut self.values).zip(raw) {
            *value = filter.process(reading);
        }
    }

    #[inline]
    pub fn get(&self, channel: ControlChannel) -> u16 {
        self.values[channel.index()]
    }

    /// Values for the current block
    #[inline]
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot::from_values(&self.values)
    }

    /// Retune every channel to `cutoff_hz`
    pub fn set_cutoff_hz(&mut self, tick_rate_hz: f32, cutoff_hz: f32) {
        for filter in &mut self.filters {
            filter.set_cutoff_hz(tick_rate_hz, cutoff_hz);
        }
    }

    /// Set a raw smoothing shift on every channel
    pub fn set_shift(&mut self, shift: u8) {
        for filter in &mut self.filters {
            filter.set_shift(shift);
        }
    }

    /// Bit `i` of `mask` enables the spike filter on channel `i`
    pub fn set_median3_mask(&mut self, mask: u32) {
        for (i, filter) in self.filters.iter_mut().enumerate() {
            filter.set_median3(mask & (1 << i) != 0);
        }
    }

    pub fn filter(&self, channel: ControlChannel) -> &ControlFilter {
        &self.filters[channel.index()]
    }

    /// Reseed every channel on the next update
    pub fn reset(&mut self) {
        self.filters.iter_mut().for_each(ControlFilter::reset);
    }
}
