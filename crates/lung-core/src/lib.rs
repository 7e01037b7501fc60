//! Lung Core - real-time playback core for the Lung loop sampler
//!
//! This crate contains the render-side machinery of the sampler:
//! - Q32.32 phase accumulation with through-zero frequency modulation
//! - Dual-voice constant-power crossfading at loop boundaries
//! - Control conditioning (median-of-3 plus shift-based EMA)
//! - Integer post-processing (saturation and an 8-pole ladder filter)
//! - A seqlock display channel for lock-free observers
//!
//! The render path never allocates, locks or logs. Configuration and
//! sample binding reach it through a lock-free command queue.

pub mod audio;
pub mod config;
pub mod control;
pub mod display;
pub mod effect;
pub mod engine;
pub mod error;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use types::*;
