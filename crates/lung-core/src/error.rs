//! Engine error types

use thiserror::Error;

/// Errors raised while configuring or driving the playback engine
///
/// None of these are produced on the render path; the render thread
/// degrades to silence instead of failing.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Sample material declared with a zero native rate
    #[error("Invalid native sample rate: {0}Hz")]
    InvalidSampleRate(u32),

    /// Output rate of zero
    #[error("Invalid output sample rate: {0}Hz")]
    InvalidOutputRate(u32),

    /// Block size outside 1..=MAX_BLOCK_SIZE
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    /// Any other out-of-range configuration value
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Command queue to the render thread is full
    #[error("Command queue full, dropped {0}")]
    QueueFull(&'static str),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
