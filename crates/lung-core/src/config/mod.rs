//! Configuration for the Lung playback core
//!
//! - Generic YAML config loading/saving
//! - `EngineConfig`, the parameter set the engine is built from
//!
//! # Usage
//!
//! ```ignore
//! use lung_core::config::{load_config, save_config, EngineConfig};
//!
//! let config: EngineConfig = load_config(&config_path);
//! save_config(&config, &config_path)?;
//! ```

mod engine;
mod io;

pub use engine::{ConditionerConfig, EngineConfig, FilterKind};
pub use io::{load_config, save_config};
