//! Playback engine
//!
//! - Phase: 32.32 fixed-point positions and increments
//! - Transport: pitch and through-zero speed modulation
//! - LoopMapper: control knobs to loop regions
//! - Voice: per-voice state and interpolated fetch
//! - CrossfadeScheduler: the two-voice hand-off state machine
//! - LoopEngine: the per-block render loop tying everything together

mod command;
mod crossfade;
mod engine;
pub mod gc;
mod loop_map;
mod phase;
mod transport;
mod voice;

pub use command::*;
pub use crossfade::*;
pub use engine::*;
pub use loop_map::*;
pub use phase::*;
pub use transport::*;
pub use voice::*;
