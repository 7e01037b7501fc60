//! Post-processing effects
//!
//! All effects here are integer (or integer-in, integer-out), one sample at
//! a time, with fixed-size state. They run inside the render loop after the
//! voice mix:
//!
//! ```text
//! mix ──▶ Saturation (FX 2) ──▶ Ladder LP / HP (FX 1) ──▶ output
//! ```

mod chain;
mod ladder;
mod saturation;

pub use chain::{knob_to_coefficient, PostChain, MIN_COEFFICIENT};
pub use ladder::{LadderHighpass, LadderLowpass, OnePoleCascade, MAX_COEFFICIENT, POLES};
pub use saturation::Saturation;
