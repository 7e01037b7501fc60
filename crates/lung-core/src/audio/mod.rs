//! Output side of the render loop
//!
//! The engine fills fixed-size blocks of unsigned output codes through the
//! [`BlockSink`] trait. [`DoubleBuffer`] is the ping-pong implementation
//! used by the offline renderer and the tests; a hardware backend would
//! implement the trait over its DMA halves.

mod sink;

pub use sink::{BlockSink, DoubleBuffer, OutputFormat};
