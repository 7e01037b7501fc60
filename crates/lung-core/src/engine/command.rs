//! Lock-free command queue into the render thread
//!
//! Transport changes, retuning and sample binding are pushed from the
//! control side onto an `rtrb` ring buffer and drained at the top of the
//! next block, so every block sees one consistent set of settings. Both
//! ends are wait-free; a full queue rejects the command instead of blocking.
//!
//! ```ignore
//! let (engine, mut handle) = LoopEngine::new(EngineConfig::default())?;
//! handle.commands.bind_sample(buffer)?;
//! handle.commands.arm(true)?;
//! handle.commands.play(true)?;
//! ```

use basedrop::Shared;

use super::gc::gc_handle;
use crate::config::FilterKind;
use crate::error::{EngineError, EngineResult};
use crate::types::{PlaybackMode, SampleBuffer};

/// Commands sent from the control side to the render thread
pub enum EngineCommand {
    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────
    /// Arm (Ready) or disarm (Idle)
    Arm(bool),
    /// Play or pause; ignored while Idle
    Play(bool),
    SetMode(PlaybackMode),
    /// Octave selector position (0 = LFO range)
    SetOctave(u8),
    /// Request a crossfade into the currently mapped region
    TriggerReset,

    // ─────────────────────────────────────────────────────────────
    // Sample binding
    // ─────────────────────────────────────────────────────────────
    /// Replace the bound sample; the old one is freed off the render thread
    BindSample(Shared<SampleBuffer>),
    UnbindSample,

    // ─────────────────────────────────────────────────────────────
    // Retuning
    // ─────────────────────────────────────────────────────────────
    SetFx1Filter(FilterKind),
    /// Conditioner cutoff for every channel (Hz)
    SetConditionerCutoff(f32),
    /// Raw conditioner shift for every channel
    SetConditionerShift(u8),
    /// Median-of-3 enable bits, one per channel
    SetMedian3Mask(u32),
}

impl EngineCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::Arm(_) => "Arm",
            EngineCommand::Play(_) => "Play",
            EngineCommand::SetMode(_) => "SetMode",
            EngineCommand::SetOctave(_) => "SetOctave",
            EngineCommand::TriggerReset => "TriggerReset",
            EngineCommand::BindSample(_) => "BindSample",
            EngineCommand::UnbindSample => "UnbindSample",
            EngineCommand::SetFx1Filter(_) => "SetFx1Filter",
            EngineCommand::SetConditionerCutoff(_) => "SetConditionerCutoff",
            EngineCommand::SetConditionerShift(_) => "SetConditionerShift",
            EngineCommand::SetMedian3Mask(_) => "SetMedian3Mask",
        }
    }
}

/// Queue depth; a burst of knob-driven retunes stays far below this
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Create the producer/consumer pair
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

/// Control-side end of the command queue
pub struct CommandSender {
    producer: rtrb::Producer<EngineCommand>,
}

impl CommandSender {
    pub fn new(producer: rtrb::Producer<EngineCommand>) -> Self {
        Self { producer }
    }

    /// Queue a command without blocking
    ///
    /// A full queue drops the command and reports it.
    pub fn send(&mut self, cmd: EngineCommand) -> EngineResult<()> {
        self.producer.push(cmd).map_err(|rtrb::PushError::Full(cmd)| {
            log::warn!("Command queue full, dropping {}", cmd.name());
            EngineError::QueueFull(cmd.name())
        })
    }

    /// Free slots in the queue
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }

    pub fn arm(&mut self, armed: bool) -> EngineResult<()> {
        self.send(EngineCommand::Arm(armed))
    }

    pub fn play(&mut self, playing: bool) -> EngineResult<()> {
        self.send(EngineCommand::Play(playing))
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) -> EngineResult<()> {
        self.send(EngineCommand::SetMode(mode))
    }

    pub fn set_octave(&mut self, position: u8) -> EngineResult<()> {
        self.send(EngineCommand::SetOctave(position))
    }

    pub fn trigger_reset(&mut self) -> EngineResult<()> {
        self.send(EngineCommand::TriggerReset)
    }

    /// Hand a sample buffer to the render thread
    pub fn bind_sample(&mut self, buffer: SampleBuffer) -> EngineResult<()> {
        log::info!(
            "Binding sample: {} samples at {}Hz",
            buffer.len(),
            buffer.sample_rate()
        );
        self.send(EngineCommand::BindSample(Shared::new(&gc_handle(), buffer)))
    }

    pub fn unbind_sample(&mut self) -> EngineResult<()> {
        self.send(EngineCommand::UnbindSample)
    }

    pub fn set_fx1_filter(&mut self, kind: FilterKind) -> EngineResult<()> {
        self.send(EngineCommand::SetFx1Filter(kind))
    }

    pub fn set_conditioner_cutoff(&mut self, cutoff_hz: f32) -> EngineResult<()> {
        self.send(EngineCommand::SetConditionerCutoff(cutoff_hz))
    }

    pub fn set_conditioner_shift(&mut self, shift: u8) -> EngineResult<()> {
        self.send(EngineCommand::SetConditionerShift(shift))
    }

    pub fn set_median3_mask(&mut self, mask: u32) -> EngineResult<()> {
        self.send(EngineCommand::SetMedian3Mask(mask))
    }
}
