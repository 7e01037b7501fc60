//! Render loop - ties conditioning, transport, voices, effects and display

use std::sync::Arc;

use basedrop::Shared;

use super::command::{command_channel, CommandSender, EngineCommand};
use super::crossfade::{fade_duration, CrossfadeScheduler, FadePlan};
use super::loop_map::LoopMapper;
use super::phase::Increment;
use super::transport::{speed_ratio, unity_ratio, SpeedModulator, OCTAVE_POSITIONS, UNITY_OCTAVE};
use super::voice::{EdgeGuard, Interpolator, LinearInterpolator};
use crate::audio::{BlockSink, OutputFormat};
use crate::config::EngineConfig;
use crate::control::{ControlBank, ControlChannel, ControlInputs};
use crate::display::{display_channel, DisplayPublisher, DisplayReader, DisplaySnapshot};
use crate::effect::PostChain;
use crate::error::EngineResult;
use crate::types::{Direction, PlaybackMode, SampleBuffer, TransportState};

/// Everything the non-real-time side keeps after building an engine
pub struct EngineHandle {
    /// Transport, retune and sample-binding commands
    pub commands: CommandSender,
    /// Display snapshots, published once per block
    pub display: DisplayReader,
    /// Raw control readings, written by the acquisition side
    pub controls: Arc<ControlInputs>,
}

/// The real-time loop playback engine
///
/// Owned by the render thread. Each call to [`render_block`](Self::render_block):
/// 1. Drains pending commands
/// 2. Conditions the control inputs once for the whole block
/// 3. Renders every sample (modulated increment, crossfade step, mix,
///    saturation, filter, output encode)
/// 4. Publishes a display snapshot
///
/// Nothing here allocates, locks or logs after construction.
pub struct LoopEngine<I: Interpolator = LinearInterpolator> {
    config: EngineConfig,
    commands: rtrb::Consumer<EngineCommand>,
    controls: Arc<ControlInputs>,
    bank: ControlBank,
    scheduler: CrossfadeScheduler,
    modulator: SpeedModulator,
    mapper: LoopMapper,
    post: PostChain,
    publisher: DisplayPublisher,
    format: OutputFormat,
    interpolator: I,
    sample: Option<Shared<SampleBuffer>>,
    /// Native rate over output rate of the bound sample
    unity: f64,
    state: TransportState,
    mode: PlaybackMode,
    direction: Direction,
    octave: u8,
    reset_pending: bool,
    trigger_count: u32,
}

impl LoopEngine<LinearInterpolator> {
    /// Build an engine with linear interpolation
    pub fn new(config: EngineConfig) -> EngineResult<(Self, EngineHandle)> {
        Self::with_interpolator(config, LinearInterpolator)
    }
}

impl<I: Interpolator> LoopEngine<I> {
    /// Build an engine with a custom two-point interpolator
    pub fn with_interpolator(config: EngineConfig, interpolator: I) -> EngineResult<(Self, EngineHandle)> {
        config.validate()?;

        let (producer, consumer) = command_channel();
        let (publisher, reader) = display_channel();
        let controls = Arc::new(ControlInputs::new());

        log::info!(
            "LoopEngine: {}Hz, {} samples/block, conditioner {}Hz at {:.0}Hz tick",
            config.output_sample_rate,
            config.block_size,
            config.conditioner.cutoff_hz,
            config.block_rate_hz()
        );

        let engine = Self {
            bank: ControlBank::new(&config.conditioner, config.block_rate_hz()),
            scheduler: CrossfadeScheduler::new(EdgeGuard {
                clamp_amplitude: config.edge_clamp_amplitude,
                fade_len: config.edge_fade_len,
            }),
            modulator: SpeedModulator::new(config.modulation_smoothing, config.max_speed_ratio),
            mapper: LoopMapper::new(config.min_loop_len),
            post: PostChain::new(config.fx1_filter),
            format: OutputFormat::new(config.output_resolution),
            commands: consumer,
            controls: Arc::clone(&controls),
            publisher,
            interpolator,
            sample: None,
            unity: 1.0,
            state: TransportState::Idle,
            mode: PlaybackMode::Forward,
            direction: Direction::Forward,
            octave: UNITY_OCTAVE,
            reset_pending: false,
            trigger_count: 0,
            config,
        };

        let handle = EngineHandle {
            commands: CommandSender::new(producer),
            display: reader,
            controls,
        };
        Ok((engine, handle))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Current traversal direction (flips on every trigger in alternate mode)
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn scheduler(&self) -> &CrossfadeScheduler {
        &self.scheduler
    }

    /// Code the sink receives for silence
    pub fn silence_code(&self) -> u16 {
        self.format.midpoint()
    }

    /// Drain the command queue
    pub fn process_commands(&mut self) {
        while let Ok(cmd) = self.commands.pop() {
            self.apply(cmd);
        }
    }

    fn apply(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Arm(armed) => {
                self.state = if armed { TransportState::Ready } else { TransportState::Idle };
            }
            EngineCommand::Play(playing) => {
                if self.state != TransportState::Idle {
                    self.state = if playing { TransportState::Playing } else { TransportState::Paused };
                }
            }
            EngineCommand::SetMode(mode) => {
                self.mode = mode;
                match mode {
                    PlaybackMode::Forward => self.direction = Direction::Forward,
                    PlaybackMode::Reverse => self.direction = Direction::Reverse,
                    PlaybackMode::Alternate => {}
                }
            }
            EngineCommand::SetOctave(position) => {
                self.octave = position.min(OCTAVE_POSITIONS - 1);
            }
            EngineCommand::TriggerReset => self.reset_pending = true,
            EngineCommand::BindSample(buffer) => {
                self.unity = unity_ratio(buffer.sample_rate(), self.config.output_sample_rate);
                // The previous buffer drops here; basedrop defers the free
                self.sample = Some(buffer);
                self.cold_start();
            }
            EngineCommand::UnbindSample => {
                self.sample = None;
                self.cold_start();
            }
            EngineCommand::SetFx1Filter(kind) => self.post.set_fx1(kind),
            EngineCommand::SetConditionerCutoff(cutoff_hz) => {
                self.bank.set_cutoff_hz(self.config.block_rate_hz(), cutoff_hz);
            }
            EngineCommand::SetConditionerShift(shift) => self.bank.set_shift(shift),
            EngineCommand::SetMedian3Mask(mask) => self.bank.set_median3_mask(mask),
        }
    }

    /// Forget voice, modulation and filter state after a (re)bind
    fn cold_start(&mut self) {
        self.scheduler.reset_voices();
        self.modulator.reset();
        self.post.reset();
        self.reset_pending = false;
    }

    /// Render one block of output codes into `out`
    ///
    /// Anything other than `Playing` with a bound sample of at least two
    /// samples renders silence.
    pub fn render_block(&mut self, out: &mut [u16]) {
        self.process_commands();
        self.bank.update(&self.controls.read_all());

        let samples = match (&self.sample, self.state) {
            (Some(buffer), TransportState::Playing) if buffer.len() >= 2 => buffer.samples(),
            _ => {
                out.fill(self.format.midpoint());
                return;
            }
        };
        let total = samples.len().min(u32::MAX as usize) as u32;

        // Block-rate parameters: the snapshot is taken once and used throughout
        let controls = self.bank.snapshot();
        let mapper = self.mapper;
        let ratio = speed_ratio(self.octave, controls.tune) as f64 * self.unity;
        let base = Increment::from_ratio(ratio);
        let depth = controls.mod_depth_amount() * self.config.modulation_depth_range;

        if !self.scheduler.boundaries_valid() || self.reset_pending {
            self.scheduler
                .refresh_boundaries(mapper.map_snapshot(&controls, total), self.direction);
        }
        let xfade_len = self
            .scheduler
            .voices()
            .primary()
            .region
            .xfade_len(controls.xfade_length, self.config.min_xfade_len);
        let xfade_samples = fade_duration(
            xfade_len,
            ratio,
            self.config.speed_floor,
            self.config.min_xfade_samples,
        );
        let ping_pong = self.mode == PlaybackMode::Alternate;

        for slot in out.iter_mut() {
            let modulation = self.controls.get(ControlChannel::Modulation);
            let inc = self.modulator.increment(base, self.direction, modulation, depth);

            let plan = FadePlan {
                xfade_len,
                xfade_samples,
                direction: self.direction,
                ping_pong,
            };
            let outcome = self.scheduler.step(inc, &plan, &mut self.reset_pending, || {
                mapper.map_snapshot(&controls, total)
            });
            if outcome.trigger.is_some() {
                self.trigger_count = self.trigger_count.wrapping_add(1);
                if ping_pong {
                    self.direction = self.direction.flipped();
                }
            }

            let fetch_direction = if inc.is_reverse() { Direction::Reverse } else { Direction::Forward };
            let mixed = self.scheduler.mix(samples, fetch_direction, &self.interpolator);
            let processed = self.post.process(mixed, controls.fx1, controls.fx2);
            *slot = self.format.encode(processed);
        }

        let voices = self.scheduler.voices();
        let (loop_start_q12, loop_len_q12) = voices.primary().region.normalized(total);
        let crossfading = self.scheduler.is_crossfading();
        self.publisher.publish(&DisplaySnapshot {
            loop_start_q12,
            loop_len_q12,
            total,
            playhead: voices.primary().index(),
            playhead2: if crossfading { voices.secondary().index() } else { 0 },
            crossfading,
            trigger_count: self.trigger_count,
        });
    }

    /// Render into the sink's next free block
    ///
    /// Returns false (rendering nothing) while the sink has no free block.
    pub fn render_into<S: BlockSink>(&mut self, sink: &mut S) -> bool {
        match sink.next_block() {
            Some(block) => {
                self.render_block(block);
                sink.commit();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::DoubleBuffer;
    use crate::config::FilterKind;
    use crate::types::{Sample, CONTROL_CENTER, CONTROL_MAX};

    const TOTAL: usize = 10_000;

    fn ramp_buffer(rate: u32) -> SampleBuffer {
        let samples = (0..TOTAL).map(|i| ((i % 2000) as i32 * 8 - 8000) as Sample).collect();
        SampleBuffer::new(samples, rate).unwrap()
    }

    /// Engine bound to a 10k-sample buffer at the output rate, whole buffer looped,
    /// tune centred, effects at their lightest settings
    fn playing_engine() -> (LoopEngine, EngineHandle) {
        let config = EngineConfig::default();
        let rate = config.output_sample_rate;
        let (mut engine, mut handle) = LoopEngine::new(config).unwrap();

        let controls = &handle.controls;
        controls.set(ControlChannel::LoopStart, 0);
        controls.set(ControlChannel::LoopLength, CONTROL_MAX);
        controls.set(ControlChannel::Tune, CONTROL_CENTER);
        controls.set(ControlChannel::Modulation, CONTROL_CENTER);
        controls.set(ControlChannel::Fx1, CONTROL_MAX);

        handle.commands.bind_sample(ramp_buffer(rate)).unwrap();
        handle.commands.arm(true).unwrap();
        handle.commands.play(true).unwrap();
        engine.process_commands();
        (engine, handle)
    }

    fn render(engine: &mut LoopEngine) -> Vec<u16> {
        let mut out = vec![0u16; engine.config().block_size];
        engine.render_block(&mut out);
        out
    }

    #[test]
    fn test_idle_renders_silence() {
        let (mut engine, handle) = LoopEngine::new(EngineConfig::default()).unwrap();
        let silence = engine.silence_code();
        assert!(render(&mut engine).iter().all(|&c| c == silence));
        assert_eq!(engine.state(), TransportState::Idle);
        assert_eq!(handle.display.read(), DisplaySnapshot::default());
    }

    #[test]
    fn test_transport_state_machine() {
        let (mut engine, mut handle) = LoopEngine::new(EngineConfig::default()).unwrap();
        handle.commands.play(true).unwrap();
        engine.process_commands();
        assert_eq!(engine.state(), TransportState::Idle, "play is ignored while idle");

        handle.commands.arm(true).unwrap();
        engine.process_commands();
        assert_eq!(engine.state(), TransportState::Ready);

        handle.commands.play(true).unwrap();
        handle.commands.play(false).unwrap();
        engine.process_commands();
        assert_eq!(engine.state(), TransportState::Paused);

        handle.commands.arm(false).unwrap();
        engine.process_commands();
        assert_eq!(engine.state(), TransportState::Idle);
    }

    #[test]
    fn test_playing_without_sample_is_silent() {
        let (mut engine, mut handle) = LoopEngine::new(EngineConfig::default()).unwrap();
        handle.commands.arm(true).unwrap();
        handle.commands.play(true).unwrap();
        let silence = engine.silence_code();
        assert!(render(&mut engine).iter().all(|&c| c == silence));

        let tiny = SampleBuffer::new(vec![1000], 48000).unwrap();
        handle.commands.bind_sample(tiny).unwrap();
        assert!(render(&mut engine).iter().all(|&c| c == silence));
    }

    #[test]
    fn test_playback_advances_and_publishes() {
        let (mut engine, handle) = playing_engine();
        let out = render(&mut engine);
        assert!(out.iter().any(|&c| c != engine.silence_code()));

        let snap = handle.display.read();
        assert_eq!(snap.total, TOTAL as u32);
        assert_eq!(snap.playhead, 16, "unity speed advances one sample per output sample");
        assert_eq!(snap.loop_start_q12, 0);
        assert_eq!(snap.loop_len_q12, CONTROL_MAX);
        assert!(!snap.crossfading);
        assert_eq!(snap.playhead2, 0);

        render(&mut engine);
        assert_eq!(handle.display.read().playhead, 32);
    }

    #[test]
    fn test_native_rate_scales_speed() {
        let config = EngineConfig::default();
        let (mut engine, mut handle) = LoopEngine::new(config).unwrap();
        handle.controls.set(ControlChannel::LoopLength, CONTROL_MAX);
        handle.controls.set(ControlChannel::Tune, CONTROL_CENTER);
        handle.controls.set(ControlChannel::Modulation, CONTROL_CENTER);
        handle.commands.bind_sample(ramp_buffer(24_000)).unwrap();
        handle.commands.arm(true).unwrap();
        handle.commands.play(true).unwrap();

        render(&mut engine);
        assert_eq!(handle.display.read().playhead, 8, "half-rate material plays at half speed");
    }

    #[test]
    fn test_octave_selector() {
        let (mut engine, mut handle) = playing_engine();
        handle.commands.set_octave(UNITY_OCTAVE + 1).unwrap();
        render(&mut engine);
        assert_eq!(handle.display.read().playhead, 32);
    }

    #[test]
    fn test_reset_starts_crossfade() {
        let (mut engine, mut handle) = playing_engine();
        handle.controls.set(ControlChannel::XfadeLength, CONTROL_MAX);
        render(&mut engine);

        handle.commands.trigger_reset().unwrap();
        render(&mut engine);
        let snap = handle.display.read();
        assert!(snap.crossfading, "a long crossfade is still running after one block");
        assert_eq!(snap.trigger_count, 1);
        // Incoming voice entered at the loop start and advanced with the primary
        assert_eq!(snap.playhead2, 16);
        assert_eq!(snap.playhead, 32);
    }

    #[test]
    fn test_zone_trigger_hands_over() {
        let (mut engine, handle) = playing_engine();
        // Shortest crossfade: 8-sample zone, 16-sample fade
        let mut seen_fade = false;
        for _ in 0..(TOTAL / 16 + 4) {
            render(&mut engine);
            seen_fade |= handle.display.read().crossfading;
        }
        let snap = handle.display.read();
        assert!(seen_fade, "the block containing the trigger ends mid-fade");
        assert_eq!(snap.trigger_count, 1);
        assert!(!snap.crossfading);
        assert!(snap.playhead < 200, "new primary restarted near the loop start, at {}", snap.playhead);
    }

    #[test]
    fn test_alternate_mode_flips_direction() {
        let (mut engine, mut handle) = playing_engine();
        handle.commands.set_mode(PlaybackMode::Alternate).unwrap();
        render(&mut engine);
        assert_eq!(engine.direction(), Direction::Forward);

        handle.commands.trigger_reset().unwrap();
        render(&mut engine);
        assert_eq!(engine.direction(), Direction::Reverse);

        handle.commands.set_mode(PlaybackMode::Forward).unwrap();
        render(&mut engine);
        assert_eq!(engine.direction(), Direction::Forward);
    }

    #[test]
    fn test_reverse_mode_plays_backwards() {
        let (mut engine, mut handle) = playing_engine();
        handle.commands.set_mode(PlaybackMode::Reverse).unwrap();
        handle.commands.bind_sample(ramp_buffer(48_000)).unwrap();
        render(&mut engine);
        // Cold start in reverse enters at the loop end
        assert_eq!(handle.display.read().playhead, TOTAL as u32 - 1 - 16);
    }

    #[test]
    fn test_rebind_cold_starts() {
        let (mut engine, mut handle) = playing_engine();
        for _ in 0..10 {
            render(&mut engine);
        }
        assert_eq!(handle.display.read().playhead, 160);

        handle.commands.bind_sample(ramp_buffer(48_000)).unwrap();
        render(&mut engine);
        assert_eq!(handle.display.read().playhead, 16);
        assert_eq!(engine.state(), TransportState::Playing);
    }

    #[test]
    fn test_retune_commands() {
        let (mut engine, mut handle) = playing_engine();
        handle.commands.set_conditioner_shift(3).unwrap();
        handle.commands.set_median3_mask(0b1).unwrap();
        handle.commands.set_fx1_filter(FilterKind::Highpass).unwrap();
        engine.process_commands();
        assert_eq!(engine.post.fx1(), FilterKind::Highpass);
        assert_eq!(engine.bank.filter(ControlChannel::Tune).shift(), 3);
        assert!(engine.bank.filter(ControlChannel::LoopStart).median3_enabled());

        handle.commands.set_conditioner_cutoff(2.0).unwrap();
        engine.process_commands();
        assert_eq!(engine.bank.filter(ControlChannel::Tune).shift(), 8);
    }

    #[test]
    fn test_render_into_double_buffer() {
        let (mut engine, _handle) = playing_engine();
        let mut sink = DoubleBuffer::new(engine.config().block_size, 0);
        assert!(engine.render_into(&mut sink));
        assert!(engine.render_into(&mut sink));
        assert!(!engine.render_into(&mut sink), "both halves are waiting for the consumer");
        assert!(sink.consume().is_some());
        assert!(engine.render_into(&mut sink));
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(LoopEngine::new(EngineConfig::default().with_block_size(0)).is_err());
    }
}
