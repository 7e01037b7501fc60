//! Dual-voice crossfade scheduler
//!
//! Watches the primary voice approach its loop boundary, brings the
//! secondary voice in at the start of a freshly mapped region and hands
//! over with a constant-power fade.
//!
//! ```text
//!            zone entry / reset
//!   Idle ─────────────────────────▶ Crossfading
//!     ▲                                  │
//!     └──────── remaining == 0 ──────────┘
//!               (roles swap, old primary silenced)
//! ```
//!
//! While fading, the outgoing primary is not wrapped: it keeps playing
//! straight on past its old loop end, and [`Voice::fetch`] guards the
//! buffer tail.

use std::f32::consts::FRAC_PI_2;

use super::loop_map::LoopRegion;
use super::phase::Increment;
use super::voice::{EdgeGuard, Interpolator, Voice, VoicePair};
use crate::types::{Direction, Sample};

/// Convert a crossfade length in source samples to an output-sample duration
///
/// The length is divided by |speed| (floored at `speed_floor`) and never
/// drops below `min_samples`. There is no upper bound.
pub fn fade_duration(xfade_len: u32, speed_ratio: f64, speed_floor: f32, min_samples: u32) -> u32 {
    let speed = speed_ratio.abs().max(speed_floor as f64).max(f64::MIN_POSITIVE);
    let samples = (xfade_len as f64 / speed).min(u32::MAX as f64) as u32;
    samples.max(min_samples).max(1)
}

/// An in-progress crossfade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeSession {
    total: u32,
    remaining: u32,
}

impl FadeSession {
    /// A fade of `total` steps (at least one)
    pub fn new(total: u32) -> Self {
        let total = total.max(1);
        Self {
            total,
            remaining: total,
        }
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Fade position in `[0, 1]`
    #[inline]
    pub fn progress(&self) -> f32 {
        (self.total - self.remaining) as f32 / self.total as f32
    }

    /// `(outgoing, incoming)` gains on a quarter-circle, so their squares sum to one
    #[inline]
    pub fn gains(&self) -> (f32, f32) {
        let (sin, cos) = (FRAC_PI_2 * self.progress()).sin_cos();
        (cos, sin)
    }

    /// Count one step down; true once the fade is over
    #[inline]
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Per-block crossfade parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadePlan {
    /// Trigger zone length in source samples (0 disables zone triggering)
    pub xfade_len: u32,
    /// Fade duration in output samples
    pub xfade_samples: u32,
    /// Current playback direction
    pub direction: Direction,
    /// Flip direction on every trigger (alternate mode)
    pub ping_pong: bool,
}

impl FadePlan {
    /// Direction the incoming voice will play in
    #[inline]
    pub fn incoming_direction(&self) -> Direction {
        if self.ping_pong {
            self.direction.flipped()
        } else {
            self.direction
        }
    }
}

/// What caused a crossfade to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The primary entered the trigger zone
    ZoneEntry,
    /// An external reset request was serviced
    Reset,
}

/// Result of one scheduler step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// A crossfade started on this step
    pub trigger: Option<Trigger>,
    /// A crossfade finished and the voices swapped roles on this step
    pub committed: bool,
}

/// Two voices plus the state machine that fades between them
#[derive(Debug, Clone)]
pub struct CrossfadeScheduler {
    voices: VoicePair,
    session: Option<FadeSession>,
    /// Region the most recent trigger mapped for the incoming voice
    pending: LoopRegion,
    was_in_zone: bool,
    boundaries_valid: bool,
    edge: EdgeGuard,
}

impl CrossfadeScheduler {
    pub fn new(edge: EdgeGuard) -> Self {
        Self {
            voices: VoicePair::new(),
            session: None,
            pending: LoopRegion::default(),
            was_in_zone: false,
            boundaries_valid: false,
            edge,
        }
    }

    #[inline]
    pub fn voices(&self) -> &VoicePair {
        &self.voices
    }

    #[inline]
    pub fn session(&self) -> Option<&FadeSession> {
        self.session.as_ref()
    }

    #[inline]
    pub fn is_crossfading(&self) -> bool {
        self.session.is_some()
    }

    #[inline]
    pub fn pending(&self) -> LoopRegion {
        self.pending
    }

    /// False after a hand-off or a reset until [`refresh_boundaries`](Self::refresh_boundaries)
    #[inline]
    pub fn boundaries_valid(&self) -> bool {
        self.boundaries_valid
    }

    /// Record the current mapped region
    ///
    /// On a cold start (the primary has never had a region) the primary is
    /// placed at the region's entry point for `direction`.
    pub fn refresh_boundaries(&mut self, region: LoopRegion, direction: Direction) {
        self.pending = region;
        self.boundaries_valid = true;

        let primary = self.voices.primary_mut();
        if !primary.region.is_valid() && region.is_valid() {
            primary.enter(region, direction);
            primary.amplitude = 1.0;
        }
    }

    /// Advance one output sample
    ///
    /// `reset` is the external trigger flag; it is serviced (and cleared)
    /// only while no crossfade is running. `next_region` maps the current
    /// controls and is only called when a crossfade actually starts.
    pub fn step<F>(
        &mut self,
        inc: Increment,
        plan: &FadePlan,
        reset: &mut bool,
        mut next_region: F,
    ) -> StepOutcome
    where
        F: FnMut() -> LoopRegion,
    {
        let mut outcome = StepOutcome::default();

        // Zone entry, tested on the pre-advance position
        if self.session.is_none() && !*reset && plan.xfade_len > 0 {
            let primary = self.voices.primary();
            let in_zone = primary
                .region
                .in_trigger_zone(primary.index(), plan.xfade_len, plan.direction);
            if in_zone && !self.was_in_zone {
                self.begin(next_region(), plan);
                outcome.trigger = Some(Trigger::ZoneEntry);
            }
            self.was_in_zone = in_zone;
        }

        let fading = self.session.is_some();
        let primary = self.voices.primary_mut();
        primary.advance(inc);
        if !fading {
            primary.wrap();
        }

        if *reset && self.session.is_none() {
            *reset = false;
            self.begin(next_region(), plan);
            outcome.trigger = Some(Trigger::Reset);
        }

        if let Some(session) = self.session.as_mut() {
            let (primary, secondary) = self.voices.split_mut();
            secondary.advance(inc);
            secondary.wrap();

            let (outgoing, incoming) = session.gains();
            primary.amplitude = outgoing;
            secondary.amplitude = incoming;

            if session.tick() {
                self.commit();
                outcome.committed = true;
            }
        }

        outcome
    }

    /// Mix both voices for the current position
    ///
    /// Each audible voice is scaled by its gain and summed wide, then
    /// clamped to the sample range. The outgoing primary gets the buffer
    /// tail guard while a fade runs.
    #[inline]
    pub fn mix<I: Interpolator>(&self, samples: &[Sample], direction: Direction, interpolator: &I) -> Sample {
        let edge = self.session.map(|_| self.edge);
        let voice_out = |voice: &Voice, edge: Option<EdgeGuard>| -> i32 {
            if voice.active && voice.amplitude > 0.0 {
                let s = voice.fetch(samples, direction, edge, interpolator);
                (s as f32 * voice.amplitude) as i32
            } else {
                0
            }
        };
        let acc = voice_out(self.voices.primary(), edge) + voice_out(self.voices.secondary(), None);
        acc.clamp(Sample::MIN as i32, Sample::MAX as i32) as Sample
    }

    /// Back to a single silent-region primary, as after construction
    pub fn reset_voices(&mut self) {
        self.voices = VoicePair::new();
        self.session = None;
        self.pending = LoopRegion::default();
        self.was_in_zone = false;
        self.boundaries_valid = false;
    }

    /// Start a fade into `region`
    fn begin(&mut self, region: LoopRegion, plan: &FadePlan) {
        self.pending = region;
        self.voices.secondary_mut().enter(region, plan.incoming_direction());
        self.session = Some(FadeSession::new(plan.xfade_samples));
    }

    /// Finish a fade: swap roles, silence the outgoing voice
    fn commit(&mut self) {
        self.session = None;
        self.voices.swap_roles();
        self.voices.secondary_mut().silence();
        self.voices.primary_mut().amplitude = 1.0;
        self.boundaries_valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::voice::LinearInterpolator;

    fn plan(xfade_len: u32, xfade_samples: u32, direction: Direction) -> FadePlan {
        FadePlan {
            xfade_len,
            xfade_samples,
            direction,
            ping_pong: false,
        }
    }

    #[test]
    fn test_fade_duration() {
        assert_eq!(fade_duration(500, 1.0, 0.0001, 16), 500);
        assert_eq!(fade_duration(500, -2.0, 0.0001, 16), 250);
        assert_eq!(fade_duration(8, 1.0, 0.0001, 16), 16, "minimum is a lower bound");
        assert_eq!(fade_duration(100, 0.25, 0.0001, 16), 400, "slow playback lengthens the fade");
        assert_eq!(fade_duration(100, 0.0, 0.0001, 16), 1_000_000);
        assert_eq!(fade_duration(0, 1.0, 0.0001, 0), 1);
    }

    #[test]
    fn test_session_terminates_in_total_steps() {
        for total in [1u32, 2, 16, 500, 4097] {
            let mut session = FadeSession::new(total);
            let mut steps = 0;
            while !session.tick() {
                steps += 1;
                assert!(steps < total);
            }
            assert_eq!(steps + 1, total);
            assert_eq!(session.remaining(), 0);
        }
        assert_eq!(FadeSession::new(0).total(), 1);
    }

    #[test]
    fn test_forward_scenario_single_trigger() {
        let mut scheduler = CrossfadeScheduler::new(EdgeGuard::default());
        let region = LoopRegion::new(1000, 9000);
        scheduler.refresh_boundaries(region, Direction::Forward);
        assert_eq!(scheduler.voices().primary().index(), 1000);

        let xfade_samples = fade_duration(500, 1.0, 0.0001, 16);
        let plan = plan(500, xfade_samples, Direction::Forward);
        let mut reset = false;

        let mut triggers = Vec::new();
        let mut commit_step = None;
        for step in 0..9000u32 {
            let before = scheduler.voices().primary().index();
            let outcome = scheduler.step(Increment::UNITY, &plan, &mut reset, || region);
            if outcome.trigger.is_some() {
                triggers.push((step, before));
            }
            if outcome.committed {
                commit_step = Some(step);
            }
        }

        assert_eq!(triggers, vec![(7500, 8500)], "exactly one trigger, on entering 8500");
        assert!(xfade_samples >= 16);
        assert_eq!(commit_step, Some(7500 + xfade_samples - 1));
        // The incoming voice took over 500 samples into the region
        assert!(!scheduler.is_crossfading());
        assert_eq!(scheduler.voices().primary().index(), 2500);
    }

    #[test]
    fn test_reverse_scenario_triggers_at_head() {
        let mut scheduler = CrossfadeScheduler::new(EdgeGuard::default());
        let region = LoopRegion::new(0, 5000);
        scheduler.refresh_boundaries(region, Direction::Reverse);
        assert_eq!(scheduler.voices().primary().index(), 4999);

        let plan = plan(300, 300, Direction::Reverse);
        let mut reset = false;
        let mut trigger_at = None;
        for _ in 0..5000 {
            let before = scheduler.voices().primary().index();
            let outcome = scheduler.step(Increment::UNITY.reversed(), &plan, &mut reset, || region);
            if outcome.trigger.is_some() {
                assert!(trigger_at.is_none(), "second trigger at {}", before);
                trigger_at = Some(before);
            }
        }
        assert_eq!(trigger_at, Some(299));
        // Incoming voice entered at the tail of the region
        assert_eq!(scheduler.pending(), region);
    }

    #[test]
    fn test_constant_power_through_fade() {
        let mut scheduler = CrossfadeScheduler::new(EdgeGuard::default());
        let region = LoopRegion::new(0, 4000);
        scheduler.refresh_boundaries(region, Direction::Forward);
        let plan = plan(1000, 777, Direction::Forward);
        let mut reset = true;

        let outcome = scheduler.step(Increment::UNITY, &plan, &mut reset, || region);
        assert_eq!(outcome.trigger, Some(Trigger::Reset));
        assert!(!reset, "serviced reset is cleared");

        let mut steps = 1;
        loop {
            let voices = scheduler.voices();
            if scheduler.is_crossfading() {
                let p = voices.primary().amplitude;
                let s = voices.secondary().amplitude;
                assert!((p * p + s * s - 1.0).abs() < 1e-5, "power {} at step {}", p * p + s * s, steps);
            }
            let outcome = scheduler.step(Increment::UNITY, &plan, &mut reset, || region);
            steps += 1;
            if outcome.committed {
                break;
            }
        }
        assert_eq!(steps, 777);
        assert_eq!(scheduler.voices().primary().amplitude, 1.0);
        assert!(!scheduler.voices().secondary().active);
        assert_eq!(scheduler.voices().secondary().amplitude, 0.0);
        assert!(!scheduler.boundaries_valid(), "hand-off invalidates cached boundaries");
    }

    #[test]
    fn test_reset_deferred_until_fade_completes() {
        let mut scheduler = CrossfadeScheduler::new(EdgeGuard::default());
        let region = LoopRegion::new(0, 4000);
        scheduler.refresh_boundaries(region, Direction::Forward);
        let plan = plan(8, 100, Direction::Forward);

        let mut reset = true;
        scheduler.step(Increment::UNITY, &plan, &mut reset, || region);
        assert!(scheduler.is_crossfading());

        reset = true;
        let mut committed_at = None;
        for step in 1..200 {
            let outcome = scheduler.step(Increment::UNITY, &plan, &mut reset, || region);
            if outcome.committed {
                committed_at = Some(step);
            }
            if outcome.trigger.is_some() {
                assert_eq!(outcome.trigger, Some(Trigger::Reset));
                assert_eq!(Some(step - 1), committed_at, "reset serviced right after the hand-off");
                return;
            }
        }
        panic!("deferred reset never serviced");
    }

    #[test]
    fn test_trigger_maps_region_fresh() {
        let mut scheduler = CrossfadeScheduler::new(EdgeGuard::default());
        scheduler.refresh_boundaries(LoopRegion::new(0, 1000), Direction::Forward);
        let plan = plan(100, 50, Direction::Forward);
        let mut reset = false;
        let mut calls = 0;
        let moved = LoopRegion::new(2000, 3000);

        for _ in 0..1000 {
            scheduler.step(Increment::UNITY, &plan, &mut reset, || {
                calls += 1;
                moved
            });
        }
        assert_eq!(calls, 1, "region is mapped once per trigger");
        assert_eq!(scheduler.voices().primary().region, moved);
    }

    #[test]
    fn test_outgoing_primary_runs_past_loop_end() {
        let mut scheduler = CrossfadeScheduler::new(EdgeGuard::default());
        let region = LoopRegion::new(0, 1000);
        scheduler.refresh_boundaries(region, Direction::Forward);
        let plan = plan(10, 400, Direction::Forward);
        let mut reset = false;

        for _ in 0..1100 {
            scheduler.step(Increment::UNITY, &plan, &mut reset, || region);
        }
        // Triggered at 990, so the outgoing voice is now beyond the loop end
        assert!(scheduler.is_crossfading());
        assert_eq!(scheduler.voices().primary().index(), 1100);
        assert_eq!(scheduler.voices().secondary().index(), 110);
    }

    #[test]
    fn test_ping_pong_enters_reversed() {
        let mut scheduler = CrossfadeScheduler::new(EdgeGuard::default());
        let region = LoopRegion::new(100, 600);
        scheduler.refresh_boundaries(region, Direction::Forward);
        let plan = FadePlan {
            ping_pong: true,
            ..plan(50, 20, Direction::Forward)
        };
        let mut reset = true;
        scheduler.step(Increment::UNITY, &plan, &mut reset, || region);
        // Entered at the tail for reverse play, then advanced one step with the shared increment
        assert_eq!(scheduler.voices().secondary().index(), 100);
        let mut reset = true;
        let mut fresh = CrossfadeScheduler::new(EdgeGuard::default());
        fresh.refresh_boundaries(region, Direction::Forward);
        fresh.step(Increment::UNITY.reversed(), &plan, &mut reset, || region);
        assert_eq!(fresh.voices().secondary().index(), 598);
    }

    #[test]
    fn test_mix_clamps_and_silences() {
        let samples = vec![30_000 as Sample; 2000];
        let lerp = LinearInterpolator;
        let mut scheduler = CrossfadeScheduler::new(EdgeGuard::default());
        let region = LoopRegion::new(0, 2000);
        scheduler.refresh_boundaries(region, Direction::Forward);
        assert_eq!(scheduler.mix(&samples, Direction::Forward, &lerp), 30_000);

        let plan = plan(8, 1000, Direction::Forward);
        let mut reset = true;
        for _ in 0..500 {
            scheduler.step(Increment::UNITY, &plan, &mut reset, || region);
        }
        // cos + sin peaks at ~1.41 mid-fade: the sum must clamp, not wrap
        assert_eq!(scheduler.mix(&samples, Direction::Forward, &lerp), Sample::MAX);

        scheduler.reset_voices();
        assert_eq!(scheduler.mix(&samples, Direction::Forward, &lerp), 0);
    }
}
