//! Scripted source material and knob movement

use std::f32::consts::TAU;

use anyhow::Result;

use lung_core::config::FilterKind;
use lung_core::control::{ControlChannel, ControlInputs};
use lung_core::engine::{CommandSender, UNITY_OCTAVE};
use lung_core::{EngineResult, Sample, SampleBuffer, CONTROL_CENTER, CONTROL_MAX};

/// Length of the synthesized material in seconds
const MATERIAL_SECONDS: f32 = 3.0;

/// Notes in the synthesized phrase (Hz)
const PHRASE: [f32; 6] = [220.0, 277.18, 329.63, 440.0, 329.63, 277.18];

/// Plucked-note phrase with a little noise, so loop points are audible
pub fn synthesize(rate: u32) -> EngineResult<SampleBuffer> {
    let len = (MATERIAL_SECONDS * rate as f32) as usize;
    let note_len = len / PHRASE.len();
    let mut noise = 0x1234_5678u32;

    let samples = (0..len)
        .map(|i| {
            let note = PHRASE[(i / note_len).min(PHRASE.len() - 1)];
            let t = (i % note_len) as f32 / rate as f32;
            let envelope = (-4.0 * t).exp();
            let tone = (TAU * note * t).sin() + 0.3 * (TAU * 2.0 * note * t).sin();

            // xorshift for a faint noise bed
            noise ^= noise << 13;
            noise ^= noise >> 17;
            noise ^= noise << 5;
            let hiss = (noise >> 16) as f32 / 65536.0 - 0.5;

            let x = 0.6 * envelope * tone + 0.02 * hiss;
            (x.clamp(-1.0, 1.0) * Sample::MAX as f32) as Sample
        })
        .collect();
    SampleBuffer::new(samples, rate)
}

enum Cue {
    Reset,
    Octave(u8),
    Filter(FilterKind),
}

/// Knob positions and transport cues over time
pub struct Performance {
    rate: f32,
    cues: Vec<(f32, Cue)>,
    next_cue: usize,
}

impl Performance {
    pub fn new(output_rate: u32) -> Self {
        let cues = vec![
            (2.0, Cue::Reset),
            (3.0, Cue::Octave(UNITY_OCTAVE + 1)),
            (4.0, Cue::Reset),
            (4.5, Cue::Octave(UNITY_OCTAVE)),
            (5.0, Cue::Filter(FilterKind::Highpass)),
            (6.0, Cue::Reset),
            (6.5, Cue::Filter(FilterKind::Lowpass)),
        ];
        Self {
            rate: output_rate as f32,
            cues,
            next_cue: 0,
        }
    }

    /// Set every control for the moment `position` (in output samples)
    /// and fire any transport cues that have come due
    pub fn drive(&mut self, position: u64, controls: &ControlInputs, commands: &mut CommandSender) -> Result<()> {
        let t = position as f32 / self.rate;
        let knob = |x: f32| (x.clamp(0.0, 1.0) * CONTROL_MAX as f32) as u16;
        let sine = |hz: f32| (TAU * hz * t).sin();

        // Loop start drifts slowly through the material, length breathes
        let drift = (t / 16.0).fract();
        let triangle = 1.0 - (2.0 * drift - 1.0).abs();
        controls.set(ControlChannel::LoopStart, knob(0.7 * triangle));
        controls.set(ControlChannel::LoopLength, knob(0.3 + 0.2 * sine(0.1)));
        controls.set(ControlChannel::XfadeLength, knob(0.35));
        controls.set(ControlChannel::Tune, CONTROL_CENTER);

        // Vibrato in the second half of every 8 second cycle
        let depth = if (t % 8.0) >= 4.0 { 0.3 } else { 0.0 };
        controls.set(ControlChannel::ModDepth, knob(depth));
        controls.set(ControlChannel::Modulation, knob(0.5 + 0.5 * sine(5.0)));

        controls.set(ControlChannel::Fx1, knob(0.75 + 0.2 * sine(0.25)));
        controls.set(ControlChannel::Fx2, knob(0.2));

        while let Some((at, cue)) = self.cues.get(self.next_cue) {
            if *at > t {
                break;
            }
            match cue {
                Cue::Reset => commands.trigger_reset()?,
                Cue::Octave(position) => commands.set_octave(*position)?,
                Cue::Filter(kind) => commands.set_fx1_filter(*kind)?,
            }
            log::debug!("cue at {:.2}s", t);
            self.next_cue += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_material() {
        let buffer = synthesize(8000).unwrap();
        assert_eq!(buffer.len(), 24_000);
        assert_eq!(buffer.sample_rate(), 8000);
        assert!(buffer.samples().iter().any(|&s| s.abs() > 10_000));
    }

    #[test]
    fn test_cues_fire_once_in_order() {
        let (tx, mut rx) = lung_core::engine::command_channel();
        let mut commands = CommandSender::new(tx);
        let controls = ControlInputs::new();
        let mut performance = Performance::new(1000);

        performance.drive(0, &controls, &mut commands).unwrap();
        assert!(rx.pop().is_err(), "nothing due at t=0");

        performance.drive(2500, &controls, &mut commands).unwrap();
        assert_eq!(rx.pop().unwrap().name(), "TriggerReset");
        assert!(rx.pop().is_err());

        performance.drive(10_000, &controls, &mut commands).unwrap();
        let names: Vec<_> = std::iter::from_fn(|| rx.pop().ok()).map(|c| c.name()).collect();
        assert_eq!(
            names,
            ["SetOctave", "TriggerReset", "SetOctave", "SetFx1Filter", "TriggerReset", "SetFx1Filter"]
        );
        assert!(controls.get(ControlChannel::LoopLength) > 0);
    }
}
