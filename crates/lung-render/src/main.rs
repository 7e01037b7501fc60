//! Lung Render - drives the playback core offline and writes a WAV file
//!
//! Stands in for the hardware around the engine:
//! 1. Synthesizes a sample buffer in place of the storage collaborator
//! 2. Moves the control inputs along a scripted performance
//! 3. Pulls blocks through a double buffer like the output DMA would
//! 4. Runs an observer thread that polls display snapshots
//!
//! ## Command line flags
//!
//! - `--config <path>`: load an `EngineConfig` from YAML
//! - `--write-config <path>`: save the effective config and exit
//! - `--out <path>`: output WAV (default `lung-render.wav`)
//! - `--seconds <n>`: length to render (default 8)
//! - `--mode <forward|reverse|alternate>`: starting playback mode
//! - `--realtime`: pace rendering to wall-clock time

mod performance;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use lung_core::audio::{DoubleBuffer, OutputFormat};
use lung_core::config::{load_config, save_config, EngineConfig};
use lung_core::display::DisplayReader;
use lung_core::engine::LoopEngine;
use lung_core::PlaybackMode;

use performance::Performance;

/// Native rate of the synthesized material
const SOURCE_RATE: u32 = 44_100;

/// How often the observer polls the display snapshot
const OBSERVER_PERIOD: Duration = Duration::from_millis(50);

struct Args {
    config: Option<PathBuf>,
    write_config: Option<PathBuf>,
    out: PathBuf,
    seconds: f32,
    mode: PlaybackMode,
    realtime: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        write_config: None,
        out: PathBuf::from("lung-render.wav"),
        seconds: 8.0,
        mode: PlaybackMode::Forward,
        realtime: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = || iter.next().with_context(|| format!("{} needs a value", flag));
        match flag.as_str() {
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--write-config" => args.write_config = Some(PathBuf::from(value()?)),
            "--out" => args.out = PathBuf::from(value()?),
            "--seconds" => {
                let raw = value()?;
                args.seconds = raw
                    .parse()
                    .with_context(|| format!("invalid --seconds value: {}", raw))?;
            }
            "--mode" => {
                args.mode = match value()?.as_str() {
                    "forward" => PlaybackMode::Forward,
                    "reverse" => PlaybackMode::Reverse,
                    "alternate" => PlaybackMode::Alternate,
                    other => bail!("unknown mode: {}", other),
                }
            }
            "--realtime" => args.realtime = true,
            other => bail!("unknown argument: {}", other),
        }
    }

    if !(args.seconds > 0.0) {
        bail!("--seconds must be positive");
    }
    Ok(args)
}

/// Poll the display until told to stop; returns the number of distinct snapshots seen
fn spawn_observer(reader: DisplayReader, stop: Arc<AtomicBool>) -> Result<thread::JoinHandle<usize>> {
    thread::Builder::new()
        .name("lung-observer".to_string())
        .spawn(move || {
            let mut last_triggers = 0;
            let mut distinct = 0;
            let mut previous = None;
            while !stop.load(Ordering::Relaxed) {
                let snap = reader.read();
                if previous != Some(snap) {
                    distinct += 1;
                    previous = Some(snap);
                }
                if snap.trigger_count != last_triggers {
                    last_triggers = snap.trigger_count;
                    log::info!(
                        "crossfade #{}: loop {}+{} /4095, playhead {}/{}",
                        snap.trigger_count,
                        snap.loop_start_q12,
                        snap.loop_len_q12,
                        snap.playhead,
                        snap.total
                    );
                }
                thread::sleep(OBSERVER_PERIOD);
            }
            distinct
        })
        .context("Failed to spawn observer thread")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;

    let config: EngineConfig = match &args.config {
        Some(path) => load_config(path),
        None => EngineConfig::default(),
    };
    if let Some(path) = &args.write_config {
        save_config(&config, path)?;
        return Ok(());
    }

    let (mut engine, mut handle) = LoopEngine::new(config.clone())?;
    let format = OutputFormat::new(config.output_resolution);

    let mut performance = Performance::new(config.output_sample_rate);
    let material = performance::synthesize(SOURCE_RATE)?;
    log::info!(
        "Synthesized {} samples at {}Hz ({:.2}s)",
        material.len(),
        SOURCE_RATE,
        material.len() as f32 / SOURCE_RATE as f32
    );

    handle.commands.bind_sample(material)?;
    handle.commands.set_mode(args.mode)?;
    handle.commands.arm(true)?;
    handle.commands.play(true)?;

    let stop = Arc::new(AtomicBool::new(false));
    let observer = spawn_observer(handle.display.clone(), Arc::clone(&stop))?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: config.output_sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.out, spec)
        .with_context(|| format!("Failed to create {:?}", args.out))?;

    let total_samples = (args.seconds * config.output_sample_rate as f32) as u64;
    let block_period = Duration::from_secs_f64(config.block_size as f64 / config.output_sample_rate as f64);
    let mut sink = DoubleBuffer::new(config.block_size, engine.silence_code());
    let started = Instant::now();
    let mut rendered = 0u64;
    let mut blocks = 0u64;

    while rendered < total_samples {
        performance.drive(rendered, &handle.controls, &mut handle.commands)?;

        // Render until both halves are full, then drain them like the DAC would
        while engine.render_into(&mut sink) {
            blocks += 1;
        }
        while let Some(block) = sink.consume() {
            for &code in block {
                writer.write_sample(format.decode(code))?;
            }
            rendered += block.len() as u64;
        }

        if args.realtime {
            let due = block_period.mul_f64(blocks as f64);
            if let Some(wait) = due.checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }
        }
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    stop.store(true, Ordering::Relaxed);
    let distinct = observer.join().unwrap_or(0);

    let last = handle.display.read();
    log::info!(
        "Rendered {} samples in {} blocks to {:?} in {:.1?} ({} crossfades, observer saw {} snapshots)",
        rendered,
        blocks,
        args.out,
        started.elapsed(),
        last.trigger_count,
        distinct
    );
    Ok(())
}
