//! Fixed-step simulation of one or more effects

use anyhow::{Context, Result, bail};
use clap::Args;
use fx_particles::{
    EffectManager, EffectSettings, EventCallback, FrameStats, Particle, SpawnPlacement,
};
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::path::PathBuf;

use super::load_settings;
use crate::utils::{
    create_progress_bar, format_percentage, format_ratio, format_seconds, numeric_table,
};

/// Statistics output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Effect settings file (.yaml, .yml or .json); defaults are used when omitted
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Number of effects to run side by side
    #[arg(short = 'n', long, default_value = "1")]
    pub effects: usize,

    /// Simulated seconds
    #[arg(short, long, default_value = "5.0")]
    pub duration: f32,

    /// Host frames per second
    #[arg(long, default_value = "60")]
    pub fps: u32,

    /// Seconds between statistics rows
    #[arg(long, default_value = "1.0")]
    pub every: f32,

    /// Override the emitter rate from the settings file
    #[arg(short, long)]
    pub rate: Option<f32>,

    /// Particles emitted at once on the first frame
    #[arg(short, long, default_value = "0")]
    pub burst: u32,

    /// Shortest particle lifetime in seconds
    #[arg(long, default_value = "0.5")]
    pub min_life: f32,

    /// Longest particle lifetime in seconds
    #[arg(long, default_value = "1.5")]
    pub max_life: f32,

    /// Vertical acceleration applied to every particle
    #[arg(long, default_value = "-9.8", allow_hyphen_values = true)]
    pub gravity: f32,

    /// Linear drag coefficient
    #[arg(long, default_value = "0.1")]
    pub drag: f32,

    /// Hide particles once they reach this fraction of their life
    #[arg(long)]
    pub hide_at: Option<f32>,

    /// Seed for particle lifetimes and velocities
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Statistics output encoding
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Statistics gathered over one reporting interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Simulated time at the end of the interval
    pub time: f32,
    /// Effects still alive
    pub effects: usize,
    pub active: usize,
    pub drawn: usize,
    pub capacity: usize,
    /// Spawned during the interval
    pub spawned: usize,
    /// Reclaimed during the interval
    pub reclaimed: usize,
    /// Effects torn down during the interval
    pub destroyed: usize,
}

#[derive(Debug, Serialize)]
struct Report {
    frames: u64,
    frame_seconds: f32,
    samples: Vec<Sample>,
    total_spawned: usize,
    total_reclaimed: usize,
}

pub fn execute(args: &SimulateArgs, quiet: bool) -> Result<()> {
    validate_args(args)?;

    let mut settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => EffectSettings::default(),
    };
    if let Some(rate) = args.rate {
        settings.emitter.particles_per_second = rate;
    }

    let mut manager = EffectManager::new();
    for index in 0..args.effects {
        spawn_effect(&mut manager, &settings, args, index)?;
    }
    log::info!(
        "Simulating {} effect(s) for {}s at {} fps",
        manager.len(),
        args.duration,
        args.fps
    );

    let frame_seconds = 1.0 / args.fps as f32;
    let frames = (args.duration * args.fps as f32).ceil() as u64;
    let samples = run_frames(&mut manager, frames, frame_seconds, args, quiet)?;

    let report = Report {
        frames,
        frame_seconds,
        total_spawned: samples.iter().map(|s| s.spawned).sum(),
        total_reclaimed: samples.iter().map(|s| s.reclaimed).sum(),
        samples,
    };

    match args.output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        ),
        OutputFormat::Table => print_table(&report, quiet),
    }
    Ok(())
}

fn validate_args(args: &SimulateArgs) -> Result<()> {
    if args.fps == 0 {
        bail!("--fps must be greater than zero");
    }
    if !args.duration.is_finite() || args.duration < 0.0 {
        bail!("--duration must be a non-negative number of seconds");
    }
    if !args.every.is_finite() || args.every <= 0.0 {
        bail!("--every must be a positive number of seconds");
    }
    if !(args.min_life.is_finite() && args.max_life.is_finite())
        || args.min_life < 0.0
        || args.max_life < args.min_life
    {
        bail!(
            "Particle lifetimes must satisfy 0 <= --min-life <= --max-life, got {} and {}",
            args.min_life,
            args.max_life
        );
    }
    if let Some(fraction) = args.hide_at
        && !(0.0..=1.0).contains(&fraction)
    {
        bail!("--hide-at must be between 0 and 1, got {fraction}");
    }
    Ok(())
}

fn spawn_effect(
    manager: &mut EffectManager,
    settings: &EffectSettings,
    args: &SimulateArgs,
    index: usize,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(index as u64));
    let (min_life, max_life) = (args.min_life, args.max_life);
    let force = Vec3::new(0.0, args.gravity, 0.0);
    let drag = args.drag;
    let hide_at = args.hide_at;
    let burst = args.burst;

    manager
        .create::<(), _>(settings.clone(), move |effect| {
            effect
                .emitter_mut()
                .teleport(Vec3::new(index as f32 * 2.0, 0.0, 0.0), Quat::IDENTITY);
            effect.emitter_mut().burst_particles(burst);

            effect.set_initializer(Some(Box::new(move |particle: &mut Particle| {
                particle
                    .age
                    .set_lifetime(rng.random_range(min_life..=max_life));
                particle.velocity = Vec3::new(
                    rng.random_range(-1.0..=1.0),
                    rng.random_range(2.0..=4.0),
                    rng.random_range(-1.0..=1.0),
                );
            })));

            let events = effect.particle_events_mut();
            events.add_every_frame(
                EventCallback::new(move |particle: &mut Particle, seconds, _| {
                    particle.integrate(seconds, force, drag);
                    Ok(())
                }),
                0,
                0,
            );
            if let Some(fraction) = hide_at {
                events.add_normalized_timed(
                    fraction,
                    EventCallback::new(|particle: &mut Particle, _, _| {
                        particle.visible = false;
                        Ok(())
                    }),
                    1,
                    0,
                );
            }
            Ok(())
        })
        .with_context(|| format!("Failed to create effect {index}"))?;
    Ok(())
}

fn run_frames(
    manager: &mut EffectManager,
    frames: u64,
    frame_seconds: f32,
    args: &SimulateArgs,
    quiet: bool,
) -> Result<Vec<Sample>> {
    let frames_per_sample = ((args.every * args.fps as f32).round() as u64).max(1);
    let progress = (!quiet && !args.no_progress && args.output == OutputFormat::Table)
        .then(|| create_progress_bar(frames, "Simulating"));

    let mut samples = Vec::new();
    let mut interval = FrameStats::default();
    let mut pending = 0;

    for frame in 1..=frames {
        let stats = manager
            .update(frame_seconds)
            .with_context(|| format!("Effect update failed on frame {frame}"))?;
        interval.spawned += stats.spawned;
        interval.reclaimed += stats.reclaimed;
        interval.destroyed += stats.destroyed;
        pending += 1;

        if let Some(pb) = &progress {
            pb.inc(1);
        }

        if pending == frames_per_sample || frame == frames || manager.is_empty() {
            samples.push(Sample {
                time: frame as f32 * frame_seconds,
                effects: manager.len(),
                active: stats.active,
                drawn: stats.drawn,
                capacity: stats.capacity,
                spawned: interval.spawned,
                reclaimed: interval.reclaimed,
                destroyed: interval.destroyed,
            });
            interval = FrameStats::default();
            pending = 0;
        }

        if manager.is_empty() {
            log::info!("Every effect was destroyed after frame {frame}");
            break;
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    Ok(samples)
}

fn print_table(report: &Report, quiet: bool) {
    let rows = report.samples.iter().map(|sample| {
        vec![
            format_seconds(sample.time),
            sample.effects.to_string(),
            sample.active.to_string(),
            sample.drawn.to_string(),
            sample.capacity.to_string(),
            format_ratio(sample.active, sample.capacity),
            sample.spawned.to_string(),
            sample.reclaimed.to_string(),
        ]
    });
    let table = numeric_table(
        &[
            "Time", "Effects", "Active", "Drawn", "Capacity", "Usage", "Spawned", "Reclaimed",
        ],
        rows,
    );
    table.printstd();

    if !quiet {
        let spawned = report.total_spawned.max(1) as f64;
        println!(
            "\n{} frames of {}: {} spawned, {} reclaimed ({} recycled)",
            report.frames,
            format_seconds(report.frame_seconds),
            report.total_spawned,
            report.total_reclaimed,
            format_percentage(report.total_reclaimed as f64 / spawned * 100.0)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SimulateArgs,
    }

    fn args(extra: &[&str]) -> SimulateArgs {
        let mut argv = vec!["simulate"];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().args
    }

    fn fixed_settings() -> EffectSettings {
        let mut settings = EffectSettings::default();
        settings.memory.mode = fx_particles::MemoryMode::Disabled;
        settings
    }

    #[test]
    fn test_rejects_bad_lifetime_range() {
        let args = args(&["--min-life", "2", "--max-life", "1"]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_rejects_zero_fps() {
        assert!(validate_args(&args(&["--fps", "0"])).is_err());
    }

    #[test]
    fn test_negative_gravity_parses() {
        assert_eq!(args(&["--gravity", "-3"]).gravity, -3.0);
    }

    #[test]
    fn test_samples_cover_every_interval() {
        let args = args(&["--rate", "16", "--fps", "16", "--every", "0.5", "--duration", "2"]);
        let mut settings = fixed_settings();
        settings.emitter.particles_per_second = 16.0;

        let mut manager = EffectManager::new();
        spawn_effect(&mut manager, &settings, &args, 0).unwrap();
        let samples = run_frames(&mut manager, 32, 1.0 / 16.0, &args, true).unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples.iter().map(|s| s.spawned).sum::<usize>(), 32);
        assert_eq!(samples[3].time, 2.0);
        assert!(samples.iter().all(|s| s.active <= s.capacity));
    }

    #[test]
    fn test_same_seed_same_statistics() {
        let args = args(&["--rate", "30", "--seed", "7"]);
        let mut settings = fixed_settings();
        settings.emitter.particles_per_second = 30.0;

        let run = || {
            let mut manager = EffectManager::new();
            spawn_effect(&mut manager, &settings, &args, 0).unwrap();
            run_frames(&mut manager, 120, 1.0 / 60.0, &args, true).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_hidden_particles_are_not_drawn() {
        let args = args(&["--hide-at", "0", "--burst", "5", "--min-life", "1", "--max-life", "1"]);
        let mut manager = EffectManager::new();
        spawn_effect(&mut manager, &fixed_settings(), &args, 0).unwrap();
        let samples = run_frames(&mut manager, 6, 0.1, &args, true).unwrap();

        let last = samples.last().unwrap();
        assert_eq!(last.active, 5);
        assert_eq!(last.drawn, 0);
    }
}
