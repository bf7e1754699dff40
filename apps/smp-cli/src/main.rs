use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use serde::Serialize;
use smp_common::{AnchorId, Transform};
use smp_kernel::{
    Bone, Constraint, FrameEvent, ManualClock, PhysicsWorld, PoseBinding, Shape, ShutdownEvent,
    System, WorldConfig,
};
use smp_solver::{ConstraintDesc, ReferenceSolver, Solver};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smp-cli", about = "Headless host for the skinned-mesh physics world")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective world configuration
    Info {
        /// YAML world configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Hang cloth strands from a moving skeleton and step them frame by frame
    Simulate {
        /// Number of host frames to run
        #[arg(short, long, default_value = "120")]
        frames: u32,
        /// Host frame rate; independent of the physics tick rate
        #[arg(long, default_value = "75")]
        fps: f64,
        /// Number of strands on the skeleton
        #[arg(short, long, default_value = "3")]
        strands: usize,
        /// Links per strand
        #[arg(short, long, default_value = "6")]
        links: usize,
        /// YAML world configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which competing shape variants stay active on one skeleton
    Activation,
}

#[derive(Debug, Default, Serialize)]
struct SimulationSummary {
    frames: u32,
    ticks: u32,
    simulated: u32,
    dropped: u32,
    final_alpha: f32,
    systems: usize,
    lowest_tip_z: f32,
    max_stretch: f32,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<WorldConfig> {
    match path {
        Some(path) => WorldConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(WorldConfig::default()),
    }
}

/// A kinematic root followed by `links` dynamic bones hanging along -Z.
fn strand(anchor: AnchorId, offset: Vec3, links: usize) -> (System, PoseBinding, Vec<Bone>) {
    let mut bones = vec![Bone::kinematic("root", Transform::from_position(offset))];
    for i in 1..=links {
        bones.push(Bone::dynamic(
            format!("link{i}"),
            0.2,
            Transform::from_position(offset - Vec3::Z * i as f32),
        ));
    }
    let binding = PoseBinding::for_bones(&bones);
    let mut system = System::skeletal(anchor, binding.clone()).with_shape(Shape::new("strand"));
    for pair in bones.windows(2) {
        system = system.with_constraint(Constraint::new(ConstraintDesc {
            body_a: pair[0].body,
            body_b: pair[1].body,
            rest_length: 1.0,
            stiffness: 0.9,
        }));
    }
    for bone in &bones {
        system = system.with_bone(bone.clone());
    }
    (system, binding, bones)
}

fn simulate(
    config: WorldConfig,
    frames: u32,
    fps: f64,
    strands: usize,
    links: usize,
) -> anyhow::Result<SimulationSummary> {
    anyhow::ensure!(fps > 0.0, "fps must be positive");
    let clock = ManualClock::new();
    let world = PhysicsWorld::with_clock(config, ReferenceSolver::new(), clock.clone())?;
    let anchor = AnchorId::new();

    let mut hosts = Vec::with_capacity(strands);
    for s in 0..strands {
        let (system, binding, bones) = strand(anchor, Vec3::X * s as f32 * 2.0, links);
        world
            .add_system(system)
            .context("strand system was rejected")?;
        hosts.push((binding, bones));
    }

    let frame = Duration::from_secs_f64(1.0 / fps);
    let mut summary = SimulationSummary {
        frames,
        systems: world.system_count(),
        ..SimulationSummary::default()
    };
    world.on_frame_event(&FrameEvent::end());
    for f in 0..frames {
        // sway the skeleton so the strands have something to follow
        let sway = Vec3::Y * (f as f32 * 0.05).sin() * 0.5;
        for (binding, bones) in &hosts {
            binding.set_pose(0, Transform::from_position(bones[0].rest.position + sway));
        }
        clock.advance(frame);
        if let Some(report) = world.on_frame_event(&FrameEvent::end()) {
            summary.ticks += report.ticks;
            summary.simulated += report.simulated;
            summary.dropped += report.dropped();
            summary.final_alpha = report.alpha;
        }
    }

    summary.lowest_tip_z = f32::INFINITY;
    for (binding, _) in &hosts {
        let poses = binding.outputs();
        if let Some(tip) = poses.last() {
            summary.lowest_tip_z = summary.lowest_tip_z.min(tip.position.z);
        }
        for pair in poses.windows(2) {
            let stretch = pair[0].position.distance(pair[1].position) - 1.0;
            summary.max_stretch = summary.max_stretch.max(stretch);
        }
    }
    let bodies = world.with_solver(|s| s.rigid_bodies().count());
    tracing::info!(bodies, "simulation finished");

    world.on_shutdown(&ShutdownEvent);
    Ok(summary)
}

fn activation_demo() -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let world = PhysicsWorld::with_clock(WorldConfig::default(), ReferenceSolver::new(), clock.clone())?;
    let anchor = AnchorId::new();

    let body = System::skeletal(anchor, smp_kernel::NullBinding)
        .with_shape(Shape::new("body").with_tag("body").with_tag("no_cape"));
    let capes = System::skeletal(anchor, smp_kernel::NullBinding)
        .with_shape(Shape::new("cape_low").with_disable_tag("cape", 1))
        .with_shape(Shape::new("cape_high").with_disable_tag("cape", 5));
    let skirts = System::skeletal(anchor, smp_kernel::NullBinding)
        .with_shape(Shape::new("skirt_a").with_disable_tag("skirt", 3))
        .with_shape(Shape::new("skirt_b").with_disable_tag("skirt", 3));
    let vetoed = System::skeletal(anchor, smp_kernel::NullBinding)
        .with_shape(Shape::new("cape_extra").with_disable_tag("no_cape", 9));
    for system in [body, capes, skirts, vetoed] {
        world.add_system(system).context("system was rejected")?;
    }

    world.on_frame_event(&FrameEvent::end());
    clock.advance(Duration::from_millis(20));
    let report = world
        .on_frame_event(&FrameEvent::end())
        .context("world did not step")?;

    world.with_systems(|systems| {
        for system in systems {
            for shape in &system.meshes {
                let tag = shape
                    .disable_tag
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |t| format!("{t}@{}", shape.disable_priority));
                let state = if shape.is_disabled() { "disabled" } else { "active" };
                println!(
                    "{:<10} {:<12} {:<12} {state}",
                    system.id().map(|id| id.to_string()).unwrap_or_default(),
                    shape.name,
                    tag
                );
            }
        }
    });
    println!(
        "buckets={} vetoed={} disabled={}",
        report.activation.buckets, report.activation.vetoed_buckets, report.activation.disabled
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info { config } => {
            let config = load_config(config.as_ref())?;
            println!("smp-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "tick: {:.5}s ({:.1} Hz), max sub-steps: {}",
                config.fixed_time_step,
                1.0 / config.fixed_time_step,
                config.max_sub_steps
            );
            println!(
                "gravity: {}, wind: {}, friction: {}",
                config.scaled_gravity(),
                config.scaled_wind(),
                config.friction
            );
        }
        Commands::Simulate {
            frames,
            fps,
            strands,
            links,
            config,
            json,
        } => {
            let config = load_config(config.as_ref())?;
            let summary = simulate(config, frames, fps, strands, links)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "frames={} ticks={} simulated={} dropped={} alpha={:.3}",
                    summary.frames,
                    summary.ticks,
                    summary.simulated,
                    summary.dropped,
                    summary.final_alpha
                );
                println!(
                    "systems={} lowest tip z={:.3} max stretch={:.4}",
                    summary.systems, summary.lowest_tip_z, summary.max_stretch
                );
            }
        }
        Commands::Activation => activation_demo()?,
    }

    Ok(())
}
