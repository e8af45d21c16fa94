use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use terrastream_common::WorldSeed;
use terrastream_kernel::{HeightfieldGround, Scene, WorldConfig};
use terrastream_stream::StreamingController;
use terrastream_tools::StreamInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "terrastream-cli", about = "CLI tool for terrastream worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WorldArgs {
    /// YAML world config; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// World seed as "x,z" (overrides the config)
    #[arg(short, long)]
    seed: Option<String>,
    /// Height amplitude of the generated ground; 0 gives a flat plane
    #[arg(long, default_value = "24.0")]
    relief: f32,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the default world config
    Info,
    /// Walk an observer in a straight line and report streaming work
    Walk {
        #[command(flatten)]
        world: WorldArgs,
        /// Number of ticks to simulate
        #[arg(short = 'n', long, default_value = "64")]
        steps: u32,
        /// Observer movement along x per tick
        #[arg(long, default_value = "4.0")]
        dx: f32,
        /// Observer movement along z per tick
        #[arg(long, default_value = "0.0")]
        dz: f32,
        /// Print an ASCII residency map at the end
        #[arg(short, long)]
        map: bool,
    },
    /// Generate the cell containing a world position and print its content
    Inspect {
        /// World x position
        #[arg(allow_hyphen_values = true)]
        x: f32,
        /// World z position
        #[arg(allow_hyphen_values = true)]
        z: f32,
        #[command(flatten)]
        world: WorldArgs,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

type Controller = StreamingController<Scene, HeightfieldGround>;

fn build_controller(args: &WorldArgs) -> anyhow::Result<Controller> {
    let mut config = match &args.config {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    if let Some(seed) = &args.seed {
        config = config.with_seed(seed.parse::<WorldSeed>()?);
    }
    let ground = HeightfieldGround::new(config.seed, 0.01, args.relief);
    Ok(StreamingController::new(config, Scene::new(), ground)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("terrastream-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("default config:");
            println!("{}", serde_json::to_string_pretty(&WorldConfig::default())?);
        }
        Commands::Walk {
            world,
            steps,
            dx,
            dz,
            map,
        } => {
            let mut controller = build_controller(&world)?;
            println!(
                "Walk: seed={}, steps={steps}, velocity=({dx}, {dz})",
                controller.config().seed
            );

            let mut position = Vec3::ZERO;
            let mut scene_events = 0usize;
            for step in 0..steps {
                let stats = controller.tick(position)?.clone();
                // Consume the scene's event log so it stays bounded by one tick of work.
                scene_events += controller.backend_mut().drain_events().len();
                if let (true, Some(anchor)) = (stats.recomputed, controller.anchor()) {
                    println!(
                        "tick {step:>4} anchor={anchor} created={} reactivated={} evicted={} resident={} in {:?}",
                        stats.cells_created,
                        stats.cells_reactivated,
                        stats.cells_evicted,
                        stats.total_resident,
                        stats.recompute_time
                    );
                }
                position += Vec3::new(dx, 0.0, dz);
            }

            tracing::debug!(scene_events, "walk finished");
            println!("{}", StreamInspector::summary(&controller));
            if map {
                let extent = controller.config().residency_radius + controller.config().hysteresis + 1;
                if let Some(ascii) = StreamInspector::residency_map(&controller, extent) {
                    print!("{ascii}");
                }
            }
        }
        Commands::Inspect { x, z, world, json } => {
            let mut controller = build_controller(&world)?;
            let position = Vec3::new(x, 0.0, z);
            controller.tick(position)?;

            let coord = controller
                .anchor()
                .ok_or_else(|| anyhow::anyhow!("no cell contains ({x}, {z})"))?;
            let report = StreamInspector::cell_report(&controller, coord)
                .ok_or_else(|| anyhow::anyhow!("cell {coord} was not generated"))?;
            tracing::debug!(%coord, objects = report.objects.len(), "inspected cell");

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
                match report.structure() {
                    Some(s) => println!("structure: {:?}", s.kind),
                    None => println!("structure: none"),
                }
            }
        }
    }

    Ok(())
}
