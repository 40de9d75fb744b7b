use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vrctl_common::{Color, EntityId};
use vrctl_controller::{ControllerActions, ControllerConfig};
use vrctl_input::{SimulatedDevices, TrackedIndex};
use vrctl_scene::{Material, Renderer, Scene};

#[derive(Parser)]
#[command(name = "vrctl-cli", about = "Drive a simulated VR controller")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Controller config file (.yaml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions and the effective config
    Info,
    /// Fire a haptic pulse, or a timed sequence when --duration is given
    Pulse {
        #[arg(short, long, default_value = "1000")]
        strength: u16,
        /// Total duration in seconds
        #[arg(short, long)]
        duration: Option<f32>,
        /// Seconds between pulses
        #[arg(short, long, default_value = "0.1")]
        interval: f32,
        /// Simulated frame rate
        #[arg(long, default_value = "90")]
        fps: u32,
    },
    /// Walk through visibility, opacity and highlight on a sample model
    Demo {
        /// Highlight colour name
        #[arg(long, default_value = "yellow")]
        color: String,
    },
}

/// Sample controller model: root, Model group and the usual sub-meshes.
fn sample_model(scene: &mut Scene) -> anyhow::Result<(EntityId, EntityId)> {
    let root = scene.spawn("Controller (left)", None)?;
    let model = scene.spawn("Model", Some(root))?;
    let shared = scene.add_material(Material::opaque(Color::rgba(0.25, 0.25, 0.25, 1.0)));
    for part in ["body", "trigger", "lgrip", "rgrip", "trackpad", "button"] {
        let id = scene.spawn(part, Some(model))?;
        scene.set_renderer(id, Renderer::mesh(shared))?;
    }
    let held = scene.spawn("held_object", Some(root))?;
    let mat = scene.add_material(Material::opaque(Color::BLUE));
    scene.set_renderer(held, Renderer::mesh(mat))?;
    Ok((root, held))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("vrctl-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("scene: {}", vrctl_scene::crate_info());
            println!("input: {}", vrctl_input::crate_info());
            println!("controller: {}", vrctl_controller::crate_info());
            println!("config:");
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Commands::Pulse {
            strength,
            duration,
            interval,
            fps,
        } => {
            let mut scene = Scene::new();
            let (root, _) = sample_model(&mut scene)?;
            let mut devices = SimulatedDevices::new();
            let index = TrackedIndex(1);
            devices.connect(index);
            let mut controller = ControllerActions::attach(&mut scene, root, index, config)?;

            match duration {
                None => controller.pulse(&mut devices, strength)?,
                Some(duration) => {
                    let handle =
                        controller.pulse_for(&mut devices, strength, duration, interval, Duration::ZERO)?;
                    if handle.is_none() {
                        println!("nothing to do: duration and interval must be positive");
                    }
                    let frame = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
                    let mut now = Duration::ZERO;
                    while controller.active_pulses() > 0 {
                        now += frame;
                        devices.advance_to(now);
                        controller.tick(&mut devices, now)?;
                    }
                    println!("sequence finished at {:.3}s", now.as_secs_f64());
                }
            }

            for (i, p) in devices.pulses().iter().enumerate() {
                println!(
                    "pulse {:>3}: t={:.3}s strength={} device={:?}",
                    i + 1,
                    p.at.as_secs_f64(),
                    p.strength,
                    p.device
                );
            }
        }
        Commands::Demo { color } => {
            let color = Color::from_name(&color)
                .ok_or_else(|| anyhow::anyhow!("unknown colour {color:?}"))?;
            let mut scene = Scene::new();
            let (root, held) = sample_model(&mut scene)?;
            let mut controller =
                ControllerActions::attach(&mut scene, root, TrackedIndex(1), config)?;

            println!("== attached");
            print!("{}", vrctl_scene::outline(&scene, root));

            controller.set_model_visible(&mut scene, false, Some(held))?;
            println!("== grabbed: model hidden, held object visible");
            print!("{}", vrctl_scene::outline(&scene, root));
            controller.set_model_visible(&mut scene, true, None)?;

            controller.set_opacity(&mut scene, 0.5)?;
            println!("== faded to 50%");
            print!("{}", vrctl_scene::outline(&scene, root));
            controller.set_opacity(&mut scene, 1.0)?;

            controller.set_highlight_trigger(&mut scene, true, color)?;
            controller.set_highlight_grip(&mut scene, true, color)?;
            println!("== trigger and grip highlighted");
            print!("{}", vrctl_scene::outline(&scene, root));

            controller.set_highlight_trigger(&mut scene, false, color)?;
            controller.set_highlight_grip(&mut scene, false, color)?;
            println!("== highlights cleared");
            print!("{}", vrctl_scene::outline(&scene, root));

            tracing::info!(events = scene.events().len(), "demo complete");
        }
    }

    Ok(())
}
