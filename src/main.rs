//! Camera Core CLI
//!
//! Command-line interface for listing cameras, grabbing frames and moving
//! parameter files in and out of a device.

use camera_core::{
    binding::SimulatedBinding,
    camera::{Camera, CameraError, TriggerMode},
    config::{Settings, SettingsError},
    metrics::{CaptureMetrics, MetricsError},
    params, CameraIdentity, CameraRegistry, DriverKind,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "camera-core", version, about = "Camera capture and configuration tool")]
struct Cli {
    /// TOML settings file.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Driver kind: `real` (SDK binding) or `mock`.
    #[arg(long, global = true, default_value = "mock")]
    kind: DriverKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List available camera identities.
    List,
    /// Show trigger mode, ranges and parameters of a camera.
    Info {
        /// Camera identity; defaults to the first one listed.
        camera: Option<String>,
    },
    /// Capture frames.
    Capture {
        camera: Option<String>,
        /// Number of frames; 0 captures until Ctrl-C.
        #[arg(long, default_value_t = 1)]
        count: u64,
        /// Trigger mode to set before capturing.
        #[arg(long)]
        trigger: Option<TriggerMode>,
        /// Print capture counters afterwards.
        #[arg(long)]
        metrics: bool,
    },
    /// Write the camera's parameters to a file.
    Export { path: PathBuf, camera: Option<String> },
    /// Apply a parameter file to the camera.
    Import { path: PathBuf, camera: Option<String> },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("no {0} cameras available")]
    NoCameras(DriverKind),
    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = match &cli.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    info!("Camera Core v{}", camera_core::VERSION);

    let binding = Arc::new(SimulatedBinding::new(settings.simulated.devices.clone()));
    let metrics = Arc::new(CaptureMetrics::new()?);
    let registry = CameraRegistry::with_settings(binding, settings.registry.clone(), settings.mock.clone())
        .with_metrics(Arc::clone(&metrics));

    let pick = |camera: Option<String>| -> Result<CameraIdentity, CliError> {
        match camera {
            Some(id) => Ok(CameraIdentity::new(id)),
            None => registry
                .list_available(cli.kind)?
                .into_iter()
                .next()
                .ok_or(CliError::NoCameras(cli.kind)),
        }
    };

    match cli.command {
        Command::List => {
            for id in registry.list_available(cli.kind)? {
                println!("{id}");
            }
        }
        Command::Info { ref camera } => {
            let mut cam = registry.open(cli.kind, pick(camera.clone())?, &settings.camera)?;
            println!("camera:       {}", cam.identity());
            println!("trigger mode: {}", cam.trigger_mode()?);
            println!("enhancement:  {}", cam.image_quality_enhancement());
            for name in [params::EXPOSURE_TIME, params::WIDTH, params::HEIGHT] {
                println!("{name} range: {}", cam.get_parameter_range(name)?);
            }
            for (name, value) in cam.parameters()?.iter() {
                println!("  {name} = {value}");
            }
            cam.close()?;
        }
        Command::Capture {
            ref camera,
            count,
            trigger,
            metrics: show_metrics,
        } => {
            let mut cam = registry.open(cli.kind, pick(camera.clone())?, &settings.camera)?;
            if let Some(mode) = trigger {
                cam.set_trigger_mode(mode)?;
            }

            let running = Arc::new(AtomicBool::new(true));
            let flag = Arc::clone(&running);
            ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

            let mut captured = 0u64;
            let mut missed = 0u64;
            while running.load(Ordering::SeqCst) && (count == 0 || captured + missed < count) {
                match cam.capture()?.into_image() {
                    Some(image) => {
                        captured += 1;
                        println!(
                            "Frame {}: {}x{} ({} bytes)",
                            image.sequence(),
                            image.width(),
                            image.height(),
                            image.data().len()
                        );
                    }
                    None => {
                        missed += 1;
                        warn!("Capture failed after {} attempts", cam.retry_policy().attempts());
                    }
                }
            }

            info!("Captured {} frames, {} missed", captured, missed);
            if show_metrics {
                print!("{}", metrics.encode()?);
            }
            cam.close()?;
        }
        Command::Export { ref path, ref camera } => {
            let mut cam = registry.open(cli.kind, pick(camera.clone())?, &settings.camera)?;
            cam.export_config(path)?;
            println!("Exported {} to {}", cam.identity(), path.display());
            cam.close()?;
        }
        Command::Import { ref path, ref camera } => {
            let mut cam = registry.open(cli.kind, pick(camera.clone())?, &settings.camera)?;
            cam.import_config(path)?;
            println!("Imported {} into {}", path.display(), cam.identity());
            cam.close()?;
        }
    }

    Ok(())
}
