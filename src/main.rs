//! Electra Core - MIDI control surface runtime
//!
//! Connects the configured system MIDI ports to the surface and runs the
//! processing loop.

use anyhow::{Context, Result};
use clap::Parser;
use electra_core::config::AppConfig;
use electra_core::midi_control::MidiControl;
use electra_core::paths::AppPaths;
use electra_core::ports::{self, InboundEvent, PortSet};
use electra_core::router::MidiRouter;
use electra_core::storage::PresetLibrary;
use electra_core::surface::{Surface, SystemCall};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Electra Core - MIDI control surface protocol and state core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ELECTRA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Directory holding presets and snapshots
    #[arg(long, env = "ELECTRA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.list_ports {
        return ports::list_ports();
    }

    let mut paths = AppPaths::detect();
    if let Some(config) = &args.config {
        paths.config = config.clone();
    }
    paths.ensure_directories()?;

    let _log_guard = init_logging(&args.log_level, args.json_logs, Some(&paths.logs_dir))?;
    info!("Starting Electra Core v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", paths.config.display());

    let mut config = AppConfig::load_or_default(&paths.config).await?;
    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| config.storage.data_dir.clone())
        .unwrap_or_else(|| paths.data_dir.clone());
    let paths = paths.with_data_dir(data_dir);
    paths.ensure_directories()?;
    info!("Data directory: {}", paths.data_dir.display());

    apply_pending_config(&mut config, &paths).await;

    let router = MidiRouter::new(config.router.clone());
    let midi_control = MidiControl::new(config.midi_control.clone());
    let mut surface = Surface::new(&paths.data_dir, router, midi_control);
    surface.set_config_document(config.to_json()?);

    let result = run_app(&mut surface, &config, shutdown_signal()).await;
    info!("Electra Core shutdown complete");
    result
}

/// Merge a configuration uploaded by the editor and persist the result
async fn apply_pending_config(config: &mut AppConfig, paths: &AppPaths) {
    let library = PresetLibrary::new(&paths.data_dir);
    let document = match library.take_pending_config() {
        Ok(Some(document)) => document,
        Ok(None) => return,
        Err(e) => {
            warn!("Pending configuration unreadable: {}", e);
            return;
        }
    };

    match config.merge_json(&document) {
        Ok(merged) => {
            *config = merged;
            info!("Uploaded configuration applied");
            if let Err(e) = config.save(&paths.config).await {
                warn!("Failed to save configuration: {:#}", e);
            }
        }
        Err(e) => warn!("Uploaded configuration rejected: {:#}", e),
    }
}

async fn run_app(
    surface: &mut Surface,
    config: &AppConfig,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel::<InboundEvent>(1024);
    let mut ports = PortSet::open(&config.ports, event_tx);

    if let Err(e) = surface.switch_preset_slot(0, 0) {
        warn!("Initial preset not loaded: {}", e);
    }
    drain(surface, &ports);

    let mut tick = tokio::time::interval(Duration::from_millis(config.tick_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("Ready to process MIDI events!");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    InboundEvent::Midi { source, bytes } => surface.handle_midi(source, &bytes),
                    InboundEvent::Sysex { source, chunk } => surface.handle_sysex(source, chunk),
                }
                drain(surface, &ports);
            }

            _ = tick.tick() => {
                let flushed = surface.tick();
                if flushed > 0 {
                    debug!("Flushed {} values", flushed);
                }
                drain(surface, &ports);
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }

        if let Some(call) = surface.take_system_call() {
            match call {
                SystemCall::Reboot => info!("Reboot requested by the editor"),
                SystemCall::UpdateMode => info!("Update mode requested by the editor"),
            }
            break;
        }
    }

    info!("Shutting down...");
    surface.flush();
    drain(surface, &ports);
    ports.close();
    Ok(())
}

/// Deliver queued output to the ports
fn drain(surface: &mut Surface, ports: &PortSet) {
    for outgoing in surface.take_outgoing() {
        ports.deliver(&outgoing);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_logging(level: &str, json: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{}'", level))?;

    let console = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
    });
    let console_json = json.then(|| tracing_subscriber::fmt::layer().json());

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "electra-core.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(console_json)
        .with(file)
        .init();

    Ok(guard)
}
