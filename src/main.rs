//! vMix APC GW - Rust implementation
//!
//! Gateway between a vMix production mixer and an Akai APC mini controller.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vmix_apc_gw::activator::{self, surface_restore};
use vmix_apc_gw::apc::led::LedCommand;
use vmix_apc_gw::apc::{discovery, ApcDriver, LED_QUEUE_CAPACITY};
use vmix_apc_gw::config::{AppConfig, Bindings, ConfigWatcher};
use vmix_apc_gw::dispatch::Dispatcher;
use vmix_apc_gw::mixer::client::LINE_QUEUE_CAPACITY;
use vmix_apc_gw::mixer::{CommandSink, MixerClient, MixerSupervisor};
use vmix_apc_gw::pager::{Pager, PAGER_QUEUE_CAPACITY};
use vmix_apc_gw::state::{fetch_snapshot, MirroredState, StateActorHandle};
use vmix_apc_gw::virtual_surface;
use vmix_apc_gw::watchdog::Watchdog;

/// vMix APC GW - drive vMix from an Akai APC mini
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting vMix APC GW...");
    info!("Configuration file: {}", args.config);

    if args.list_ports {
        let config = if Path::new(&args.config).exists() {
            AppConfig::load(&args.config).await?
        } else {
            AppConfig::default()
        };
        discovery::print_ports(&config.surface);
        return Ok(());
    }

    let (config_watcher, config) = ConfigWatcher::new(args.config.clone()).await?;
    info!("Configuration loaded with hot-reload enabled");

    run_app(config, config_watcher, shutdown_signal()).await?;

    info!("vMix APC GW shutdown complete");
    Ok(())
}

async fn run_app(
    mut config: Arc<AppConfig>,
    mut config_watcher: ConfigWatcher,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let policy = config.mixer.retry_policy();
    let address = config.mixer.address.clone();

    let client = Arc::new(
        MixerClient::connect(address.clone(), policy)
            .await
            .context("Failed to connect to the mixer")?,
    );

    let snapshot = fetch_snapshot(&address, policy)
        .await
        .context("Failed to read the mixer state")?;
    let state = StateActorHandle::spawn(snapshot.clone());

    let bindings = Arc::new(Bindings::resolve(&config, &snapshot)?);
    info!("Bindings: {}", bindings.summary());
    let (bindings_tx, bindings_rx) = watch::channel(bindings.clone());

    let (led_tx, led_rx) = mpsc::channel::<LedCommand>(LED_QUEUE_CAPACITY);
    let (line_tx, line_rx) = mpsc::channel(LINE_QUEUE_CAPACITY);
    let (pager_tx, pager_rx) = mpsc::channel(PAGER_QUEUE_CAPACITY);
    let (reconnected_tx, mut reconnected_rx) = mpsc::channel(1);
    let (resynced_tx, mut resynced_rx) = mpsc::channel(1);

    // Surface
    let apc = Arc::new(ApcDriver::new(&config.surface));
    if let Err(e) = apc.connect() {
        warn!("⚠️ APC mini not available yet: {:#}", e);
    }
    apc.spawn_led_writer(led_rx);
    let surface_events = apc
        .take_event_receiver()
        .context("Surface event receiver already taken")?;

    // Mixer events
    tokio::spawn(activator::run_consumer(
        line_rx,
        bindings_rx.clone(),
        state.clone(),
        led_tx.clone(),
    ));
    client.subscribe().await?;
    let receiver = client.spawn_receiver(line_tx.clone())?;
    MixerSupervisor::new(client.clone(), line_tx, state.clone(), resynced_tx).spawn(receiver);

    // Outgoing path
    let sink: Arc<dyn CommandSink> = client.clone();
    tokio::spawn(Pager::new(sink.clone(), bindings.timing.pager_settle).run(pager_rx));
    let dispatcher = Dispatcher::new(
        sink,
        bindings_rx,
        state.clone(),
        led_tx.clone(),
        pager_tx,
    );
    tokio::spawn(dispatcher.run(surface_events));

    Watchdog::new(
        apc.clone(),
        Duration::from_millis(config.surface.probe_interval_ms),
        Duration::from_millis(config.surface.reconnect_interval_ms),
        reconnected_tx,
    )
    .spawn();

    if config.virtual_surface.enabled {
        virtual_surface::spawn(&config.virtual_surface.bind, apc.event_sender()).await?;
    }

    restore_leds(&led_tx, &bindings, &snapshot).await;
    info!("✅ Gateway running");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            // Mixer link re-established with a fresh snapshot
            Some(()) = resynced_rx.recv() => {
                let snapshot = state.snapshot().await;
                match Bindings::resolve(&config, &snapshot) {
                    Ok(bindings) => {
                        bindings_tx.send_replace(Arc::new(bindings));
                    }
                    Err(e) => warn!("Failed to resolve bindings (keeping old ones): {:#}", e),
                }
                let bindings = bindings_tx.borrow().clone();
                restore_leds(&led_tx, &bindings, &snapshot).await;
            }

            // Surface came back
            Some(()) = reconnected_rx.recv() => {
                info!("🎹 Restoring surface LEDs");
                let snapshot = state.snapshot().await;
                let bindings = bindings_tx.borrow().clone();
                restore_leds(&led_tx, &bindings, &snapshot).await;
            }

            // Config reload
            Some(new_config) = config_watcher.next_config() => {
                info!("📝 Configuration file changed, reloading...");
                let snapshot = state.snapshot().await;
                match Bindings::resolve(&new_config, &snapshot) {
                    Ok(bindings) => {
                        info!("✅ Bindings reloaded: {}", bindings.summary());
                        let bindings = Arc::new(bindings);
                        bindings_tx.send_replace(bindings.clone());
                        config = new_config;
                        restore_leds(&led_tx, &bindings, &snapshot).await;
                    }
                    Err(e) => warn!("⚠️ Failed to apply config (keeping old config): {:#}", e),
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    apc.disconnect();
    Ok(())
}

async fn restore_leds(leds: &mpsc::Sender<LedCommand>, bindings: &Bindings, state: &MirroredState) {
    let commands = surface_restore(bindings, state);
    debug!("Replaying {} LED commands", commands.len());
    for command in commands {
        if leds.send(command).await.is_err() {
            warn!("LED queue closed");
            return;
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
