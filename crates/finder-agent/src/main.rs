//! DeviceFinder agent entry point.
//!
//! Wires the infrastructure services together and runs until Ctrl-C.
//!
//! ```text
//! main()
//!  └─ load settings, init tracing
//!  └─ UdpDatagramSender::bind()          -- the only fatal failure
//!  └─ DiscoveryEngine (if-addrs oracle, mDNS advertiser)
//!  └─ ConfirmationListener ──► PairingCoordinator ──► stop discovery
//!  └─ notification pump until Ctrl-C
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use finder_agent::application::pairing::{PairingCoordinator, PairingNotification};
use finder_agent::infrastructure::interfaces::IfAddrsOracle;
use finder_agent::infrastructure::network::advertise::MdnsAdvertiser;
use finder_agent::infrastructure::network::discovery::DiscoveryEngine;
use finder_agent::infrastructure::network::listener::ConfirmationListener;
use finder_agent::infrastructure::network::outbound::UdpDatagramSender;
use finder_agent::infrastructure::storage::config::{self, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Settings are read before logging exists; a load error is reported below.
    let (settings, load_error) = match config::load_config() {
        Ok(settings) => (settings, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Level from `RUST_LOG`, falling back to the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.agent.log_level)),
        )
        .init();

    info!("DeviceFinder starting");
    match load_error {
        Some(e) => warn!("using default settings: {e}"),
        None => write_default_settings(&settings),
    }

    let discovery_config = settings
        .network
        .to_discovery_config()
        .context("invalid network settings")?;
    let bind_ip = settings.network.bind_ip()?;

    // ── Discovery engine ──────────────────────────────────────────────────────
    let sink = UdpDatagramSender::bind().context("could not allocate the outbound UDP socket")?;
    let engine = Arc::new(
        DiscoveryEngine::new(
            Arc::new(sink),
            Arc::new(IfAddrsOracle::new()),
            Arc::new(MdnsAdvertiser::new()),
        )
        .with_service_record(settings.advertisement.to_service_record()),
    );

    // ── Confirmation path ─────────────────────────────────────────────────────
    let (confirm_tx, confirm_rx) = mpsc::channel(32);
    let (notify_tx, mut notify_rx) = mpsc::channel(8);
    let coordinator = Arc::new(PairingCoordinator::new(engine.clone(), notify_tx));
    let listener = ConfirmationListener::new(confirm_tx)
        .with_idle_timeout(settings.listener.idle_timeout());

    let status = listener
        .start_listening(
            bind_ip,
            discovery_config.tcp_listen_port,
            discovery_config.udp_listen_port,
        )
        .await;
    if !status.any_listening() {
        warn!("no heartbeat listener is running; a peer cannot be confirmed");
    }

    let coordinator_task = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.run(confirm_rx).await })
    };

    engine.start(&discovery_config)?;
    info!("DeviceFinder ready.  Press Ctrl-C to exit.");

    // ── Notification pump ─────────────────────────────────────────────────────
    loop {
        tokio::select! {
            notification = notify_rx.recv() => match notification {
                Some(PairingNotification::DeviceFound { address }) => {
                    info!("device found at {address}");
                }
                Some(PairingNotification::ConnectionSuccess) => {
                    info!("connection success");
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("could not listen for Ctrl-C: {e}");
                }
                info!("shutdown signal received");
                break;
            }
        }
    }

    engine.stop();
    listener.shutdown();
    coordinator_task.abort();

    match coordinator.confirmed_peer() {
        Some(peer) => info!("DeviceFinder stopped; paired with {}", peer.address()),
        None => info!("DeviceFinder stopped; no device confirmed"),
    }
    Ok(())
}

/// Writes the settings file on first run so there is something to edit.
fn write_default_settings(settings: &AppConfig) {
    let Ok(path) = config::config_file_path() else {
        return;
    };
    if path.exists() {
        return;
    }
    match config::save_config(settings) {
        Ok(()) => info!("wrote default settings to {}", path.display()),
        Err(e) => warn!("could not write default settings: {e}"),
    }
}
