//! Keytap Node - BLE HID keyboard peripheral with an HTTP key trigger
//!
//! This binary runs the full keytap daemon:
//! - BLE peripheral advertising a HID keyboard service
//! - HTTP server whose /enter endpoint sends a scripted
//!   "press A, release A" report pair to the subscribed central

mod server;

use chrono::{DateTime, Utc};
use clap::Parser;
use parking_lot::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use keytap_ble::{
    spawn_system_advertiser, AdvertiserConfig, AdvertiserEvent, AdvertiserHandle, NotifierSlot,
};

#[derive(Parser)]
#[command(name = "keytap-node")]
#[command(about = "BLE HID keyboard peripheral with an HTTP key trigger")]
struct Args {
    /// Device name used in the BLE advertisement
    #[arg(long, short, default_value = "BLE Keyboard")]
    name: String,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

/// Application state shared across handlers
pub struct AppState {
    /// Advertised device name
    pub device_name: String,
    /// Shared notifier slot, populated while a central is subscribed
    pub slot: Arc<NotifierSlot>,
    /// Advertiser handle for sending commands
    pub advertiser: AdvertiserHandle,
    /// Reports pushed via the trigger endpoint
    pub reports_sent: AtomicU64,
    /// When the current subscription was established
    pub subscribed_since: RwLock<Option<DateTime<Utc>>>,
    /// Node start time
    pub start_time: Instant,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting keytap node: {}", args.name);

    // Create the shared notifier slot and spawn the advertiser.
    // The advertiser's terminal result comes back over fatal_rx, so a
    // failed bring-up ends the process instead of dying silently.
    let slot = Arc::new(NotifierSlot::new());
    let config = AdvertiserConfig {
        device_name: args.name.clone(),
        ..Default::default()
    };
    let (advertiser, mut event_rx, mut fatal_rx) = spawn_system_advertiser(config, slot.clone());

    // Create shared state
    let state = Arc::new(AppState {
        device_name: args.name.clone(),
        slot,
        advertiser,
        reports_sent: AtomicU64::new(0),
        subscribed_since: RwLock::new(None),
        start_time: Instant::now(),
    });

    // Mirror advertiser events into app state
    let event_state = state.clone();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            handle_advertiser_event(event, &event_state);
        }
    });

    // Start HTTP server
    let http_bind_addr = format!("{}:{}", args.bind, args.http_port);
    let listener = tokio::net::TcpListener::bind(&http_bind_addr).await?;
    let actual_http_addr = listener.local_addr()?;

    info!("═══════════════════════════════════════════════════════════");
    info!("  Key trigger:  http://127.0.0.1:{}/enter", actual_http_addr.port());
    info!("  Node status:  http://127.0.0.1:{}/api/status", actual_http_addr.port());
    info!("═══════════════════════════════════════════════════════════");

    let app = server::create_router(state.clone());

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }

        fatal = &mut fatal_rx => {
            match fatal {
                Ok(Ok(())) => warn!("Advertiser stopped; exiting"),
                Ok(Err(e)) => {
                    error!("Advertiser failed: {}", e);
                    return Err(e.into());
                }
                Err(_) => anyhow::bail!("Advertiser thread terminated unexpectedly"),
            }
        }

        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            let _ = state.advertiser.shutdown().await;
        }
    }

    Ok(())
}

/// Handle events from the advertiser
fn handle_advertiser_event(event: AdvertiserEvent, state: &AppState) {
    match event {
        AdvertiserEvent::Started { device_name } => {
            info!("Advertising as \"{}\"", device_name);
        }

        AdvertiserEvent::CentralSubscribed { since } => {
            info!("Central subscribed; key trigger is live");
            *state.subscribed_since.write() = Some(since);
        }

        AdvertiserEvent::CentralUnsubscribed => {
            info!("Central unsubscribed; key trigger disabled");
            *state.subscribed_since.write() = None;
        }

        AdvertiserEvent::PowerChanged { powered } => {
            if powered {
                info!("Adapter powered on");
            } else {
                warn!("Adapter powered off");
            }
        }

        AdvertiserEvent::Stopped => {
            info!("Advertiser stopped");
        }
    }
}
