//! keyhold-daemon: Background daemon for global hotkey capture and
//! keystroke forwarding.
//!
//! The daemon provides:
//! - A single global hotkey slot registered with the OS, pumped on a
//!   dedicated thread
//! - A hold controller that toggles pressing a chosen key inside a chosen
//!   target window on each hotkey activation
//! - An IPC control surface for the external settings/picker UI
//!
//! Settings persistence and all UI state live in the external client; the
//! daemon only holds the live binding, target and hold state.

mod config;
mod events;
mod hotkey;
mod inject;
mod ipc;
mod keys;
mod lifecycle;
mod state;
mod winlist;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::DaemonEvent;
use crate::hotkey::{Dispatcher, HotkeyListener};
use crate::ipc::{DaemonHandle, Server};
use crate::lifecycle::ShutdownSignal;
use crate::state::HoldController;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "keyhold-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(addr = %config.listen_addr, "configuration loaded");

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Channels for inter-component communication
    // Pump thread -> hold controller
    let (dispatcher, subscription) = Dispatcher::channel(config.event_capacity);
    // Daemon -> IPC server (broadcast to subscribed clients)
    let (event_tx, _event_rx) = broadcast::channel::<DaemonEvent>(64);
    // IPC server -> hold controller
    let (control_tx, control_rx) = mpsc::channel(16);

    // Create and arm the hotkey listener (pump runs on a dedicated thread)
    let mut listener = HotkeyListener::new(hotkey::platform_backend(), dispatcher);
    match listener.start() {
        Ok(()) => {
            info!(backend = listener.backend_name(), "hotkey listener started");
        }
        Err(e) => {
            error!(?e, "failed to start hotkey listener");
            warn!("continuing without hotkey capture");
        }
    }
    let listener = Arc::new(Mutex::new(listener));

    // Create the hold controller around the platform injector
    let mut controller = HoldController::new(inject::platform_injector(), event_tx.clone());

    // Create the IPC server
    let daemon = DaemonHandle {
        listener: Arc::clone(&listener),
        control: control_tx,
    };
    let server = Server::bind(config.listen_addr, daemon, event_tx.clone()).await?;

    // Mirror controller events into the IPC status snapshot
    let mut status_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the hold controller (processes hotkey activations)
        _ = controller.run(subscription, control_rx) => {
            info!("hold controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the status snapshot in sync with controller events
        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => match &event {
                        DaemonEvent::HoldStarted { .. } => {
                            server_for_events.set_holding(true).await;
                        }
                        DaemonEvent::HoldReleased { .. }
                        | DaemonEvent::InjectionFailed { .. } => {
                            server_for_events.set_holding(false).await;
                        }
                        DaemonEvent::TargetChanged { target } => {
                            server_for_events.set_target(*target).await;
                        }
                        DaemonEvent::HotkeyBound { .. } | DaemonEvent::HotkeyCleared => {}
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "status event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("status event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;
    match listener.lock() {
        Ok(mut listener) => listener.dispose(),
        Err(_) => warn!("hotkey listener lock poisoned during shutdown"),
    }

    info!("keyhold-daemon stopped");

    Ok(())
}
