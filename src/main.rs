//! clipstrip-daemon: clipboard formatting stripper
//!
//! Runs in the background and, on a global hotkey, replaces the
//! clipboard contents with their plain-text equivalent:
//! - Global key detection via CGEventTap
//! - Rich-text (RTF) and markup (HTML) extraction with fallbacks
//! - Whitespace normalization with optional tab expansion
//! - IPC server for the menu bar and preferences UIs

mod cleaner;
mod config;
mod coordinator;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod notify;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cleaner::SystemPasteboard;
use crate::config::{Config, SettingsFile};
use crate::coordinator::Coordinator;
use crate::events::AppEvent;
use crate::hotkey::{HotkeyListener, HotkeyManager, SharedBinding, TapRegistrar};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::notify::{Dispatcher, SystemNotifier};

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
        "clipstrip-daemon starting"
    );

    // Load configuration and persisted settings
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, "configuration loaded");

    let settings = Arc::new(SettingsFile::open(&config.settings_path));

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Channels for inter-component communication:
    // key listener -> coordinator
    let (press_tx, press_rx) = mpsc::channel(32);
    // IPC connections -> coordinator
    let (command_tx, command_rx) = mpsc::channel(32);
    // coordinator -> subscribed IPC clients
    let (event_tx, _event_rx) = broadcast::channel::<AppEvent>(64);

    // The listener matches key-downs against this shared binding; the
    // manager swaps it through the registrar.
    let binding = SharedBinding::new();
    let listener = HotkeyListener::new(press_tx, binding.clone());

    let mut manager = HotkeyManager::new(
        settings.clone(),
        Box::new(TapRegistrar::new(binding)),
        event_tx.clone(),
    );
    manager.load();
    if let Err(e) = manager.register_hotkey() {
        error!(?e, "could not register any shortcut");
    }

    // Start the key listener (runs on a dedicated thread)
    match listener.start() {
        Ok(()) => {
            info!(hotkey = %manager.current_hotkey(), "key listener started");
        }
        Err(e) => {
            error!(?e, "failed to start key listener");
            warn!("continuing without hotkey support - check Accessibility permissions");
        }
    }

    let mut coordinator = Coordinator::new(
        manager,
        Box::new(SystemPasteboard::new()),
        settings,
        Dispatcher::new(Box::new(SystemNotifier)),
        event_tx.clone(),
    );

    let server = Server::new(&config.socket_path, command_tx, event_tx)?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Process presses and IPC commands
        _ = coordinator.run(press_rx, command_rx) => {
            info!("coordinator exited");
        }

        // Accept client connections
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    listener.stop();
    server.shutdown().await;

    info!("clipstrip-daemon stopped");

    Ok(())
}
