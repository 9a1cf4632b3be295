//! The coordinating task
//!
//! Single consumer of hotkey presses and IPC commands. Everything that
//! mutates daemon state (the pasteboard, the hotkey manager, the
//! settings file) is owned here and touched from this task only, so no
//! mutation ever races another.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::cleaner::{self, DetabMode, Pasteboard};
use crate::config::SettingsFile;
use crate::events::AppEvent;
use crate::hotkey::{
    capture, CaptureError, HotKey, HotkeyError, HotkeyManager, ListenerEvent, Modifiers,
};
use crate::ipc::protocol::{DaemonStatus, HotkeyInfo};
use crate::notify::Dispatcher;

/// Why a shortcut candidate was not applied.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Registration(#[from] HotkeyError),
}

impl ApplyError {
    /// Stable machine-readable code for IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ApplyError::Capture(CaptureError::NoModifier) => "needs_modifier",
            ApplyError::Capture(CaptureError::UnsupportedKey) => "unsupported_key",
            ApplyError::Registration(_) => "registration_failed",
        }
    }
}

/// Commands sent from IPC connections to the coordinator. Each carries
/// a oneshot for its reply; a dropped reply means the client went away
/// mid-request and is ignored.
#[derive(Debug)]
pub enum Command {
    Clean {
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<DaemonStatus>,
    },
    GetHotkey {
        reply: oneshot::Sender<HotKey>,
    },
    ApplyHotkey {
        key_code: u32,
        character: char,
        modifiers: Modifiers,
        reply: oneshot::Sender<Result<HotKey, ApplyError>>,
    },
    ResetHotkey {
        reply: oneshot::Sender<Result<HotKey, ApplyError>>,
    },
    SetDetabMode {
        mode: DetabMode,
        reply: oneshot::Sender<()>,
    },
    SetNotifications {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
}

pub struct Coordinator {
    manager: HotkeyManager,
    pasteboard: Box<dyn Pasteboard>,
    settings: Arc<SettingsFile>,
    dispatcher: Dispatcher,
    event_tx: broadcast::Sender<AppEvent>,
    started_at: Instant,
}

impl Coordinator {
    pub fn new(
        manager: HotkeyManager,
        pasteboard: Box<dyn Pasteboard>,
        settings: Arc<SettingsFile>,
        dispatcher: Dispatcher,
        event_tx: broadcast::Sender<AppEvent>,
    ) -> Self {
        Self {
            manager,
            pasteboard,
            settings,
            dispatcher,
            event_tx,
            started_at: Instant::now(),
        }
    }

    /// Run until both input channels close.
    pub async fn run(
        &mut self,
        mut press_rx: mpsc::Receiver<ListenerEvent>,
        mut command_rx: mpsc::Receiver<Command>,
    ) {
        info!("coordinator started");

        loop {
            tokio::select! {
                Some(event) = press_rx.recv() => match event {
                    ListenerEvent::HotkeyPressed => {
                        self.perform_clean();
                    }
                    ListenerEvent::TapDisabled => {
                        warn!("key listener was disabled, presses may be missed");
                    }
                },
                command = command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                else => break,
            }
        }

        info!("coordinator stopped");
    }

    /// Strip the clipboard down to plain text. Returns whether anything
    /// was written back.
    fn perform_clean(&mut self) -> bool {
        let mode = self.settings.detab_mode();
        if !cleaner::clean(self.pasteboard.as_mut(), mode) {
            debug!("nothing usable on the clipboard, leaving it untouched");
            return false;
        }

        info!(detab = mode.as_tag(), "clipboard cleaned");
        let _ = self.event_tx.send(AppEvent::CleanSucceeded);
        self.dispatcher
            .post_clean_success(self.settings.show_notification());
        true
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Clean { reply } => {
                let changed = self.perform_clean();
                let _ = reply.send(changed);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::GetHotkey { reply } => {
                let _ = reply.send(self.manager.current_hotkey().clone());
            }
            Command::ApplyHotkey {
                key_code,
                character,
                modifiers,
                reply,
            } => {
                let _ = reply.send(self.apply_hotkey(key_code, character, modifiers));
            }
            Command::ResetHotkey { reply } => {
                let result = self
                    .manager
                    .update_hotkey(HotKey::default())
                    .map_err(ApplyError::from);
                let _ = reply.send(result);
            }
            Command::SetDetabMode { mode, reply } => {
                if let Err(e) = self.settings.set_detab_mode(mode) {
                    warn!(error = %e, "failed to persist detab mode");
                }
                let _ = reply.send(());
            }
            Command::SetNotifications { enabled, reply } => {
                if let Err(e) = self.settings.set_show_notification(enabled) {
                    warn!(error = %e, "failed to persist notification preference");
                }
                let _ = reply.send(());
            }
        }
    }

    /// Validate a raw capture and, if sound, register and persist it.
    fn apply_hotkey(
        &mut self,
        key_code: u32,
        character: char,
        modifiers: Modifiers,
    ) -> Result<HotKey, ApplyError> {
        let candidate = capture(key_code, character, modifiers)?;
        let applied = self.manager.update_hotkey(candidate)?;
        Ok(applied)
    }

    fn status(&self) -> DaemonStatus {
        DaemonStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            hotkey: HotkeyInfo::from(self.manager.current_hotkey()),
            hotkey_registered: self.manager.is_registered(),
            detab_mode: self.settings.detab_mode(),
            show_notification: self.settings.show_notification(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}
