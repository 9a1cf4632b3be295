//! Application events broadcast to observers
//!
//! Fire-and-forget: delivered to zero or more subscribers (the IPC
//! push channel among them), always from the coordinating task so
//! observers never see torn state.

use serde::{Deserialize, Serialize};

use crate::hotkey::HotKey;

/// Events the daemon fans out over the broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A clean recovered text and wrote it back.
    CleanSucceeded,

    /// The active hotkey changed (update, reset, or fallback).
    HotkeyChanged { hotkey: HotKey },
}

impl std::fmt::Display for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppEvent::CleanSucceeded => write!(f, "CLEAN_SUCCEEDED"),
            AppEvent::HotkeyChanged { hotkey } => {
                write!(f, "HOTKEY_CHANGED ({})", hotkey.display_string())
            }
        }
    }
}
