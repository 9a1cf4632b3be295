//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian
//! length. The menu-bar and preferences UIs are the clients.

use serde::{Deserialize, Serialize};

use crate::cleaner::DetabMode;
use crate::events::AppEvent;
use crate::hotkey::HotKey;

/// Requests from UI to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request a full status snapshot
    GetStatus,

    /// Clean the clipboard now (menu item action)
    Clean,

    /// Read the active hotkey
    GetHotkey,

    /// Raw capture event from the shortcut sheet; the daemon runs
    /// validation and registration and reports the outcome inline.
    SetHotkey {
        key_code: u32,
        character: char,
        modifiers: u32,
    },

    /// Restore the built-in default hotkey
    ResetHotkey,

    /// Select how tabs are expanded during cleaning
    SetDetabMode { mode: DetabMode },

    /// Toggle the clean-success notification
    SetNotifications { enabled: bool },

    /// Subscribe to event pushes on this connection
    Subscribe,
}

/// Wire form of a hotkey, including the rendered display string so
/// clients need no symbol table of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyInfo {
    pub key_code: u32,
    pub modifiers: u32,
    pub key_equivalent: String,
    pub display: String,
}

impl From<&HotKey> for HotkeyInfo {
    fn from(hotkey: &HotKey) -> Self {
        Self {
            key_code: hotkey.key_code(),
            modifiers: hotkey.modifiers().bits(),
            key_equivalent: hotkey.key_equivalent().to_string(),
            display: hotkey.display_string(),
        }
    }
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Full status snapshot
    Status(DaemonStatus),

    /// Clean finished; `changed` is false when nothing usable was on
    /// the clipboard
    Cleaned { changed: bool },

    /// The active (or newly applied) hotkey
    Hotkey(HotkeyInfo),

    /// A preference change was applied
    Updated,

    /// Subscription confirmed
    Subscribed,

    /// Request failed; `code` is machine-readable for inline UI errors
    Error { code: String, message: String },
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "event", rename_all = "snake_case")]
pub enum Notification {
    Event(AppEvent),
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub version: String,
    pub hotkey: HotkeyInfo,
    pub hotkey_registered: bool,
    pub detab_mode: DetabMode,
    pub show_notification: bool,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifiers;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetHotkey {
            key_code: 9,
            character: 'v',
            modifiers: Modifiers::COMMAND.bits(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_hotkey"));
        assert!(json.contains("\"key_code\":9"));
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{"type":"set_detab_mode","mode":"four"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            req,
            Request::SetDetabMode {
                mode: DetabMode::Four
            }
        ));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Hotkey(HotkeyInfo::from(&HotKey::default()));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("hotkey"));
        assert!(json.contains("\u{2318}\u{2325}V"));
    }

    #[test]
    fn test_notification_wraps_event() {
        let push = Notification::Event(AppEvent::CleanSucceeded);
        let json = serde_json::to_string(&push).unwrap();
        assert!(json.contains("clean_succeeded"));
    }
}
