//! Paths and persisted settings
//!
//! Settings live in a single JSON document next to the IPC socket:
//! `~/.local/share/clipstrip/settings.json`. The hotkey record is held
//! as an opaque JSON value under its own key; only the hotkey manager
//! interprets it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::cleaner::DetabMode;
use crate::hotkey::HotkeyStore;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Path to the persisted settings document
    pub settings_path: PathBuf,
}

impl Config {
    /// Resolve paths from the environment.
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("clipstrip");

        Ok(Self {
            socket_path: data_dir.join("daemon.sock"),
            settings_path: data_dir.join("settings.json"),
            data_dir,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk layout of the settings document. Unknown keys survive a
/// round trip only within the fields listed here; every field is
/// optional so a partial or older file still loads.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    show_notification: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    detab_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    hotkey: Option<serde_json::Value>,
}

/// The settings file, loaded once and rewritten whole on each change.
pub struct SettingsFile {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl SettingsFile {
    /// Open (or conceptually create) the settings file. A missing file
    /// is a first run; an unparseable one is dropped with a warning and
    /// per-key recovery applies from the empty document.
    pub fn open(path: &Path) -> Self {
        let doc = match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(error = %e, "settings file is unreadable, starting fresh");
                    Document::default()
                }
            },
            Err(_) => Document::default(),
        };

        Self {
            path: path.to_owned(),
            doc: Mutex::new(doc),
        }
    }

    pub fn show_notification(&self) -> bool {
        self.doc.lock().expect("settings lock poisoned").show_notification
    }

    pub fn set_show_notification(&self, enabled: bool) -> Result<(), SettingsError> {
        let mut doc = self.doc.lock().expect("settings lock poisoned");
        doc.show_notification = enabled;
        self.save(&doc)
    }

    /// The selected detab mode; a missing or unknown tag is the
    /// default.
    pub fn detab_mode(&self) -> DetabMode {
        self.doc
            .lock()
            .expect("settings lock poisoned")
            .detab_mode
            .as_deref()
            .and_then(DetabMode::from_tag)
            .unwrap_or_default()
    }

    pub fn set_detab_mode(&self, mode: DetabMode) -> Result<(), SettingsError> {
        let mut doc = self.doc.lock().expect("settings lock poisoned");
        doc.detab_mode = Some(mode.as_tag().to_string());
        self.save(&doc)
    }

    fn save(&self, doc: &Document) -> Result<(), SettingsError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl HotkeyStore for SettingsFile {
    fn read(&self) -> Option<Vec<u8>> {
        let doc = self.doc.lock().expect("settings lock poisoned");
        doc.hotkey
            .as_ref()
            .and_then(|value| serde_json::to_vec(value).ok())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let mut doc = self.doc.lock().expect("settings lock poisoned");
        doc.hotkey = Some(value);
        self.save(&doc)?;
        Ok(())
    }
}
