//! Hotkey value types and their persisted record schemas

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Deserializer, Serialize};

/// Modifier bitset over Command / Option / Shift / Control.
///
/// Uses the Carbon mask values so records persisted by earlier releases
/// decode bit-for-bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const COMMAND: Modifiers = Modifiers(0x0100);
    pub const SHIFT: Modifiers = Modifiers(0x0200);
    pub const OPTION: Modifiers = Modifiers(0x0800);
    pub const CONTROL: Modifiers = Modifiers(0x1000);

    const ALL_BITS: u32 = 0x0100 | 0x0200 | 0x0800 | 0x1000;

    /// Build from raw bits, dropping anything outside the four known
    /// modifier masks.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Extract the modifier set from CGEvent flags.
    #[cfg(target_os = "macos")]
    pub fn from_cg_flags(flags: core_graphics::event::CGEventFlags) -> Self {
        use core_graphics::event::CGEventFlags;

        let mut mods = Modifiers::NONE;
        if flags.contains(CGEventFlags::CGEventFlagCommand) {
            mods = mods | Modifiers::COMMAND;
        }
        if flags.contains(CGEventFlags::CGEventFlagAlternate) {
            mods = mods | Modifiers::OPTION;
        }
        if flags.contains(CGEventFlags::CGEventFlagShift) {
            mods = mods | Modifiers::SHIFT;
        }
        if flags.contains(CGEventFlags::CGEventFlagControl) {
            mods = mods | Modifiers::CONTROL;
        }
        mods
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

/// A key combination: virtual key code, modifier set, and the canonical
/// display key.
///
/// Values are immutable; the display key is uppercased on construction
/// and on decode, so equality is structural over all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotKey {
    key_code: u32,
    modifiers: Modifiers,
    #[serde(deserialize_with = "uppercase")]
    key_equivalent: String,
}

fn uppercase<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    String::deserialize(d).map(|s| s.to_uppercase())
}

/// kVK_ANSI_V
const DEFAULT_KEY_CODE: u32 = 9;

impl Default for HotKey {
    /// The hardcoded fallback: Command-Option-V.
    fn default() -> Self {
        Self::new(
            DEFAULT_KEY_CODE,
            Modifiers::COMMAND | Modifiers::OPTION,
            "V",
        )
    }
}

impl HotKey {
    pub fn new(key_code: u32, modifiers: Modifiers, key_equivalent: &str) -> Self {
        Self {
            key_code,
            modifiers,
            key_equivalent: key_equivalent.to_uppercase(),
        }
    }

    pub fn key_code(&self) -> u32 {
        self.key_code
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn key_equivalent(&self) -> &str {
        &self.key_equivalent
    }

    /// Human-readable form, e.g. `⌘⌥V`.
    pub fn display_string(&self) -> String {
        let mut s = String::new();
        if self.modifiers.contains(Modifiers::COMMAND) {
            s.push('\u{2318}');
        }
        if self.modifiers.contains(Modifiers::OPTION) {
            s.push('\u{2325}');
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            s.push('\u{21E7}');
        }
        if self.modifiers.contains(Modifiers::CONTROL) {
            s.push('\u{2303}');
        }
        match self.key_equivalent.chars().next() {
            Some(' ') => s.push_str("Space"),
            Some('\u{1B}') => s.push_str("Esc"),
            _ => s.push_str(&self.key_equivalent),
        }
        s
    }
}

impl fmt::Display for HotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

/// Which schema a stored record decoded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredSchema {
    Current,
    Legacy,
}

/// Pre-rewrite record layout: same fields, camelCase names.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    key_code: u32,
    modifiers: u32,
    key_equivalent: String,
}

/// Decode a persisted record, trying the current schema first and the
/// legacy layout second. `None` means the record is corrupt.
pub fn decode_record(bytes: &[u8]) -> Option<(HotKey, StoredSchema)> {
    if let Ok(hotkey) = serde_json::from_slice::<HotKey>(bytes) {
        return Some((hotkey, StoredSchema::Current));
    }

    if let Ok(legacy) = serde_json::from_slice::<LegacyRecord>(bytes) {
        let hotkey = HotKey::new(
            legacy.key_code,
            Modifiers::from_bits(legacy.modifiers),
            &legacy.key_equivalent,
        );
        return Some((hotkey, StoredSchema::Legacy));
    }

    None
}

/// Encode a hotkey in the current schema.
pub fn encode_record(hotkey: &HotKey) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(hotkey)
}
