//! Validation of captured key combinations
//!
//! The capture UI feeds raw key events here: the character the key
//! would produce with no modifier remapping, plus the modifier set
//! held. Two independent checks gate a candidate: the combination must
//! include a modifier, and the character must be one we can bind.

use thiserror::Error;

use super::keys::{HotKey, Modifiers};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("shortcut needs at least one modifier key")]
    NoModifier,
    #[error("key cannot be used as a shortcut")]
    UnsupportedKey,
}

const ESCAPE: char = '\u{1B}';

/// Whether a character can serve as a shortcut key with the given
/// modifiers. Escape is reserved on its own; space and printable ASCII
/// are always fine; everything else (other controls, DEL, non-ASCII)
/// is not bindable.
pub fn is_supported(character: char, modifiers: Modifiers) -> bool {
    match character {
        ESCAPE => !modifiers.is_empty(),
        ' ' => true,
        '!'..='~' => true,
        _ => false,
    }
}

/// Turn a raw key event into a hotkey candidate, or reject it.
///
/// The needs-a-modifier gate applies before (and independently of)
/// the per-character check.
pub fn capture(key_code: u32, character: char, modifiers: Modifiers) -> Result<HotKey, CaptureError> {
    if modifiers.is_empty() {
        return Err(CaptureError::NoModifier);
    }

    if !is_supported(character, modifiers) {
        return Err(CaptureError::UnsupportedKey);
    }

    Ok(HotKey::new(key_code, modifiers, &character.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_letter_supported_without_modifiers() {
        assert!(is_supported('a', Modifiers::NONE));
    }

    #[test]
    fn test_escape_needs_a_modifier() {
        assert!(!is_supported(ESCAPE, Modifiers::NONE));
        assert!(is_supported(ESCAPE, Modifiers::COMMAND));
    }

    #[test]
    fn test_space_always_supported() {
        assert!(is_supported(' ', Modifiers::NONE));
        assert!(is_supported(' ', Modifiers::SHIFT));
    }

    #[test]
    fn test_printable_ascii_range() {
        assert!(is_supported('!', Modifiers::NONE));
        assert!(is_supported('~', Modifiers::NONE));
        assert!(is_supported('5', Modifiers::NONE));
    }

    #[test]
    fn test_del_and_controls_rejected() {
        assert!(!is_supported('\u{7F}', Modifiers::NONE));
        assert!(!is_supported('\u{7F}', Modifiers::COMMAND | Modifiers::SHIFT));
        assert!(!is_supported('\t', Modifiers::COMMAND));
        assert!(!is_supported('\n', Modifiers::COMMAND));
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(!is_supported('é', Modifiers::COMMAND));
        assert!(!is_supported('あ', Modifiers::COMMAND));
    }

    #[test]
    fn test_capture_requires_modifier_even_for_valid_key() {
        assert_eq!(
            capture(0, 'a', Modifiers::NONE),
            Err(CaptureError::NoModifier)
        );
    }

    #[test]
    fn test_capture_rejects_unsupported_key() {
        assert_eq!(
            capture(117, '\u{7F}', Modifiers::COMMAND),
            Err(CaptureError::UnsupportedKey)
        );
    }

    #[test]
    fn test_capture_builds_uppercase_hotkey() {
        let hk = capture(9, 'v', Modifiers::COMMAND | Modifiers::SHIFT).unwrap();
        assert_eq!(hk.key_equivalent(), "V");
        assert_eq!(hk.modifiers(), Modifiers::COMMAND | Modifiers::SHIFT);
        assert_eq!(hk.key_code(), 9);
    }
}
