//! Ordered-candidate text extraction and the clean operation
//!
//! Sources are tried strictly in priority order: plain text, then the
//! rich-text flavor, then structured markup. The first one that yields
//! non-empty text wins; sources are never merged. A flavor that fails
//! to decode counts as absent, not as an error.

use tracing::{debug, warn};

use super::detab::DetabMode;
use super::normalize::normalize;
use super::pasteboard::Pasteboard;
use super::{html, rtf};

/// Recover plain text from the highest-priority usable source, or
/// `None` when nothing usable is present.
pub fn extract_text(pb: &mut dyn Pasteboard) -> Option<String> {
    if let Some(s) = pb.plain_text().filter(|s| !s.is_empty()) {
        return Some(s);
    }

    if let Some(data) = pb.rich_text_data() {
        match rtf::to_text(&data) {
            Ok(s) if !s.is_empty() => return Some(s),
            Ok(_) => debug!("rich text flavor decoded to nothing"),
            Err(e) => debug!(error = %e, "rich text flavor undecodable, falling through"),
        }
    }

    if let Some(data) = pb.markup_data() {
        match html::to_text(&data) {
            Ok(s) if !s.is_empty() => return Some(s),
            Ok(_) => debug!("markup flavor decoded to nothing"),
            Err(e) => debug!(error = %e, "markup flavor undecodable"),
        }
    }

    None
}

/// Convert the clipboard to plain text only, preserving indentation and
/// newlines. Returns false, leaving the clipboard untouched, when no
/// text could be recovered.
pub fn clean(pb: &mut dyn Pasteboard, mode: DetabMode) -> bool {
    let Some(text) = extract_text(pb) else {
        debug!("no usable text on the pasteboard");
        return false;
    };

    let cleaned = normalize(&text, mode.is_enabled(), mode.tab_width());

    match pb.write_plain_text(&cleaned) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "failed to write cleaned text back");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::pasteboard::MemoryPasteboard;

    #[test]
    fn test_plain_text_wins() {
        let mut pb = MemoryPasteboard {
            plain: Some("plain".into()),
            rtf: Some(br"{\rtf1 rich}".to_vec()),
            html: Some(b"<p>markup</p>".to_vec()),
            ..Default::default()
        };
        assert_eq!(extract_text(&mut pb).as_deref(), Some("plain"));
    }

    #[test]
    fn test_empty_plain_falls_through_to_rich() {
        let mut pb = MemoryPasteboard {
            plain: Some(String::new()),
            rtf: Some(br"{\rtf1 rich}".to_vec()),
            ..Default::default()
        };
        assert_eq!(extract_text(&mut pb).as_deref(), Some("rich"));
    }

    #[test]
    fn test_malformed_rich_falls_through_to_markup() {
        let mut pb = MemoryPasteboard {
            rtf: Some(b"garbage, not rtf".to_vec()),
            html: Some(b"<p>from markup</p>".to_vec()),
            ..Default::default()
        };
        assert_eq!(extract_text(&mut pb).as_deref(), Some("from markup"));
    }

    #[test]
    fn test_markup_line_breaks_survive() {
        let mut pb = MemoryPasteboard {
            html: Some(b"<div>first</div><div>second</div>".to_vec()),
            ..Default::default()
        };
        assert_eq!(extract_text(&mut pb).as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn test_clean_normalizes_and_writes_back() {
        let mut pb = MemoryPasteboard {
            plain: Some("x\u{00A0}y".into()),
            ..Default::default()
        };
        assert!(clean(&mut pb, DetabMode::Off));
        assert_eq!(pb.written, vec!["x y".to_string()]);
    }

    #[test]
    fn test_clean_applies_detab_mode() {
        let mut pb = MemoryPasteboard {
            plain: Some("\tindent".into()),
            ..Default::default()
        };
        assert!(clean(&mut pb, DetabMode::Two));
        assert_eq!(pb.written, vec!["  indent".to_string()]);
    }

    #[test]
    fn test_clean_with_nothing_usable_leaves_clipboard_alone() {
        let mut pb = MemoryPasteboard::default();
        assert!(!clean(&mut pb, DetabMode::Four));
        assert!(pb.written.is_empty());
        assert!(pb.plain.is_none());
    }

    #[test]
    fn test_clean_rich_source_end_to_end() {
        let mut pb = MemoryPasteboard {
            rtf: Some(br"{\rtf1 a\par\tab b}".to_vec()),
            ..Default::default()
        };
        assert!(clean(&mut pb, DetabMode::Four));
        assert_eq!(pb.written, vec!["a\n    b".to_string()]);
    }
}
