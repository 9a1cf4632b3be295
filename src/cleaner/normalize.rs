//! Whitespace and invisible-character normalization
//!
//! Pure transformation applied to every string before it is written back
//! to the clipboard. Preserves indentation and line structure; only line
//! endings, NBSP, zero-width characters, and (optionally) tabs change.

/// Zero-width code points that ride inside grapheme clusters.
/// Filtered per code point: a substring replace would miss occurrences
/// joined to adjacent combining marks.
const ZERO_WIDTH: [char; 3] = [
    '\u{200B}', // zero-width space
    '\u{200C}', // zero-width non-joiner
    '\u{200D}', // zero-width joiner
];

/// Normalize line endings and invisible spaces; optionally expand tabs.
///
/// Steps, in order, each on the output of the previous:
/// 1. `\r\n` -> `\n`, then any remaining `\r` -> `\n`
/// 2. NBSP (U+00A0) -> regular space
/// 3. strip U+200B / U+200C / U+200D
/// 4. if `detab`, each tab becomes `max(1, tab_width)` spaces
pub fn normalize(text: &str, detab: bool, tab_width: usize) -> String {
    // The two-character sequence must be handled atomically before the
    // bare-\r pass, or each \r\n would become two newlines.
    let mut out = text.replace("\r\n", "\n").replace('\r', "\n");

    out = out.replace('\u{00A0}', " ");

    out = out.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();

    if detab {
        let spaces = " ".repeat(tab_width.max(1));
        out = out.replace('\t', &spaces);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_ending_unification() {
        assert_eq!(normalize("a\r\nb\rc\nd", false, 4), "a\nb\nc\nd");
    }

    #[test]
    fn test_crlf_not_doubled() {
        assert_eq!(normalize("a\r\n\r\nb", false, 4), "a\n\nb");
    }

    #[test]
    fn test_nbsp_becomes_space() {
        assert_eq!(normalize("x\u{00A0}y", false, 4), "x y");
    }

    #[test]
    fn test_zero_width_removal_composes() {
        let input = "a\u{200B}b\u{00A0}c\u{200C}d\u{200D}e";
        let out = normalize(input, false, 4);
        assert_eq!(out, "ab cde");
        assert_eq!(out.chars().count(), input.chars().count() - 3);
    }

    #[test]
    fn test_zero_width_inside_grapheme_cluster() {
        // ZWJ joined to an emoji sequence still gets stripped
        let input = "\u{1F469}\u{200D}\u{1F4BB}";
        assert_eq!(normalize(input, false, 4), "\u{1F469}\u{1F4BB}");
    }

    #[test]
    fn test_detab_floor_of_one() {
        assert_eq!(normalize("\t", true, 0), " ");
    }

    #[test]
    fn test_detab_widths() {
        for n in [2usize, 4, 8] {
            assert_eq!(normalize("\t", true, n), " ".repeat(n));
        }
    }

    #[test]
    fn test_detab_off_leaves_tabs() {
        assert_eq!(normalize("a\tb", false, 4), "a\tb");
    }

    #[test]
    fn test_detab_no_effect_without_tabs() {
        let s = "fn main() {\n    body\n}";
        assert_eq!(normalize(s, true, 4), normalize(s, false, 4));
    }

    #[test]
    fn test_idempotent_without_detab() {
        let s = "a\r\nb\u{00A0}c\u{200B}d";
        let once = normalize(s, false, 4);
        assert_eq!(normalize(&once, false, 4), once);
    }

    #[test]
    fn test_passthrough_unaffected() {
        let s = "café 🎉  indented\n  lines";
        assert_eq!(normalize(s, false, 4), s);
    }
}
