//! Character-content extraction from HTML clipboard data
//!
//! Strips tags and recovers text with the whitespace semantics the
//! cleaner needs: block-element boundaries and `<br>` become real
//! newlines, `<pre>` content keeps its whitespace verbatim, and
//! everything else collapses runs of whitespace the way a renderer
//! would. Often the only text-bearing flavor on the pasteboard when a
//! browser wrote it, which is why the pipeline tries it before giving
//! up.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("markup is not valid UTF-8")]
    InvalidUtf8,
}

/// Elements whose open/close edges are block boundaries. A boundary
/// materializes as exactly one newline, no matter how many edges meet.
const BLOCK_ELEMENTS: [&str; 24] = [
    "p",
    "div",
    "li",
    "ul",
    "ol",
    "tr",
    "table",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
    "section",
    "article",
    "header",
    "footer",
    "main",
    "aside",
    "nav",
    "dd",
    "dt",
];

/// Decode the character content of an HTML byte stream.
pub fn to_text(data: &[u8]) -> Result<String, HtmlError> {
    let html = std::str::from_utf8(data).map_err(|_| HtmlError::InvalidUtf8)?;
    let chars: Vec<char> = html.chars().collect();

    let mut out = String::new();
    let mut i = 0usize;
    let mut pre_depth = 0usize;
    // Deferred whitespace, resolved when the next visible char arrives.
    let mut pending_break = false;
    let mut pending_space = false;
    // The newline immediately after <pre> is part of the markup, not
    // the content.
    let mut at_pre_start = false;

    while i < chars.len() {
        match chars[i] {
            '<' => {
                if chars[i..].starts_with(&['<', '!', '-', '-']) {
                    i = skip_comment(&chars, i + 4);
                    continue;
                }
                let (tag, next) = read_tag(&chars, i + 1);
                i = next;

                let (name, closing) = match tag {
                    Some(t) => t,
                    None => continue,
                };

                match name.as_str() {
                    "br" => {
                        // Hard break: every <br> is its own newline.
                        flush_space(&mut out, &mut pending_space);
                        pending_break = false;
                        out.push('\n');
                    }
                    "script" | "style" if !closing => {
                        i = skip_until_close(&chars, i, &name);
                    }
                    "pre" => {
                        if closing {
                            pre_depth = pre_depth.saturating_sub(1);
                        } else {
                            pre_depth += 1;
                            at_pre_start = true;
                        }
                        pending_break = true;
                        pending_space = false;
                    }
                    n if BLOCK_ELEMENTS.contains(&n) => {
                        pending_break = true;
                        pending_space = false;
                    }
                    _ => {} // inline element: no whitespace contribution
                }
            }
            '&' => {
                let (c, next) = read_entity(&chars, i);
                i = next;
                emit(
                    &mut out,
                    c,
                    pre_depth > 0,
                    &mut pending_break,
                    &mut pending_space,
                    &mut at_pre_start,
                );
            }
            c => {
                i += 1;
                emit(
                    &mut out,
                    c,
                    pre_depth > 0,
                    &mut pending_break,
                    &mut pending_space,
                    &mut at_pre_start,
                );
            }
        }
    }

    Ok(out)
}

fn emit(
    out: &mut String,
    c: char,
    in_pre: bool,
    pending_break: &mut bool,
    pending_space: &mut bool,
    at_pre_start: &mut bool,
) {
    if in_pre {
        if *at_pre_start {
            *at_pre_start = false;
            if c == '\n' {
                // Drop it, but the block boundary before <pre> still
                // applies.
                return;
            }
        }
        resolve_break(out, pending_break);
        *pending_space = false;
        out.push(c);
        return;
    }

    if c.is_whitespace() {
        *pending_space = true;
        return;
    }

    if *pending_break {
        resolve_break(out, pending_break);
        *pending_space = false;
    } else {
        flush_space(out, pending_space);
    }
    out.push(c);
}

/// A block boundary yields one newline, and only when there is already
/// visible text that does not end with one.
fn resolve_break(out: &mut String, pending_break: &mut bool) {
    if *pending_break {
        *pending_break = false;
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }
}

fn flush_space(out: &mut String, pending_space: &mut bool) {
    if *pending_space {
        *pending_space = false;
        if !out.is_empty() && !out.ends_with('\n') {
            out.push(' ');
        }
    }
}

/// Scan a tag starting just past `<`. Returns the lowercased element
/// name with its closing flag, and the index past `>`. Quoted attribute
/// values may contain `>`.
fn read_tag(chars: &[char], mut i: usize) -> (Option<(String, bool)>, usize) {
    let closing = chars.get(i) == Some(&'/');
    if closing {
        i += 1;
    }

    let name_start = i;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric()) {
        i += 1;
    }
    let name: String = chars[name_start..i].iter().collect::<String>().to_ascii_lowercase();

    let mut quote: Option<char> = None;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => {
                if name.is_empty() {
                    return (None, i);
                }
                return (Some((name, closing)), i);
            }
            None => {}
        }
    }
    (None, i)
}

fn skip_comment(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() {
        if chars[i..].starts_with(&['-', '-', '>']) {
            return i + 3;
        }
        i += 1;
    }
    i
}

/// Skip raw-text content (script/style) up to and past the matching
/// close tag.
fn skip_until_close(chars: &[char], mut i: usize, name: &str) -> usize {
    let close: Vec<char> = format!("</{name}").chars().collect();
    while i < chars.len() {
        if chars[i] == '<' && starts_with_ignore_case(&chars[i..], &close) {
            let (_, next) = read_tag(chars, i + 1);
            return next;
        }
        i += 1;
    }
    i
}

fn starts_with_ignore_case(haystack: &[char], needle: &[char]) -> bool {
    haystack.len() >= needle.len()
        && haystack
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_ascii_lowercase() == b.to_ascii_lowercase())
}

/// Decode a character reference starting at `&`. Unknown or unclosed
/// references pass through literally.
fn read_entity(chars: &[char], start: usize) -> (char, usize) {
    const MAX_ENTITY: usize = 12;

    let end = chars[start + 1..]
        .iter()
        .take(MAX_ENTITY)
        .position(|&c| c == ';')
        .map(|p| start + 1 + p);

    let end = match end {
        Some(e) => e,
        None => return ('&', start + 1),
    };

    let body: String = chars[start + 1..end].iter().collect();
    let decoded = match body.as_str() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => numeric_entity(&body),
    };

    match decoded {
        Some(c) => (c, end + 1),
        None => ('&', start + 1),
    }
}

fn numeric_entity(body: &str) -> Option<char> {
    let digits = body.strip_prefix('#')?;
    let code = if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<u32>().ok()?
    };
    char::from_u32(code)
}
