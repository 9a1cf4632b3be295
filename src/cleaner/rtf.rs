//! Character-content extraction from RTF clipboard data
//!
//! Recovers the plain text of an RTF stream: group-aware, skips
//! non-text destinations (font/color tables, embedded images), and maps
//! the paragraph/line/tab controls onto real whitespace so indentation
//! survives. Formatting controls are discarded.
//!
//! Malformed input is a [`RtfError`]; the extraction pipeline treats
//! that as "source absent" and falls through to the next flavor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RtfError {
    #[error("data does not start with an RTF header")]
    NotRtf,
    #[error("unbalanced group nesting at byte {0}")]
    UnbalancedGroup(usize),
}

/// Destinations whose content is never visible text.
const SKIP_DESTINATIONS: [&str; 10] = [
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "themedata",
    "generator",
    "xmlnstbl",
];

#[derive(Clone, Copy)]
struct GroupState {
    skipping: bool,
    /// \ucN value: how many fallback characters follow each \uN escape.
    uc: usize,
}

/// Decode the character content of an RTF byte stream.
pub fn to_text(data: &[u8]) -> Result<String, RtfError> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if !data[start..].starts_with(b"{\\rtf") {
        return Err(RtfError::NotRtf);
    }

    let mut out = String::new();
    let mut stack: Vec<GroupState> = Vec::new();
    let mut group = GroupState { skipping: false, uc: 1 };
    let mut depth = 0usize;
    // Fallback characters still owed after a \uN escape.
    let mut pending_skip = 0usize;

    let bytes = &data[start..];
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                stack.push(group);
                depth += 1;
                i += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Err(RtfError::UnbalancedGroup(start + i));
                }
                depth -= 1;
                group = stack.pop().unwrap_or(GroupState { skipping: false, uc: 1 });
                i += 1;
            }
            b'\\' => {
                i += 1;
                i = control(bytes, i, &mut out, &mut group, &mut pending_skip)
                    .ok_or(RtfError::UnbalancedGroup(start + i))?;
            }
            b'\r' | b'\n' => {
                // Writers wrap RTF source freely; raw line breaks carry
                // no meaning.
                i += 1;
            }
            b => {
                if !group.skipping {
                    if pending_skip > 0 {
                        pending_skip -= 1;
                    } else if b >= 0x20 {
                        // Raw bytes above ASCII are Latin-1 in practice.
                        out.push(b as char);
                    }
                }
                i += 1;
            }
        }
    }

    if depth != 0 {
        return Err(RtfError::UnbalancedGroup(start + bytes.len()));
    }

    Ok(out)
}

/// Handle the token after a backslash. Returns the next cursor position,
/// or `None` on a truncated escape.
fn control(
    bytes: &[u8],
    mut i: usize,
    out: &mut String,
    group: &mut GroupState,
    pending_skip: &mut usize,
) -> Option<usize> {
    let first = *bytes.get(i)?;

    // Symbol escapes
    match first {
        b'\\' | b'{' | b'}' => {
            if !group.skipping {
                emit(out, first as char, pending_skip);
            }
            return Some(i + 1);
        }
        b'~' => {
            if !group.skipping {
                emit(out, '\u{00A0}', pending_skip);
            }
            return Some(i + 1);
        }
        b'_' => {
            if !group.skipping {
                emit(out, '-', pending_skip);
            }
            return Some(i + 1);
        }
        b'-' => return Some(i + 1), // optional hyphen: invisible
        b'*' => {
            // Starred destination: unknown to us, skip the whole group.
            group.skipping = true;
            return Some(i + 1);
        }
        b'\'' => {
            let hi = hex(*bytes.get(i + 1)?)?;
            let lo = hex(*bytes.get(i + 2)?)?;
            if !group.skipping {
                emit(out, ((hi << 4) | lo) as u8 as char, pending_skip);
            }
            return Some(i + 3);
        }
        b'\r' | b'\n' => {
            // \<newline> is an implicit \par
            if !group.skipping {
                emit(out, '\n', pending_skip);
            }
            return Some(i + 1);
        }
        _ => {}
    }

    if !first.is_ascii_alphabetic() {
        // Unknown symbol control: drop it.
        return Some(i + 1);
    }

    // Control word: letters, optional signed parameter, optional space
    // delimiter (consumed).
    let word_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let word = std::str::from_utf8(&bytes[word_start..i]).ok()?;

    let mut param: Option<i32> = None;
    let negative = bytes.get(i) == Some(&b'-');
    if negative {
        i += 1;
    }
    let num_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i > num_start {
        let n: i32 = std::str::from_utf8(&bytes[num_start..i]).ok()?.parse().ok()?;
        param = Some(if negative { -n } else { n });
    }
    if bytes.get(i) == Some(&b' ') {
        i += 1;
    }

    match word {
        "par" | "line" => {
            if !group.skipping {
                emit(out, '\n', pending_skip);
            }
        }
        "tab" => {
            if !group.skipping {
                emit(out, '\t', pending_skip);
            }
        }
        "emdash" => {
            if !group.skipping {
                emit(out, '\u{2014}', pending_skip);
            }
        }
        "endash" => {
            if !group.skipping {
                emit(out, '\u{2013}', pending_skip);
            }
        }
        "lquote" => {
            if !group.skipping {
                emit(out, '\u{2018}', pending_skip);
            }
        }
        "rquote" => {
            if !group.skipping {
                emit(out, '\u{2019}', pending_skip);
            }
        }
        "ldblquote" => {
            if !group.skipping {
                emit(out, '\u{201C}', pending_skip);
            }
        }
        "rdblquote" => {
            if !group.skipping {
                emit(out, '\u{201D}', pending_skip);
            }
        }
        "bullet" => {
            if !group.skipping {
                emit(out, '\u{2022}', pending_skip);
            }
        }
        "uc" => {
            group.uc = param.unwrap_or(1).max(0) as usize;
        }
        "u" => {
            if !group.skipping {
                let mut code = param.unwrap_or(0);
                if code < 0 {
                    code += 65536;
                }
                if let Some(c) = char::from_u32(code as u32) {
                    out.push(c);
                }
                *pending_skip = group.uc;
            }
        }
        w if SKIP_DESTINATIONS.contains(&w) => {
            group.skipping = true;
        }
        _ => {} // formatting control, ignored
    }

    Some(i)
}

fn emit(out: &mut String, c: char, pending_skip: &mut usize) {
    if *pending_skip > 0 {
        *pending_skip -= 1;
    } else {
        out.push(c);
    }
}

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
