//! Clipboard cleaning: extraction, decoding, and normalization
//!
//! Converts whatever rich representations are on the pasteboard into a
//! single plain-text value with controlled whitespace.

mod detab;
mod extract;
mod html;
mod normalize;
mod pasteboard;
mod rtf;

pub use detab::DetabMode;
pub use extract::{clean, extract_text};
pub use normalize::normalize;
pub use pasteboard::{Pasteboard, PasteboardError, SystemPasteboard};

#[cfg(test)]
pub use pasteboard::MemoryPasteboard;
