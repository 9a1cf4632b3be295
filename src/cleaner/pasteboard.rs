//! Clipboard access behind a trait seam
//!
//! The extraction pipeline only needs the three flavors it tries, in
//! their raw form, plus plain-text write-back. The macOS implementation
//! reads NSPasteboard; tests use the in-memory fake.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasteboardError {
    #[error("pasteboard rejected the write")]
    WriteFailed,
    #[error("pasteboard is unavailable on this platform")]
    Unavailable,
}

/// Read access by priority class and plain-text write-back.
pub trait Pasteboard: Send {
    /// A plain-text representation, if one is present.
    fn plain_text(&mut self) -> Option<String>;
    /// Raw bytes of a rich-text (RTF) representation.
    fn rich_text_data(&mut self) -> Option<Vec<u8>>;
    /// Raw bytes of a structured-markup (HTML) representation.
    fn markup_data(&mut self) -> Option<Vec<u8>>;
    /// Replace the clipboard contents with a single plain-text value.
    fn write_plain_text(&mut self, text: &str) -> Result<(), PasteboardError>;
}

#[cfg(target_os = "macos")]
pub use macos::SystemPasteboard;

#[cfg(target_os = "macos")]
mod macos {
    use objc2_app_kit::{
        NSPasteboard, NSPasteboardTypeHTML, NSPasteboardTypeRTF, NSPasteboardTypeString,
    };
    use objc2_foundation::NSString;

    use super::{Pasteboard, PasteboardError};

    /// The general NSPasteboard.
    pub struct SystemPasteboard;

    impl SystemPasteboard {
        pub fn new() -> Self {
            Self
        }
    }

    impl Pasteboard for SystemPasteboard {
        fn plain_text(&mut self) -> Option<String> {
            unsafe {
                let pb = NSPasteboard::generalPasteboard();
                pb.stringForType(NSPasteboardTypeString).map(|s| s.to_string())
            }
        }

        fn rich_text_data(&mut self) -> Option<Vec<u8>> {
            unsafe {
                let pb = NSPasteboard::generalPasteboard();
                pb.dataForType(NSPasteboardTypeRTF).map(|d| d.to_vec())
            }
        }

        fn markup_data(&mut self) -> Option<Vec<u8>> {
            unsafe {
                let pb = NSPasteboard::generalPasteboard();
                pb.dataForType(NSPasteboardTypeHTML).map(|d| d.to_vec())
            }
        }

        fn write_plain_text(&mut self, text: &str) -> Result<(), PasteboardError> {
            unsafe {
                let pb = NSPasteboard::generalPasteboard();
                pb.clearContents();
                let ok = pb.setString_forType(&NSString::from_str(text), NSPasteboardTypeString);
                if ok {
                    Ok(())
                } else {
                    Err(PasteboardError::WriteFailed)
                }
            }
        }
    }
}

#[cfg(not(target_os = "macos"))]
pub use stub::SystemPasteboard;

#[cfg(not(target_os = "macos"))]
mod stub {
    use super::{Pasteboard, PasteboardError};

    /// Placeholder for platforms without a pasteboard backend; every
    /// read is empty and writes fail.
    pub struct SystemPasteboard;

    impl SystemPasteboard {
        pub fn new() -> Self {
            Self
        }
    }

    impl Pasteboard for SystemPasteboard {
        fn plain_text(&mut self) -> Option<String> {
            None
        }

        fn rich_text_data(&mut self) -> Option<Vec<u8>> {
            None
        }

        fn markup_data(&mut self) -> Option<Vec<u8>> {
            None
        }

        fn write_plain_text(&mut self, _text: &str) -> Result<(), PasteboardError> {
            Err(PasteboardError::Unavailable)
        }
    }
}

/// In-memory pasteboard for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryPasteboard {
    pub plain: Option<String>,
    pub rtf: Option<Vec<u8>>,
    pub html: Option<Vec<u8>>,
    pub written: Vec<String>,
}

#[cfg(test)]
impl Pasteboard for MemoryPasteboard {
    fn plain_text(&mut self) -> Option<String> {
        self.plain.clone()
    }

    fn rich_text_data(&mut self) -> Option<Vec<u8>> {
        self.rtf.clone()
    }

    fn markup_data(&mut self) -> Option<Vec<u8>> {
        self.html.clone()
    }

    fn write_plain_text(&mut self, text: &str) -> Result<(), PasteboardError> {
        self.plain = Some(text.to_string());
        self.written.push(text.to_string());
        Ok(())
    }
}
