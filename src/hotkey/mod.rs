//! Global hotkey: value types, capture validation, persistence with
//! legacy migration, and OS-level registration with fallback.

mod capture;
mod keys;
mod listener;
mod manager;

pub use capture::{capture, is_supported, CaptureError};
pub use keys::{HotKey, Modifiers};
pub use listener::{HotkeyListener, ListenerEvent, SharedBinding, TapRegistrar};
pub use manager::{HotkeyError, HotkeyManager, HotkeyStore, Registrar, RegistrationError};
