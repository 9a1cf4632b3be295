//! Global key-press listener
//!
//! A CGEventTap on a dedicated thread watches system-wide key-down
//! events and compares them against the currently bound combination.
//! Matches are pushed over an mpsc channel; the coordinating task is
//! the single consumer, so hotkey handling never runs on the tap
//! thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;

use super::keys::{HotKey, Modifiers};
use super::manager::{Registrar, RegistrationError};

/// Events sent from the listener to the coordinator.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    /// The bound combination was pressed.
    HotkeyPressed,
    /// The event tap was disabled by the OS; presses may be missed.
    TapDisabled,
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener is already running")]
    AlreadyRunning,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("global key listening is not supported on this platform")]
    Unsupported,
}

/// The combination the tap currently matches against. Shared between
/// the tap thread and the registrar; `None` while nothing is bound.
#[derive(Clone, Default)]
pub struct SharedBinding {
    inner: Arc<Mutex<Option<HotKey>>>,
}

impl SharedBinding {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, hotkey: Option<HotKey>) {
        *self.inner.lock().expect("binding lock poisoned") = hotkey;
    }

    fn matches(&self, key_code: u32, modifiers: Modifiers) -> bool {
        self.inner
            .lock()
            .expect("binding lock poisoned")
            .as_ref()
            .map(|hk| hk.key_code() == key_code && hk.modifiers() == modifiers)
            .unwrap_or(false)
    }
}

/// OS registration backed by the shared tap binding.
///
/// Binding is a plain swap of the matched combination, so unlike a
/// Carbon hotkey it cannot be rejected per combination; the failure
/// surface lives in tap creation, reported by the listener itself.
pub struct TapRegistrar {
    binding: SharedBinding,
}

impl TapRegistrar {
    pub fn new(binding: SharedBinding) -> Self {
        Self { binding }
    }
}

impl Registrar for TapRegistrar {
    fn register(&mut self, hotkey: &HotKey) -> Result<(), RegistrationError> {
        self.binding.set(Some(hotkey.clone()));
        Ok(())
    }

    fn unregister(&mut self) {
        self.binding.set(None);
    }
}

/// Global key listener that matches key-down events against the shared
/// binding.
pub struct HotkeyListener {
    event_tx: mpsc::Sender<ListenerEvent>,
    binding: SharedBinding,
    running: Arc<AtomicBool>,
}

impl HotkeyListener {
    pub fn new(event_tx: mpsc::Sender<ListenerEvent>, binding: SharedBinding) -> Self {
        Self {
            event_tx,
            binding,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the listener on a dedicated thread with its own CFRunLoop.
    /// It runs until `stop()` is called or the process exits.
    #[cfg(target_os = "macos")]
    pub fn start(&self) -> Result<(), ListenerError> {
        use tracing::{error, info};

        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }

        let event_tx = self.event_tx.clone();
        let binding = self.binding.clone();
        let running = Arc::clone(&self.running);

        std::thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");

                if let Err(e) = macos::run_event_loop(event_tx, binding, running.clone()) {
                    error!(?e, "hotkey listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ListenerError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    pub fn start(&self) -> Result<(), ListenerError> {
        Err(ListenerError::Unsupported)
    }

    /// Ask the listener thread to exit on its next tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(target_os = "macos")]
mod macos {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
    use core_graphics::event::{
        CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
        CGEventType, EventField,
    };
    use tokio::sync::mpsc;
    use tracing::{debug, info, warn};

    use super::super::keys::Modifiers;
    use super::{ListenerError, ListenerEvent, SharedBinding};

    /// A key-down observation forwarded from the tap callback.
    struct KeyDown {
        key_code: u32,
        modifiers: Modifiers,
    }

    pub(super) fn run_event_loop(
        event_tx: mpsc::Sender<ListenerEvent>,
        binding: SharedBinding,
        running: Arc<AtomicBool>,
    ) -> Result<(), ListenerError> {
        // Bridge from the tap callback to this thread's loop; the
        // callback must stay fast and non-blocking.
        let (callback_tx, callback_rx) = std::sync::mpsc::channel::<Option<KeyDown>>();

        let callback = move |_proxy: core_graphics::event::CGEventTapProxy,
                             event_type: CGEventType,
                             event: &CGEvent|
              -> Option<CGEvent> {
            match event_type {
                CGEventType::KeyDown => {
                    // Held-key autorepeats do not retrigger the action.
                    let repeat =
                        event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT);
                    if repeat == 0 {
                        let key_code = event
                            .get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE)
                            as u32;
                        let modifiers = Modifiers::from_cg_flags(event.get_flags());
                        let _ = callback_tx.send(Some(KeyDown { key_code, modifiers }));
                    }
                }
                CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                    let _ = callback_tx.send(None);
                }
                _ => {}
            }
            Some(event.clone())
        };

        let tap = CGEventTap::new(
            CGEventTapLocation::Session,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::ListenOnly,
            vec![CGEventType::KeyDown],
            callback,
        )
        .map_err(|_| ListenerError::EventTapCreation)?;

        tap.enable();

        let run_loop_source = tap
            .mach_port
            .create_runloop_source(0)
            .map_err(|_| ListenerError::EventTapCreation)?;
        let run_loop = CFRunLoop::get_current();

        unsafe {
            run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
        }

        info!("event tap created and enabled");

        while running.load(Ordering::SeqCst) {
            unsafe {
                CFRunLoop::run_in_mode(
                    kCFRunLoopDefaultMode,
                    std::time::Duration::from_millis(100),
                    true,
                );
            }

            while let Ok(observed) = callback_rx.try_recv() {
                match observed {
                    Some(key_down) => {
                        if binding.matches(key_down.key_code, key_down.modifiers) {
                            debug!(
                                key_code = key_down.key_code,
                                "bound combination pressed"
                            );
                            if event_tx
                                .blocking_send(ListenerEvent::HotkeyPressed)
                                .is_err()
                            {
                                warn!("press channel closed, stopping listener");
                                return Ok(());
                            }
                        }
                    }
                    None => {
                        warn!("event tap disabled by the OS");
                        let _ = event_tx.blocking_send(ListenerEvent::TapDisabled);
                    }
                }
            }
        }

        Ok(())
    }
}
