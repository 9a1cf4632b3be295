//! Hotkey ownership: persistence, migration, and OS registration
//!
//! Single owner of the active hotkey. Callers run on one coordinating
//! context; the manager is not built for concurrent mutation.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::events::AppEvent;

use super::keys::{self, HotKey, StoredSchema};

/// Persistence collaborator: the hotkey record as an opaque blob under
/// a stable key. The manager is the only reader/writer.
pub trait HotkeyStore: Send + Sync {
    fn read(&self) -> Option<Vec<u8>>;
    fn write(&self, bytes: &[u8]) -> anyhow::Result<()>;
}

/// OS registration collaborator. At most one combination is bound at a
/// time; `register` replaces nothing — callers unregister first.
pub trait Registrar: Send {
    fn register(&mut self, hotkey: &HotKey) -> Result<(), RegistrationError>;
    fn unregister(&mut self);
}

/// The OS rejected a key combination.
#[derive(Debug, Error)]
#[error("the system rejected the key combination")]
pub struct RegistrationError;

#[derive(Debug, Error)]
pub enum HotkeyError {
    /// The candidate could not be bound; the previous hotkey was
    /// restored.
    #[error("shortcut registration failed")]
    RegistrationFailed,

    /// Even the hardcoded default could not be bound. Terminal: the
    /// daemon has no active shortcut.
    #[error("default shortcut registration failed")]
    DefaultRegistrationFailed,
}

pub struct HotkeyManager {
    current: HotKey,
    store: Arc<dyn HotkeyStore>,
    registrar: Box<dyn Registrar>,
    registered: bool,
    event_tx: broadcast::Sender<AppEvent>,
}

impl HotkeyManager {
    pub fn new(
        store: Arc<dyn HotkeyStore>,
        registrar: Box<dyn Registrar>,
        event_tx: broadcast::Sender<AppEvent>,
    ) -> Self {
        Self {
            current: HotKey::default(),
            store,
            registrar,
            registered: false,
            event_tx,
        }
    }

    /// Read-only snapshot of the active hotkey.
    pub fn current_hotkey(&self) -> &HotKey {
        &self.current
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Restore the hotkey from the persisted record.
    ///
    /// A record in the legacy layout is migrated: re-persisted in the
    /// current schema so future loads take the fast path. A corrupt
    /// record resets to the default, persisted. No record at all is a
    /// first run: the default applies but is not written until
    /// something actually changes.
    pub fn load(&mut self) {
        let Some(bytes) = self.store.read() else {
            self.current = HotKey::default();
            return;
        };

        match keys::decode_record(&bytes) {
            Some((hotkey, StoredSchema::Current)) => {
                self.current = hotkey;
            }
            Some((hotkey, StoredSchema::Legacy)) => {
                self.current = hotkey;
                self.persist();
                debug!("migrated legacy hotkey record to current schema");
            }
            None => {
                warn!("stored hotkey record is corrupt, resetting to default");
                self.current = HotKey::default();
                self.persist();
            }
        }
    }

    /// Bind the current hotkey with the OS.
    ///
    /// If the stored combination is rejected, fall back to the default,
    /// persist it, and retry. Emits a hotkey-changed event in both the
    /// success and fallback cases. Safe to call again after a hotkey
    /// change; the registrar holds at most one binding.
    pub fn register_hotkey(&mut self) -> Result<(), HotkeyError> {
        if self.registrar.register(&self.current).is_err() {
            error!(
                hotkey = %self.current,
                "failed to register stored shortcut, reverting to default"
            );
            self.current = HotKey::default();
            self.persist();
            self.registrar
                .register(&self.current)
                .map_err(|_| HotkeyError::DefaultRegistrationFailed)?;
        }

        self.registered = true;
        self.notify_change();
        Ok(())
    }

    /// Replace the active hotkey with `candidate`.
    ///
    /// The old binding is torn down before the new one is attempted, so
    /// the same combination is never bound twice. On rejection the old
    /// binding is restored and nothing is persisted or announced.
    pub fn update_hotkey(&mut self, candidate: HotKey) -> Result<HotKey, HotkeyError> {
        let previous = self.current.clone();

        self.registrar.unregister();
        if self.registrar.register(&candidate).is_err() {
            error!(hotkey = %candidate, "system rejected shortcut");
            if self.registrar.register(&previous).is_err() {
                warn!("could not restore previous shortcut after rejection");
            }
            return Err(HotkeyError::RegistrationFailed);
        }

        self.current = candidate.clone();
        self.persist();
        self.notify_change();
        Ok(candidate)
    }

    fn persist(&self) {
        let bytes = match keys::encode_record(&self.current) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to encode hotkey record");
                return;
            }
        };
        if let Err(e) = self.store.write(&bytes) {
            warn!(error = %e, "failed to persist hotkey record");
        }
    }

    fn notify_change(&self) {
        let _ = self.event_tx.send(AppEvent::HotkeyChanged {
            hotkey: self.current.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::hotkey::Modifiers;

    #[derive(Default)]
    struct MemoryStore {
        blob: Mutex<Option<Vec<u8>>>,
    }

    impl MemoryStore {
        fn with_blob(bytes: &[u8]) -> Self {
            Self {
                blob: Mutex::new(Some(bytes.to_vec())),
            }
        }

        fn stored(&self) -> Option<Vec<u8>> {
            self.blob.lock().unwrap().clone()
        }
    }

    impl HotkeyStore for MemoryStore {
        fn read(&self) -> Option<Vec<u8>> {
            self.blob.lock().unwrap().clone()
        }

        fn write(&self, bytes: &[u8]) -> anyhow::Result<()> {
            *self.blob.lock().unwrap() = Some(bytes.to_vec());
            Ok(())
        }
    }

    /// Rejects any combination in its deny list.
    struct FakeRegistrar {
        rejected: Vec<HotKey>,
        bound: Option<HotKey>,
    }

    impl FakeRegistrar {
        fn accepting() -> Self {
            Self {
                rejected: Vec::new(),
                bound: None,
            }
        }

        fn rejecting(hotkeys: Vec<HotKey>) -> Self {
            Self {
                rejected: hotkeys,
                bound: None,
            }
        }
    }

    impl Registrar for FakeRegistrar {
        fn register(&mut self, hotkey: &HotKey) -> Result<(), RegistrationError> {
            if self.rejected.contains(hotkey) {
                return Err(RegistrationError);
            }
            self.bound = Some(hotkey.clone());
            Ok(())
        }

        fn unregister(&mut self) {
            self.bound = None;
        }
    }

    fn manager_with(
        store: Arc<MemoryStore>,
        registrar: FakeRegistrar,
    ) -> (HotkeyManager, broadcast::Receiver<AppEvent>) {
        let (tx, rx) = broadcast::channel(16);
        (
            HotkeyManager::new(store, Box::new(registrar), tx),
            rx,
        )
    }

    fn taken(key_code: u32) -> HotKey {
        HotKey::new(key_code, Modifiers::COMMAND, "X")
    }

    #[test]
    fn test_first_run_uses_default_without_persisting() {
        let store = Arc::new(MemoryStore::default());
        let (mut mgr, _rx) = manager_with(store.clone(), FakeRegistrar::accepting());

        mgr.load();

        assert_eq!(mgr.current_hotkey(), &HotKey::default());
        assert!(store.stored().is_none());
    }

    #[test]
    fn test_load_current_schema() {
        let hk = HotKey::new(40, Modifiers::CONTROL, "K");
        let store = Arc::new(MemoryStore::with_blob(&keys::encode_record(&hk).unwrap()));
        let (mut mgr, _rx) = manager_with(store, FakeRegistrar::accepting());

        mgr.load();

        assert_eq!(mgr.current_hotkey(), &hk);
    }

    #[test]
    fn test_load_legacy_schema_migrates() {
        let legacy = br#"{"keyCode":40,"modifiers":4096,"keyEquivalent":"k"}"#;
        let store = Arc::new(MemoryStore::with_blob(legacy));
        let (mut mgr, _rx) = manager_with(store.clone(), FakeRegistrar::accepting());

        mgr.load();

        assert_eq!(
            mgr.current_hotkey(),
            &HotKey::new(40, Modifiers::CONTROL, "K")
        );
        // re-persisted in current schema
        let rewritten = store.stored().unwrap();
        let (_, schema) = keys::decode_record(&rewritten).unwrap();
        assert_eq!(schema, StoredSchema::Current);
    }

    #[test]
    fn test_load_corrupt_record_resets_and_persists_default() {
        let store = Arc::new(MemoryStore::with_blob(b"{\"broken\":true}"));
        let (mut mgr, _rx) = manager_with(store.clone(), FakeRegistrar::accepting());

        mgr.load();

        assert_eq!(mgr.current_hotkey(), &HotKey::default());
        let rewritten = store.stored().unwrap();
        let (decoded, _) = keys::decode_record(&rewritten).unwrap();
        assert_eq!(decoded, HotKey::default());
    }

    #[test]
    fn test_register_falls_back_to_default_on_failure() {
        let stored = HotKey::new(40, Modifiers::CONTROL, "K");
        let store = Arc::new(MemoryStore::with_blob(
            &keys::encode_record(&stored).unwrap(),
        ));
        let registrar = FakeRegistrar::rejecting(vec![stored]);
        let (mut mgr, mut rx) = manager_with(store.clone(), registrar);

        mgr.load();
        mgr.register_hotkey().unwrap();

        assert_eq!(mgr.current_hotkey(), &HotKey::default());
        assert!(mgr.is_registered());
        // fallback is persisted
        let (decoded, _) = keys::decode_record(&store.stored().unwrap()).unwrap();
        assert_eq!(decoded, HotKey::default());
        // change announced
        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::HotkeyChanged { .. }
        ));
    }

    #[test]
    fn test_register_default_also_failing_is_terminal() {
        let store = Arc::new(MemoryStore::default());
        let registrar = FakeRegistrar::rejecting(vec![HotKey::default()]);
        let (mut mgr, _rx) = manager_with(store, registrar);

        mgr.load();
        assert!(matches!(
            mgr.register_hotkey(),
            Err(HotkeyError::DefaultRegistrationFailed)
        ));
        assert!(!mgr.is_registered());
    }

    #[test]
    fn test_update_hotkey_success_persists_and_announces() {
        let store = Arc::new(MemoryStore::default());
        let (mut mgr, mut rx) = manager_with(store.clone(), FakeRegistrar::accepting());
        mgr.load();
        mgr.register_hotkey().unwrap();
        let _ = rx.try_recv();

        let candidate = HotKey::new(1, Modifiers::COMMAND | Modifiers::SHIFT, "S");
        let applied = mgr.update_hotkey(candidate.clone()).unwrap();

        assert_eq!(applied, candidate);
        assert_eq!(mgr.current_hotkey(), &candidate);
        let (decoded, _) = keys::decode_record(&store.stored().unwrap()).unwrap();
        assert_eq!(decoded, candidate);
        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::HotkeyChanged { .. }
        ));
    }

    #[test]
    fn test_update_hotkey_rejection_rolls_back() {
        let store = Arc::new(MemoryStore::default());
        let registrar = FakeRegistrar::rejecting(vec![taken(1)]);
        let (mut mgr, mut rx) = manager_with(store.clone(), registrar);
        mgr.load();
        mgr.register_hotkey().unwrap();
        let _ = rx.try_recv();

        let before = mgr.current_hotkey().clone();
        let result = mgr.update_hotkey(taken(1));

        assert!(matches!(result, Err(HotkeyError::RegistrationFailed)));
        assert_eq!(mgr.current_hotkey(), &before);
        // nothing persisted, nothing announced
        assert!(store.stored().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_manager_not_wedged_after_rejection() {
        let store = Arc::new(MemoryStore::default());
        let registrar = FakeRegistrar::rejecting(vec![taken(1)]);
        let (mut mgr, _rx) = manager_with(store, registrar);
        mgr.load();
        mgr.register_hotkey().unwrap();

        assert!(mgr.update_hotkey(taken(1)).is_err());

        let good = HotKey::new(2, Modifiers::COMMAND, "D");
        assert_eq!(mgr.update_hotkey(good.clone()).unwrap(), good);
        assert_eq!(mgr.current_hotkey(), &good);
    }
}
