//! Clean-success notification delivery
//!
//! Gated on the user preference; delivery itself goes through a trait
//! so tests can observe posts. Failures are logged, never surfaced —
//! a missed notification is not worth interrupting anything.

use tracing::debug;

/// Delivery backend for user notifications.
pub trait Notifier: Send {
    fn post(&self, title: &str, body: &str);
}

/// Posts through the system notification center via `osascript`.
/// Authorization prompting is the preferences UI's problem; an
/// unauthorized post is silently dropped by the OS.
#[cfg(target_os = "macos")]
pub struct SystemNotifier;

#[cfg(target_os = "macos")]
impl Notifier for SystemNotifier {
    fn post(&self, title: &str, body: &str) {
        use tracing::warn;

        let script = format!(
            r#"display notification "{}" with title "{}""#,
            escape(body),
            escape(title)
        );

        match std::process::Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .spawn()
        {
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to post notification"),
        }
    }
}

/// Logs instead of posting, for platforms without a delivery path.
#[cfg(not(target_os = "macos"))]
pub struct SystemNotifier;

#[cfg(not(target_os = "macos"))]
impl Notifier for SystemNotifier {
    fn post(&self, title: &str, body: &str) {
        debug!(title, body, "notification suppressed on this platform");
    }
}

#[cfg(target_os = "macos")]
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Fires the "clipboard cleaned" notification when the preference
/// allows it.
pub struct Dispatcher {
    notifier: Box<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn post_clean_success(&self, enabled: bool) {
        if !enabled {
            debug!("clean notification disabled by preference");
            return;
        }

        self.notifier
            .post("Clipboard cleaned", "Formatting removed, plain text kept.");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        posts: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Notifier for RecordingNotifier {
        fn post(&self, title: &str, body: &str) {
            self.posts
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }

    #[test]
    fn test_post_when_enabled() {
        let notifier = RecordingNotifier::default();
        let dispatcher = Dispatcher::new(Box::new(notifier.clone()));

        dispatcher.post_clean_success(true);

        let posts = notifier.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "Clipboard cleaned");
    }

    #[test]
    fn test_suppressed_when_disabled() {
        let notifier = RecordingNotifier::default();
        let dispatcher = Dispatcher::new(Box::new(notifier.clone()));

        dispatcher.post_clean_success(false);

        assert!(notifier.posts.lock().unwrap().is_empty());
    }
}
