//! Change notifications for the main thread.
//!
//! A [`Watcher`] samples a power-source fingerprint and the preferences
//! file on a background thread and reports changes over a channel. It only
//! detects changes; the receiver re-reads the battery itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use crossbeam_channel::Sender;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JuiceEvent {
    /// The power source reported something new; poll the battery.
    PowerSourceChanged,
    /// The preferences file was modified.
    PreferencesChanged,
}

pub struct Watcher {
    interval: Duration,
    preferences: Option<PathBuf>,
}

impl Watcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            preferences: None,
        }
    }

    /// Also report modifications of this file.
    pub fn watch_preferences(mut self, path: PathBuf) -> Self {
        self.preferences = Some(path);
        self
    }

    /// Start watching. `fingerprint` is sampled every interval; any change in
    /// its value is reported as [`JuiceEvent::PowerSourceChanged`], and the
    /// first sample always is. The thread exits once `tx` is disconnected.
    pub fn spawn<F>(self, mut fingerprint: F, tx: Sender<JuiceEvent>) -> JoinHandle<()>
    where
        F: FnMut() -> Option<String> + Send + 'static,
    {
        std::thread::spawn(move || {
            let mut last_fingerprint: Option<Option<String>> = None;
            let mut last_modified = self.preferences.as_deref().and_then(modified);

            loop {
                let current = fingerprint();
                if last_fingerprint.as_ref() != Some(&current) {
                    debug!("power source changed");
                    if tx.send(JuiceEvent::PowerSourceChanged).is_err() {
                        break;
                    }
                    last_fingerprint = Some(current);
                }

                if let Some(ref path) = self.preferences {
                    let current = modified(path);
                    if current != last_modified {
                        debug!(path = %path.display(), "preferences changed");
                        if tx.send(JuiceEvent::PreferencesChanged).is_err() {
                            break;
                        }
                        last_modified = current;
                    }
                }

                std::thread::sleep(self.interval);
            }

            info!("event receiver dropped, watcher stopped");
        })
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_reports_first_sample_and_changes_only() {
        let (tx, rx) = unbounded();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        // a, a, b, b, ..., then a new value every call so the thread notices
        // the dropped receiver
        let handle = Watcher::new(Duration::from_millis(1)).spawn(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let value = match n {
                    0..2 => "a".to_string(),
                    2..200 => "b".to_string(),
                    n => n.to_string(),
                };
                Some(value)
            },
            tx,
        );

        let timeout = Duration::from_secs(5);
        assert_eq!(rx.recv_timeout(timeout), Ok(JuiceEvent::PowerSourceChanged));
        assert_eq!(rx.recv_timeout(timeout), Ok(JuiceEvent::PowerSourceChanged));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(calls.load(Ordering::SeqCst) > 3);

        drop(rx);
        handle.join().unwrap();
    }

    #[test]
    fn test_reports_preferences_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");

        let (tx, rx) = unbounded();
        let handle = Watcher::new(Duration::from_millis(5))
            .watch_preferences(path.clone())
            .spawn(|| None, tx);

        let timeout = Duration::from_secs(5);
        assert_eq!(rx.recv_timeout(timeout), Ok(JuiceEvent::PowerSourceChanged));

        // creating the file changes its mtime from "absent"
        fs::write(&path, "hide_battery_icon = true\n").unwrap();
        assert_eq!(rx.recv_timeout(timeout), Ok(JuiceEvent::PreferencesChanged));

        drop(rx);
        fs::remove_file(&path).unwrap();
        handle.join().unwrap();
    }
}
