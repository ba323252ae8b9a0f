//! Threshold notifications.
//!
//! The gate is a pure function: it takes the current state, the configured
//! thresholds and the last notified threshold, and returns the notification
//! to post (if any). The caller persists [`StatusNotification::commit`] only
//! after the post succeeded.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{JuiceError, Result};
use crate::format::{self, Locale};
use crate::state::{BatteryState, Percentage};

/// Threshold of a fully charged battery.
pub const FULLY_CHARGED: u8 = 100;

/// The most recently notified threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LastNotified {
    #[default]
    NotNotified,
    NotifiedAt(u8),
}

/// A notification ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusNotification {
    pub threshold: u8,
    pub title: String,
    pub body: String,
}

impl StatusNotification {
    fn new(threshold: u8, locale: &Locale) -> Self {
        if threshold == FULLY_CHARGED {
            return Self {
                threshold,
                title: "Charged".into(),
                body: "Your battery is now fully charged.".into(),
            };
        }
        Self {
            threshold,
            title: format!(
                "Low Battery: {}",
                format::percentage(Percentage::known(threshold), locale)
            ),
            body: "Your Mac will sleep soon unless plugged into a power outlet.".into(),
        }
    }

    /// The value to persist once this notification has been delivered.
    pub fn commit(&self) -> LastNotified {
        LastNotified::NotifiedAt(self.threshold)
    }
}

/// Percentage a state could notify about.
///
/// Charging states never notify, which also covers the transient
/// `Charging(0)` reading seen while the adapter is being connected.
fn candidate(state: &BatteryState) -> Option<u8> {
    match state {
        BatteryState::ChargedAndPlugged => Some(FULLY_CHARGED),
        BatteryState::Discharging(p) => p.value(),
        BatteryState::Charging(_) => None,
    }
}

/// Decide whether the current state warrants a notification.
///
/// Fires only when the percentage equals a configured threshold exactly and
/// that threshold is not the one notified last.
pub fn evaluate(
    state: Option<&BatteryState>,
    thresholds: &BTreeSet<u8>,
    last: LastNotified,
    locale: &Locale,
) -> Option<StatusNotification> {
    let percentage = candidate(state?)?;

    if !thresholds.contains(&percentage) {
        return None;
    }
    if last == LastNotified::NotifiedAt(percentage) {
        debug!(threshold = percentage, "already notified");
        return None;
    }

    Some(StatusNotification::new(percentage, locale))
}

/// Delivers notifications to the user.
pub trait Notifier {
    fn post(&self, title: &str, body: &str) -> Result<()>;
}

/// Post `notification` and return the new last-notified value.
///
/// On failure the error is returned and the caller keeps its old value, so
/// the same threshold is retried on the next poll.
pub fn deliver(notification: &StatusNotification, notifier: &dyn Notifier) -> Result<LastNotified> {
    notifier.post(&notification.title, &notification.body)?;
    info!(threshold = notification.threshold, title = %notification.title, "notification posted");
    Ok(notification.commit())
}

/// Native notifications via `osascript`, which avoids needing notification
/// centre entitlements.
#[derive(Debug, Default)]
pub struct OsascriptNotifier;

impl OsascriptNotifier {
    pub fn new() -> Self {
        Self
    }
}

/// AppleScript source that displays a notification.
pub fn applescript(title: &str, body: &str) -> String {
    // Strip characters that would break out of the string literals
    let clean = |s: &str| s.replace('"', "'").replace('\\', "");
    format!(
        "display notification \"{}\" with title \"{}\"",
        clean(body),
        clean(title)
    )
}

impl Notifier for OsascriptNotifier {
    #[cfg(target_os = "macos")]
    fn post(&self, title: &str, body: &str) -> Result<()> {
        let output = std::process::Command::new("osascript")
            .args(["-e", &applescript(title, body)])
            .output()
            .map_err(|e| JuiceError::Notification(format!("failed to run osascript: {e}")))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(JuiceError::Notification(format!("osascript failed: {}", stderr.trim())))
    }

    #[cfg(not(target_os = "macos"))]
    fn post(&self, _title: &str, _body: &str) -> Result<()> {
        Err(JuiceError::Notification(
            "notifications not implemented on this platform".into(),
        ))
    }
}
