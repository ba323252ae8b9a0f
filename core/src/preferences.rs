use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{JuiceError, Result};
use crate::notification::LastNotified;

/// User-editable settings, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Preferences {
    /// Show the remaining time instead of the percentage while on battery.
    #[serde(default = "default_true")]
    pub show_time_on_battery: bool,
    /// Show the time until full instead of the percentage while charging.
    #[serde(default = "default_true")]
    pub show_time_charging: bool,
    #[serde(default)]
    pub hide_menubar_info: bool,
    #[serde(default)]
    pub hide_battery_icon: bool,
    #[serde(default = "default_thresholds")]
    pub notification_thresholds: BTreeSet<u8>,
    /// Threshold of the last posted notification. `0` is read as "never".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_notified: Option<u8>,
}

fn default_true() -> bool {
    true
}

fn default_thresholds() -> BTreeSet<u8> {
    BTreeSet::from([15])
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_time_on_battery: true,
            show_time_charging: true,
            hide_menubar_info: false,
            hide_battery_icon: false,
            notification_thresholds: default_thresholds(),
            last_notified: None,
        }
    }
}

impl Preferences {
    /// Preferences file location.
    /// Search order:
    ///   1. JUICE_PREFERENCES env var
    ///   2. ~/.juice/preferences.toml
    pub fn path() -> PathBuf {
        std::env::var("JUICE_PREFERENCES")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".juice/preferences.toml")))
            .unwrap_or_else(|| PathBuf::from("preferences.toml"))
    }

    /// Read and validate the preferences file.
    ///
    /// Thresholds outside `1..=100` are dropped with a warning.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut prefs: Preferences = toml::from_str(&content)?;

        let before = prefs.notification_thresholds.len();
        prefs
            .notification_thresholds
            .retain(|t| (1..=100).contains(t));
        if prefs.notification_thresholds.len() != before {
            warn!(
                path = %path.display(),
                dropped = before - prefs.notification_thresholds.len(),
                "ignoring notification thresholds outside 1..=100"
            );
        }
        Ok(prefs)
    }

    /// Load preferences, falling back to defaults when the file is missing
    /// or cannot be parsed.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no preferences file, using defaults");
            return Self::default();
        }

        match Self::read(path) {
            Ok(prefs) => {
                info!(
                    path = %path.display(),
                    thresholds = ?prefs.notification_thresholds,
                    "loaded preferences"
                );
                prefs
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load preferences");
                Self::default()
            }
        }
    }

    /// Write the preferences, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "saved preferences");
        Ok(())
    }

    pub fn last_notified(&self) -> LastNotified {
        match self.last_notified {
            None | Some(0) => LastNotified::NotNotified,
            Some(t) => LastNotified::NotifiedAt(t),
        }
    }

    pub fn set_last_notified(&mut self, last: LastNotified) {
        self.last_notified = match last {
            LastNotified::NotNotified => None,
            LastNotified::NotifiedAt(t) => Some(t),
        };
    }

    /// Add a notification threshold. Returns false if it was already set.
    pub fn add_threshold(&mut self, percentage: u8) -> Result<bool> {
        if percentage == 0 || percentage > 100 {
            return Err(JuiceError::InvalidThreshold(percentage));
        }
        Ok(self.notification_thresholds.insert(percentage))
    }

    /// Remove a notification threshold. Returns false if it was not set.
    pub fn remove_threshold(&mut self, percentage: u8) -> bool {
        self.notification_thresholds.remove(&percentage)
    }

    /// Flip a threshold on or off. Returns whether it is now enabled.
    pub fn toggle_threshold(&mut self, percentage: u8) -> Result<bool> {
        if self.remove_threshold(percentage) {
            return Ok(false);
        }
        self.add_threshold(percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert!(prefs.show_time_on_battery);
        assert!(prefs.show_time_charging);
        assert!(!prefs.hide_menubar_info);
        assert!(!prefs.hide_battery_icon);
        assert_eq!(prefs.notification_thresholds, BTreeSet::from([15]));
        assert_eq!(prefs.last_notified(), LastNotified::NotNotified);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let prefs: Preferences = toml::from_str(
            "hide_battery_icon = true\nnotification_thresholds = [80, 15, 40, 100]\nlast_notified = 0\n",
        )
        .unwrap();
        assert!(prefs.hide_battery_icon);
        assert!(prefs.show_time_on_battery);
        assert_eq!(
            prefs.notification_thresholds.iter().copied().collect::<Vec<_>>(),
            vec![15, 40, 80, 100]
        );
        assert_eq!(prefs.last_notified(), LastNotified::NotNotified);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/preferences.toml");

        let mut prefs = Preferences::default();
        prefs.show_time_charging = false;
        prefs.add_threshold(40).unwrap();
        prefs.set_last_notified(LastNotified::NotifiedAt(40));
        prefs.save(&path).unwrap();

        let loaded = Preferences::load(&path);
        assert_eq!(loaded, prefs);
        assert_eq!(loaded.last_notified(), LastNotified::NotifiedAt(40));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_missing_or_corrupt_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert_eq!(Preferences::load(&missing), Preferences::default());

        let corrupt = dir.path().join("corrupt.toml");
        fs::write(&corrupt, "notification_thresholds = \"lots\"").unwrap();
        assert_eq!(Preferences::load(&corrupt), Preferences::default());
    }

    #[test]
    fn test_out_of_range_thresholds_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "notification_thresholds = [0, 15, 100, 150]\n").unwrap();

        let prefs = Preferences::load(&path);
        assert_eq!(prefs.notification_thresholds, BTreeSet::from([15, 100]));

        fs::write(&path, "notification_thresholds = [0, 150]\n").unwrap();
        assert!(Preferences::load(&path).notification_thresholds.is_empty());
    }

    #[test]
    fn test_read_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Preferences::read(&dir.path().join("absent.toml")),
            Err(JuiceError::Io(_))
        ));

        let corrupt = dir.path().join("corrupt.toml");
        fs::write(&corrupt, "hide_battery_icon = \"maybe\"").unwrap();
        assert!(matches!(Preferences::read(&corrupt), Err(JuiceError::TomlDe(_))));
    }

    #[test]
    fn test_threshold_editing() {
        let mut prefs = Preferences::default();
        assert!(prefs.add_threshold(80).unwrap());
        assert!(!prefs.add_threshold(80).unwrap());
        assert!(matches!(
            prefs.add_threshold(0),
            Err(JuiceError::InvalidThreshold(0))
        ));
        assert!(matches!(
            prefs.add_threshold(101),
            Err(JuiceError::InvalidThreshold(101))
        ));
        assert!(prefs.remove_threshold(15));
        assert!(!prefs.remove_threshold(15));

        assert!(prefs.toggle_threshold(5).unwrap());
        assert!(!prefs.toggle_threshold(5).unwrap());
        assert_eq!(prefs.notification_thresholds, BTreeSet::from([80]));
    }
}
