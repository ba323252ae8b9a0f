use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::format::Locale;
use crate::state::DRAWING_GRANULARITY;

#[derive(Debug, Default, Deserialize)]
pub struct JuiceConfig {
    #[serde(default)]
    pub poll: Poll,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub widget: Widget,
}

#[derive(Debug, Deserialize)]
pub struct Poll {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Display {
    #[serde(default = "default_granularity")]
    pub drawing_granularity: f64,
    /// Overrides the locale taken from the environment.
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Widget {
    pub snapshot_path: Option<PathBuf>,
    #[serde(default = "default_entries")]
    pub entries: u32,
    #[serde(default = "default_spacing_minutes")]
    pub spacing_minutes: u32,
}

fn default_interval_secs() -> u64 {
    5
}

fn default_granularity() -> f64 {
    DRAWING_GRANULARITY
}

fn default_entries() -> u32 {
    5
}

fn default_spacing_minutes() -> u32 {
    10
}

impl Default for Poll {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for Display {
    fn default() -> Self {
        Self {
            drawing_granularity: default_granularity(),
            locale: None,
        }
    }
}

impl Default for Widget {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            entries: default_entries(),
            spacing_minutes: default_spacing_minutes(),
        }
    }
}

impl JuiceConfig {
    pub fn poll_interval(&self) -> Duration {
        if self.poll.interval_secs == 0 {
            return Duration::from_secs(default_interval_secs());
        }
        Duration::from_secs(self.poll.interval_secs)
    }

    pub fn drawing_granularity(&self) -> f64 {
        let g = self.display.drawing_granularity;
        if g.is_finite() && g > 0.0 {
            g
        } else {
            DRAWING_GRANULARITY
        }
    }

    pub fn locale(&self) -> Locale {
        match self.display.locale {
            Some(ref id) => Locale::parse(id),
            None => Locale::from_env(),
        }
    }

    /// Where the widget snapshot is written (default ~/.juice/widget.json).
    pub fn snapshot_path(&self) -> PathBuf {
        self.widget
            .snapshot_path
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".juice/widget.json")))
            .unwrap_or_else(|| PathBuf::from("widget.json"))
    }
}

/// Parse a config file's content.
pub fn parse(content: &str) -> Result<JuiceConfig, toml::de::Error> {
    toml::from_str::<JuiceConfig>(content)
}

/// Read and parse one config file.
pub fn from_file(path: &Path) -> crate::error::Result<JuiceConfig> {
    let content = fs::read_to_string(path)?;
    Ok(parse(&content)?)
}

/// Load the juice config file.
/// Search order:
///   1. JUICE_CONFIG env var
///   2. ~/.juice/config.toml
///   3. Default values
///
/// An unreadable candidate is logged and the next one is tried.
pub fn load() -> JuiceConfig {
    let candidates = [
        std::env::var("JUICE_CONFIG").ok().map(PathBuf::from),
        dirs::home_dir().map(|h| h.join(".juice/config.toml")),
    ];

    let found = candidates
        .into_iter()
        .flatten()
        .filter(|path| path.exists())
        .find_map(|path| match from_file(&path) {
            Ok(config) => {
                info!(
                    path = %path.display(),
                    interval_secs = config.poll.interval_secs,
                    "loaded juice config"
                );
                Some(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping config");
                None
            }
        });

    found.unwrap_or_else(|| {
        info!("no config file found, using defaults");
        JuiceConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JuiceError;

    #[test]
    fn test_defaults() {
        let cfg = JuiceConfig::default();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.drawing_granularity(), 5.4);
        assert_eq!(cfg.widget.entries, 5);
        assert_eq!(cfg.widget.spacing_minutes, 10);
    }

    #[test]
    fn test_parse_full() {
        let cfg = parse(
            r#"
[poll]
interval_secs = 30

[display]
drawing_granularity = 10.0
locale = "fr_FR"

[widget]
snapshot_path = "/tmp/juice.json"
entries = 3
"#,
        )
        .unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(30));
        assert_eq!(cfg.drawing_granularity(), 10.0);
        assert_eq!(cfg.locale().language(), "fr");
        assert_eq!(cfg.snapshot_path(), PathBuf::from("/tmp/juice.json"));
        assert_eq!(cfg.widget.entries, 3);
        assert_eq!(cfg.widget.spacing_minutes, 10);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = parse("[poll]\ninterval_secs = 0\n[display]\ndrawing_granularity = -1.0\n").unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.drawing_granularity(), DRAWING_GRANULARITY);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[poll]\ninterval_secs = 12\n").unwrap();
        assert_eq!(from_file(&path).unwrap().poll_interval(), Duration::from_secs(12));

        fs::write(&path, "[poll]\ninterval_secs = \"soon\"\n").unwrap();
        assert!(matches!(from_file(&path), Err(JuiceError::TomlDe(_))));
        assert!(matches!(
            from_file(&dir.path().join("absent.toml")),
            Err(JuiceError::Io(_))
        ));
    }
}
