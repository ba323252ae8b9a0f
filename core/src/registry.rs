//! Read-only access to the power-management registry.
//!
//! On macOS the smart battery's properties come from `ioreg` and the
//! power-source summary (percentage, time estimate) from `pmset`. Both are
//! parsed from their text output so the parsers can be tested anywhere.

use std::collections::HashMap;
use std::process::Command;

use tracing::{debug, warn};

/// Name of the IOService that exposes the smart battery.
pub const BATTERY_SERVICE: &str = "AppleSmartBattery";

/// Registry reports "no estimate" for time fields with this sentinel.
const TIME_UNAVAILABLE: i64 = 65535;

/// Keys looked up in the smart battery's registry dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKey {
    IsPlugged,
    IsCharging,
    FullyCharged,
    CurrentCapacity,
    MaxCapacity,
    RawCurrentCapacity,
    RawMaxCapacity,
    CycleCount,
    Temperature,
    Voltage,
    Amperage,
    TimeRemaining,
}

impl RegistryKey {
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsPlugged => "ExternalConnected",
            Self::IsCharging => "IsCharging",
            Self::FullyCharged => "FullyCharged",
            Self::CurrentCapacity => "CurrentCapacity",
            Self::MaxCapacity => "MaxCapacity",
            Self::RawCurrentCapacity => "AppleRawCurrentCapacity",
            Self::RawMaxCapacity => "AppleRawMaxCapacity",
            Self::CycleCount => "CycleCount",
            Self::Temperature => "Temperature",
            Self::Voltage => "Voltage",
            Self::Amperage => "Amperage",
            Self::TimeRemaining => "TimeRemaining",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl RegistryValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Top-level properties of the battery service, keyed by registry name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    properties: HashMap<String, RegistryValue>,
}

impl RegistrySnapshot {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn insert(&mut self, key: RegistryKey, value: RegistryValue) {
        self.properties.insert(key.name().to_string(), value);
    }

    pub fn get(&self, key: RegistryKey) -> Option<&RegistryValue> {
        self.properties.get(key.name())
    }

    pub fn bool(&self, key: RegistryKey) -> Option<bool> {
        self.get(key).and_then(RegistryValue::as_bool)
    }

    pub fn int(&self, key: RegistryKey) -> Option<i64> {
        self.get(key).and_then(RegistryValue::as_int)
    }

    /// Time field in minutes, with the registry's "unavailable" sentinel mapped to `None`.
    pub fn minutes(&self, key: RegistryKey) -> Option<u32> {
        match self.int(key)? {
            m if (0..TIME_UNAVAILABLE).contains(&m) => Some(m as u32),
            _ => None,
        }
    }
}

/// Estimate of the time remaining as reported by the power-source summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEstimate {
    /// Still calculating.
    Unknown,
    /// Connected to external power; the registry knows the time until full.
    Unlimited,
    Minutes(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSourceSummary {
    pub percentage: Option<i64>,
    pub estimate: TimeEstimate,
}

impl Default for PowerSourceSummary {
    fn default() -> Self {
        Self {
            percentage: None,
            estimate: TimeEstimate::Unknown,
        }
    }
}

/// Source of raw battery readings.
pub trait PowerRegistry {
    /// Open a connection to the battery service. `Err` carries the reason no
    /// service matched.
    fn connect(&mut self) -> Result<(), String>;

    /// Release the connection. Returns false if the handle could not be released.
    fn release(&mut self) -> bool;

    /// Properties of the connected battery service.
    fn properties(&mut self) -> RegistrySnapshot;

    /// Power-source summary: percentage and time estimate.
    fn power_source(&mut self) -> PowerSourceSummary;
}

/// Parse the property block printed by `ioreg -rn AppleSmartBattery`.
///
/// Only top-level `"Key" = value` lines are kept. Nested dictionaries and
/// arrays are stored as text. Unsigned values above `i64::MAX` (negative
/// amperage) are reinterpreted as two's complement.
pub fn parse_ioreg(output: &str) -> RegistrySnapshot {
    let mut properties = HashMap::new();

    for line in output.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('"') else {
            continue;
        };
        let Some((key, value)) = rest.split_once("\" = ") else {
            continue;
        };
        let value = value.trim();

        let parsed = match value {
            "Yes" => RegistryValue::Bool(true),
            "No" => RegistryValue::Bool(false),
            v => match v.parse::<i64>() {
                Ok(i) => RegistryValue::Int(i),
                Err(_) => match v.parse::<u64>() {
                    Ok(u) => RegistryValue::Int(u as i64),
                    Err(_) => RegistryValue::Text(v.trim_matches('"').to_string()),
                },
            },
        };
        properties.insert(key.to_string(), parsed);
    }

    RegistrySnapshot { properties }
}

/// Parse `pmset -g batt` output.
///
/// ```text
/// Now drawing from 'Battery Power'
///  -InternalBattery-0 (id=4653155)	85%; discharging; 4:12 remaining present: true
/// ```
pub fn parse_pmset(output: &str) -> PowerSourceSummary {
    let on_ac = output.contains("'AC Power'");
    let Some(line) = output.lines().find(|l| l.contains("InternalBattery")) else {
        return PowerSourceSummary {
            percentage: None,
            estimate: if on_ac {
                TimeEstimate::Unlimited
            } else {
                TimeEstimate::Unknown
            },
        };
    };

    let percentage = line
        .split_whitespace()
        .find(|w| w.ends_with("%;") || w.ends_with('%'))
        .and_then(|w| w.trim_end_matches(';').trim_end_matches('%').parse::<i64>().ok());

    let estimate = if on_ac {
        TimeEstimate::Unlimited
    } else {
        line.split_whitespace()
            .zip(line.split_whitespace().skip(1))
            .find(|(_, next)| *next == "remaining")
            .and_then(|(time, _)| parse_hours_minutes(time))
            .map(TimeEstimate::Minutes)
            .unwrap_or(TimeEstimate::Unknown)
    };

    PowerSourceSummary {
        percentage,
        estimate,
    }
}

fn parse_hours_minutes(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    Some(h.parse::<u32>().ok()? * 60 + m.parse::<u32>().ok()?)
}

/// Registry backed by the system's `ioreg` and `pmset` tools.
#[derive(Debug, Default)]
pub struct SystemRegistry {
    snapshot: Option<RegistrySnapshot>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PowerRegistry for SystemRegistry {
    fn connect(&mut self) -> Result<(), String> {
        let output = Command::new("ioreg")
            .args(["-rn", BATTERY_SERVICE])
            .output()
            .map_err(|e| format!("failed to run ioreg: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("ioreg failed: {}", stderr.trim()));
        }

        let snapshot = parse_ioreg(&String::from_utf8_lossy(&output.stdout));
        if snapshot.is_empty() {
            return Err(format!("no {BATTERY_SERVICE} service registered"));
        }

        debug!(service = BATTERY_SERVICE, "battery service opened");
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn release(&mut self) -> bool {
        self.snapshot = None;
        true
    }

    fn properties(&mut self) -> RegistrySnapshot {
        self.snapshot.clone().unwrap_or_default()
    }

    fn power_source(&mut self) -> PowerSourceSummary {
        match power_source_output() {
            Some(text) => parse_pmset(&text),
            None => PowerSourceSummary::default(),
        }
    }
}

/// Raw `pmset -g batt` output, used both for parsing and as a cheap change
/// fingerprint by the watcher.
pub fn power_source_output() -> Option<String> {
    match Command::new("pmset").args(["-g", "batt"]).output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(stderr = %stderr.trim(), "pmset failed");
            None
        }
        Err(e) => {
            debug!(error = %e, "pmset unavailable");
            None
        }
    }
}
