//! Rows shown by the widget, and the timeline snapshot it reads.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::format::{self, Locale};
use crate::service::BatteryReading;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetRow {
    pub title: String,
    pub value: String,
}

impl WidgetRow {
    fn new(title: &str, value: String) -> Self {
        Self {
            title: title.into(),
            value,
        }
    }
}

/// Formatted rows for one reading. Missing values show as placeholders.
pub fn rows(reading: &BatteryReading, locale: &Locale) -> Vec<WidgetRow> {
    let state = reading.state();
    vec![
        WidgetRow::new("Power Source", reading.power_source().label().into()),
        WidgetRow::new(
            "Time Remaining",
            format::time_remaining(reading.time_remaining_minutes, state.as_ref()),
        ),
        WidgetRow::new("Percentage", format::percentage(reading.percentage, locale)),
        WidgetRow::new("Charge", format::charge(reading)),
        WidgetRow::new("Power Usage", format::power_usage(reading)),
        WidgetRow::new("Temperature", format::temperature(reading)),
        WidgetRow::new("Cycle Count", format::cycle_count(reading)),
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub date: DateTime<Utc>,
    pub rows: Vec<WidgetRow>,
}

/// Entries the widget shows until it asks for a new timeline.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// `count` entries `spacing_minutes` apart, starting at `now`.
    pub fn build(
        now: DateTime<Utc>,
        count: u32,
        spacing_minutes: u32,
        rows: &[WidgetRow],
    ) -> Self {
        let entries = (0..count.max(1))
            .map(|i| TimelineEntry {
                date: now + Duration::minutes(i64::from(i) * i64::from(spacing_minutes)),
                rows: rows.to_vec(),
            })
            .collect();
        Self {
            generated_at: now,
            entries,
        }
    }

    /// Write the timeline as JSON, replacing the file atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), entries = self.entries.len(), "widget snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Percentage;
    use chrono::TimeZone;

    fn sample() -> BatteryReading {
        BatteryReading {
            is_plugged: Some(false),
            is_charging: Some(false),
            is_charged: Some(false),
            percentage: Percentage::known(42),
            time_remaining_minutes: Some(125),
            current_charge_mah: Some(2000),
            max_capacity_mah: Some(4000),
            cycle_count: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_rows() {
        let rows = rows(&sample(), &Locale::default());
        let pairs: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.title.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Power Source", "Battery"),
                ("Time Remaining", "2h 05m"),
                ("Percentage", "42%"),
                ("Charge", "2000 / 4000 mAh"),
                ("Power Usage", "--"),
                ("Temperature", "--"),
                ("Cycle Count", "7"),
            ]
        );
    }

    #[test]
    fn test_rows_without_reading() {
        let rows = rows(&BatteryReading::default(), &Locale::default());
        assert_eq!(rows[0].value, "Unknown");
        assert_eq!(rows[1].value, "Calculating");
        assert_eq!(rows[2].value, "Calculating");
        assert!(rows[3..].iter().all(|r| r.value == "--"));
    }

    #[test]
    fn test_timeline_spacing() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let rows = rows(&sample(), &Locale::default());
        let timeline = Timeline::build(now, 5, 10, &rows);

        assert_eq!(timeline.entries.len(), 5);
        assert_eq!(timeline.entries[0].date, now);
        assert_eq!(
            timeline.entries[4].date,
            Utc.with_ymd_and_hms(2026, 1, 1, 12, 40, 0).unwrap()
        );
        assert_eq!(Timeline::build(now, 0, 10, &rows).entries.len(), 1);
    }

    #[test]
    fn test_timeline_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.json");
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let timeline = Timeline::build(now, 2, 10, &rows(&sample(), &Locale::default()));
        timeline.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["entries"].as_array().unwrap().len(), 2);
        assert_eq!(value["entries"][0]["rows"][2]["value"], "42%");
        assert_eq!(value["generated_at"], "2026-01-01T12:00:00Z");
    }
}
