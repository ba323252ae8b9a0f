//! Human-readable strings for the menu bar, the menu and the widget.

use crate::preferences::Preferences;
use crate::service::BatteryReading;
use crate::state::{BatteryState, Percentage};

pub const CALCULATING: &str = "Calculating";
pub const CHARGED: &str = "Charged";
pub const PLACEHOLDER: &str = "--";

/// How a locale writes a percent sign next to a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PercentStyle {
    /// `42%`
    Suffix,
    /// `42 %` with a no-break space
    SpacedSuffix,
    /// `%42`
    Prefix,
}

/// Language used for number formatting, e.g. `en` from `en_US.UTF-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    language: String,
}

impl Locale {
    /// Parse a POSIX or BCP 47 locale identifier (`fr_FR.UTF-8`, `de-DE`).
    pub fn parse(id: &str) -> Self {
        let language = id
            .split(['_', '-', '.', '@'])
            .next()
            .filter(|l| !l.is_empty() && *l != "C" && *l != "POSIX")
            .unwrap_or("en")
            .to_ascii_lowercase();
        Self { language }
    }

    /// Locale from `LC_ALL`, `LC_MESSAGES` or `LANG`, in that order.
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn percent_style(&self) -> PercentStyle {
        match self.language.as_str() {
            "tr" | "eu" => PercentStyle::Prefix,
            "fr" | "de" | "es" | "sv" | "nb" | "no" | "da" | "fi" | "cs" | "sk" | "ru" | "uk"
            | "pl" | "ca" | "el" | "hu" | "bg" => PercentStyle::SpacedSuffix,
            _ => PercentStyle::Suffix,
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            language: "en".into(),
        }
    }
}

/// `42%` (en_US), `42 %` (fr_FR), or "Calculating" when unknown.
pub fn percentage(p: Percentage, locale: &Locale) -> String {
    let Some(value) = p.value() else {
        return CALCULATING.into();
    };
    match locale.percent_style() {
        PercentStyle::Suffix => format!("{value}%"),
        PercentStyle::SpacedSuffix => format!("{value}\u{00A0}%"),
        PercentStyle::Prefix => format!("%{value}"),
    }
}

/// `2h 05m`, "Charged" when plugged in and full, "Calculating" when either
/// the minutes or the state are unknown.
pub fn time_remaining(minutes: Option<u32>, state: Option<&BatteryState>) -> String {
    if state == Some(&BatteryState::ChargedAndPlugged) {
        return CHARGED.into();
    }
    match (minutes, state) {
        (Some(minutes), Some(_)) => format!("{}h {:02}m", minutes / 60, minutes % 60),
        _ => CALCULATING.into(),
    }
}

/// Text shown next to the menu-bar icon.
pub fn menu_bar_title(reading: &BatteryReading, prefs: &Preferences, locale: &Locale) -> String {
    if prefs.hide_menubar_info {
        return String::new();
    }

    let state = reading.state();
    let show_time = match state {
        Some(BatteryState::Discharging(_)) => prefs.show_time_on_battery,
        Some(BatteryState::Charging(_)) => prefs.show_time_charging,
        _ => false,
    };

    if show_time {
        time_remaining(reading.time_remaining_minutes, state.as_ref())
    } else {
        percentage(reading.percentage, locale)
    }
}

/// `4120 / 4846 mAh`
pub fn charge(reading: &BatteryReading) -> String {
    match (reading.current_charge_mah, reading.max_capacity_mah) {
        (Some(charge), Some(capacity)) => format!("{charge} / {capacity} mAh"),
        _ => PLACEHOLDER.into(),
    }
}

/// `4120 / 4846 mAh (-961 mA)`, the menu's charge line.
pub fn charge_with_current(reading: &BatteryReading) -> String {
    match (
        reading.current_charge_mah,
        reading.max_capacity_mah,
        reading.amperage_ma,
    ) {
        (Some(charge), Some(capacity), Some(amperage)) => {
            format!("{charge} / {capacity} mAh ({amperage} mA)")
        }
        _ => charge(reading),
    }
}

pub fn power_usage(reading: &BatteryReading) -> String {
    match reading.power_usage_watts() {
        Some(watts) => format!("{watts} Watts"),
        None => PLACEHOLDER.into(),
    }
}

/// `30.1 °C / 86.2 °F`
pub fn temperature(reading: &BatteryReading) -> String {
    match reading.temperature_celsius() {
        Some(c) => format!("{:.1} °C / {:.1} °F", c, c * 1.8 + 32.0),
        None => PLACEHOLDER.into(),
    }
}

pub fn cycle_count(reading: &BatteryReading) -> String {
    reading
        .cycle_count
        .map(|c| c.to_string())
        .unwrap_or_else(|| PLACEHOLDER.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(state: (bool, bool, bool), pct: u8, minutes: Option<u32>) -> BatteryReading {
        BatteryReading {
            is_plugged: Some(state.0),
            is_charging: Some(state.1),
            is_charged: Some(state.2),
            percentage: Percentage::known(pct),
            time_remaining_minutes: minutes,
            ..Default::default()
        }
    }

    #[test]
    fn test_time_remaining() {
        let discharging = BatteryState::Discharging(Percentage::known(60));
        assert_eq!(time_remaining(Some(125), Some(&discharging)), "2h 05m");
        assert_eq!(time_remaining(Some(0), Some(&discharging)), "0h 00m");
        assert_eq!(time_remaining(Some(600), Some(&discharging)), "10h 00m");
        assert_eq!(time_remaining(None, Some(&discharging)), "Calculating");
        assert_eq!(time_remaining(Some(125), None), "Calculating");
        assert_eq!(
            time_remaining(Some(0), Some(&BatteryState::ChargedAndPlugged)),
            "Charged"
        );
        assert_eq!(time_remaining(None, Some(&BatteryState::ChargedAndPlugged)), "Charged");
    }

    #[test]
    fn test_percentage_locales() {
        let p = Percentage::known(42);
        assert_eq!(percentage(p, &Locale::parse("en_US")), "42%");
        assert_eq!(percentage(p, &Locale::parse("fr_FR.UTF-8")), "42\u{00A0}%");
        assert_eq!(percentage(p, &Locale::parse("de-DE")), "42\u{00A0}%");
        assert_eq!(percentage(p, &Locale::parse("tr_TR")), "%42");
        assert_eq!(percentage(p, &Locale::parse("ja_JP")), "42%");
        assert_eq!(percentage(Percentage::unknown(), &Locale::default()), "Calculating");
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!(Locale::parse("en_US.UTF-8").language(), "en");
        assert_eq!(Locale::parse("C").language(), "en");
        assert_eq!(Locale::parse("").language(), "en");
        assert_eq!(Locale::parse("FR").language(), "fr");
    }

    #[test]
    fn test_menu_bar_title_preferences() {
        let locale = Locale::default();
        let mut prefs = Preferences::default();
        let discharging = reading((false, false, false), 42, Some(125));
        let charging = reading((true, true, false), 42, Some(30));
        let charged = reading((true, false, true), 100, Some(0));

        assert_eq!(menu_bar_title(&discharging, &prefs, &locale), "2h 05m");
        assert_eq!(menu_bar_title(&charging, &prefs, &locale), "0h 30m");
        assert_eq!(menu_bar_title(&charged, &prefs, &locale), "100%");

        prefs.show_time_on_battery = false;
        assert_eq!(menu_bar_title(&discharging, &prefs, &locale), "42%");
        assert_eq!(menu_bar_title(&charging, &prefs, &locale), "0h 30m");

        prefs.hide_menubar_info = true;
        assert_eq!(menu_bar_title(&charging, &prefs, &locale), "");
    }

    #[test]
    fn test_detail_strings() {
        let full = BatteryReading {
            current_charge_mah: Some(4120),
            max_capacity_mah: Some(4846),
            amperage_ma: Some(-961),
            voltage_mv: Some(12_745),
            cycle_count: Some(212),
            temperature_centi_celsius: Some(3000),
            ..Default::default()
        };
        assert_eq!(charge(&full), "4120 / 4846 mAh");
        assert_eq!(charge_with_current(&full), "4120 / 4846 mAh (-961 mA)");
        assert_eq!(power_usage(&full), "12 Watts");
        assert_eq!(temperature(&full), "30.0 °C / 86.0 °F");
        assert_eq!(cycle_count(&full), "212");

        let empty = BatteryReading::default();
        assert_eq!(charge(&empty), "--");
        assert_eq!(charge_with_current(&empty), "--");
        assert_eq!(power_usage(&empty), "--");
        assert_eq!(temperature(&empty), "--");
        assert_eq!(cycle_count(&empty), "--");
    }
}
