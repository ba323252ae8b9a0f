use serde::Serialize;

/// Percentage bucket size the menu-bar icon can actually display.
pub const DRAWING_GRANULARITY: f64 = 5.4;

/// A charge percentage in `0..=100`, or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Percentage(Option<u8>);

impl Percentage {
    /// Build from a raw registry reading. Negative values are treated as
    /// unknown; values over 100 are clamped.
    pub fn from_raw(raw: Option<i64>) -> Self {
        match raw {
            Some(v) if v < 0 => Self(None),
            Some(v) => Self(Some(v.min(100) as u8)),
            None => Self(None),
        }
    }

    pub fn known(value: u8) -> Self {
        Self(Some(value.min(100)))
    }

    pub fn unknown() -> Self {
        Self(None)
    }

    pub fn value(&self) -> Option<u8> {
        self.0
    }
}

/// The battery's charging state, derived fresh on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "percentage", rename_all = "snake_case")]
pub enum BatteryState {
    ChargedAndPlugged,
    Charging(Percentage),
    Discharging(Percentage),
}

impl BatteryState {
    /// Derive the state from the individually read sensor values.
    ///
    /// Returns `None` when any of the three flags is missing.
    pub fn derive(
        is_plugged: Option<bool>,
        is_charging: Option<bool>,
        is_charged: Option<bool>,
        percentage: Percentage,
    ) -> Option<Self> {
        let (plugged, charging, charged) = (is_plugged?, is_charging?, is_charged?);

        if charged && plugged {
            return Some(Self::ChargedAndPlugged);
        }
        if charging {
            return Some(Self::Charging(percentage));
        }
        Some(Self::Discharging(percentage))
    }

    pub fn percentage(&self) -> Percentage {
        match self {
            Self::ChargedAndPlugged => Percentage::known(100),
            Self::Charging(p) | Self::Discharging(p) => *p,
        }
    }

    /// Whether both states render to the same menu-bar icon.
    ///
    /// Discharging states compare by drawing bucket, so fluctuations below
    /// `granularity` do not trigger a redraw. Unknown percentages never match.
    pub fn same_drawing(&self, other: &Self, granularity: f64) -> bool {
        match (self, other) {
            (Self::ChargedAndPlugged, Self::ChargedAndPlugged) => true,
            (Self::Charging(_), Self::Charging(_)) => true,
            (Self::Discharging(a), Self::Discharging(b)) => match (a.value(), b.value()) {
                (Some(a), Some(b)) => drawing_bucket(a, granularity) == drawing_bucket(b, granularity),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Index of the icon fill bucket for a percentage.
pub fn drawing_bucket(percentage: u8, granularity: f64) -> i64 {
    (f64::from(percentage) / granularity).round() as i64
}

/// Remembers the last drawn state and decides whether a new one needs a redraw.
#[derive(Debug)]
pub struct RedrawGate {
    granularity: f64,
    last: Option<BatteryState>,
}

impl RedrawGate {
    pub fn new(granularity: f64) -> Self {
        Self {
            granularity,
            last: None,
        }
    }

    /// Returns true (and records `state`) if the icon has to be redrawn.
    pub fn needs_redraw(&mut self, state: &BatteryState) -> bool {
        if let Some(ref last) = self.last {
            if last.same_drawing(state, self.granularity) {
                return false;
            }
        }
        self.last = Some(*state);
        true
    }

    /// Forget the last drawn state, e.g. after an error icon was shown.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Where the Mac currently draws its power from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerSource {
    Unknown,
    PowerAdapter,
    Battery,
}

impl PowerSource {
    pub fn from_plugged(is_plugged: Option<bool>) -> Self {
        match is_plugged {
            None => Self::Unknown,
            Some(true) => Self::PowerAdapter,
            Some(false) => Self::Battery,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::PowerAdapter => "Power Adapter",
            Self::Battery => "Battery",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charged_and_plugged_wins_for_every_percentage() {
        for p in 0..=100u8 {
            for charging in [true, false] {
                let state = BatteryState::derive(
                    Some(true),
                    Some(charging),
                    Some(true),
                    Percentage::known(p),
                );
                assert_eq!(state, Some(BatteryState::ChargedAndPlugged));
            }
        }
    }

    #[test]
    fn test_derive_precedence() {
        let p = Percentage::known(42);
        assert_eq!(
            BatteryState::derive(Some(true), Some(true), Some(false), p),
            Some(BatteryState::Charging(p))
        );
        // charged but unplugged is just discharging
        assert_eq!(
            BatteryState::derive(Some(false), Some(false), Some(true), p),
            Some(BatteryState::Discharging(p))
        );
        assert_eq!(
            BatteryState::derive(Some(false), Some(false), Some(false), p),
            Some(BatteryState::Discharging(p))
        );
    }

    #[test]
    fn test_derive_missing_flag_is_unavailable() {
        let p = Percentage::known(50);
        assert_eq!(BatteryState::derive(None, Some(false), Some(false), p), None);
        assert_eq!(BatteryState::derive(Some(false), None, Some(false), p), None);
        assert_eq!(BatteryState::derive(Some(false), Some(false), None, p), None);
    }

    #[test]
    fn test_percentage_from_raw() {
        assert_eq!(Percentage::from_raw(Some(42)).value(), Some(42));
        assert_eq!(Percentage::from_raw(Some(104)).value(), Some(100));
        assert_eq!(Percentage::from_raw(Some(-1)).value(), None);
        assert_eq!(Percentage::from_raw(None).value(), None);
        assert_eq!(BatteryState::ChargedAndPlugged.percentage().value(), Some(100));
    }

    #[test]
    fn test_discharging_equal_iff_same_bucket() {
        let g = DRAWING_GRANULARITY;
        for p1 in 0..=100u8 {
            for p2 in 0..=100u8 {
                let a = BatteryState::Discharging(Percentage::known(p1));
                let b = BatteryState::Discharging(Percentage::known(p2));
                let expected = (f64::from(p1) / g).round() == (f64::from(p2) / g).round();
                assert_eq!(a.same_drawing(&b, g), expected, "p1={p1} p2={p2}");
            }
        }
    }

    #[test]
    fn test_same_drawing_other_variants() {
        let g = DRAWING_GRANULARITY;
        let charging_low = BatteryState::Charging(Percentage::known(3));
        let charging_high = BatteryState::Charging(Percentage::known(97));
        assert!(charging_low.same_drawing(&charging_high, g));
        assert!(BatteryState::ChargedAndPlugged.same_drawing(&BatteryState::ChargedAndPlugged, g));
        assert!(!charging_low.same_drawing(&BatteryState::Discharging(Percentage::known(3)), g));

        let unknown = BatteryState::Discharging(Percentage::unknown());
        assert!(!unknown.same_drawing(&unknown, g));
    }

    #[test]
    fn test_redraw_gate_suppresses_sub_bucket_changes() {
        let mut gate = RedrawGate::new(DRAWING_GRANULARITY);
        let d = |p| BatteryState::Discharging(Percentage::known(p));

        assert!(gate.needs_redraw(&d(80)));
        assert!(!gate.needs_redraw(&d(79)));
        assert!(gate.needs_redraw(&d(70)));
        assert!(gate.needs_redraw(&BatteryState::Charging(Percentage::known(70))));
        assert!(!gate.needs_redraw(&BatteryState::Charging(Percentage::known(75))));

        gate.reset();
        assert!(gate.needs_redraw(&BatteryState::Charging(Percentage::known(75))));
    }

    #[test]
    fn test_power_source_from_plugged() {
        assert_eq!(PowerSource::from_plugged(None), PowerSource::Unknown);
        assert_eq!(PowerSource::from_plugged(Some(true)).label(), "Power Adapter");
        assert_eq!(PowerSource::from_plugged(Some(false)).label(), "Battery");
    }
}
