use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BatteryError;
use crate::registry::{PowerRegistry, PowerSourceSummary, RegistryKey, RegistrySnapshot, TimeEstimate};
use crate::state::{BatteryState, Percentage, PowerSource};

/// One poll's worth of raw battery values. Every field is optional; a
/// missing value means the registry did not report it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatteryReading {
    pub is_plugged: Option<bool>,
    pub is_charging: Option<bool>,
    pub is_charged: Option<bool>,
    pub percentage: Percentage,
    pub time_remaining_minutes: Option<u32>,
    pub current_charge_mah: Option<i64>,
    pub max_capacity_mah: Option<i64>,
    pub amperage_ma: Option<i64>,
    pub voltage_mv: Option<i64>,
    pub cycle_count: Option<i64>,
    pub temperature_centi_celsius: Option<i64>,
}

impl BatteryReading {
    /// Combine the registry properties with the power-source summary.
    pub fn from_sources(props: &RegistrySnapshot, source: &PowerSourceSummary) -> Self {
        let current_charge_mah = props
            .int(RegistryKey::RawCurrentCapacity)
            .or_else(|| props.int(RegistryKey::CurrentCapacity));
        let max_capacity_mah = props
            .int(RegistryKey::RawMaxCapacity)
            .or_else(|| props.int(RegistryKey::MaxCapacity));

        let percentage = match source.percentage {
            Some(p) => Percentage::from_raw(Some(p)),
            None => match (current_charge_mah, max_capacity_mah) {
                (Some(charge), Some(max)) if max > 0 => {
                    Percentage::from_raw(Some(((charge as f64 / max as f64) * 100.0).round() as i64))
                }
                _ => Percentage::unknown(),
            },
        };

        let time_remaining_minutes = match source.estimate {
            TimeEstimate::Unknown => None,
            TimeEstimate::Unlimited => props.minutes(RegistryKey::TimeRemaining),
            TimeEstimate::Minutes(m) => Some(m),
        };

        Self {
            is_plugged: props.bool(RegistryKey::IsPlugged),
            is_charging: props.bool(RegistryKey::IsCharging),
            is_charged: props.bool(RegistryKey::FullyCharged),
            percentage,
            time_remaining_minutes,
            current_charge_mah,
            max_capacity_mah,
            amperage_ma: props.int(RegistryKey::Amperage),
            voltage_mv: props.int(RegistryKey::Voltage),
            cycle_count: props.int(RegistryKey::CycleCount),
            temperature_centi_celsius: props.int(RegistryKey::Temperature),
        }
    }

    pub fn state(&self) -> Option<BatteryState> {
        BatteryState::derive(self.is_plugged, self.is_charging, self.is_charged, self.percentage)
    }

    pub fn power_source(&self) -> PowerSource {
        PowerSource::from_plugged(self.is_plugged)
    }

    /// Current power draw in watts, rounded.
    pub fn power_usage_watts(&self) -> Option<i64> {
        let (voltage, amperage) = (self.voltage_mv?, self.amperage_ma?);
        Some(((voltage as f64 * amperage as f64).abs() / 1_000_000.0).round() as i64)
    }

    pub fn temperature_celsius(&self) -> Option<f64> {
        self.temperature_centi_celsius.map(|t| t as f64 / 100.0)
    }
}

/// Handle on the battery's registry service.
///
/// The connection is re-opened on every [`read`](Self::read), so a failure
/// only affects the poll that hit it.
pub struct BatteryService<R: PowerRegistry> {
    registry: R,
    open: bool,
}

impl<R: PowerRegistry> BatteryService<R> {
    /// Wrap a registry without connecting yet.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            open: false,
        }
    }

    /// Wrap a registry and connect immediately.
    pub fn open(registry: R) -> Result<Self, BatteryError> {
        let mut service = Self::new(registry);
        service.reopen()?;
        Ok(service)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Release any previous handle and connect again.
    pub fn reopen(&mut self) -> Result<(), BatteryError> {
        if self.open && !self.close() {
            warn!("failed to release previous battery service handle");
            return Err(BatteryError::ConnectionAlreadyOpen);
        }

        self.registry.connect().map_err(BatteryError::ServiceNotFound)?;
        self.open = true;
        Ok(())
    }

    /// Close the connection. Returns true when the handle is released.
    pub fn close(&mut self) -> bool {
        if self.registry.release() {
            self.open = false;
        }
        !self.open
    }

    /// Re-open the service and take a fresh reading.
    pub fn read(&mut self) -> Result<BatteryReading, BatteryError> {
        self.reopen()?;
        let props = self.registry.properties();
        let source = self.registry.power_source();
        let reading = BatteryReading::from_sources(&props, &source);
        debug!(
            percentage = ?reading.percentage.value(),
            plugged = ?reading.is_plugged,
            charging = ?reading.is_charging,
            "battery read"
        );
        Ok(reading)
    }
}

impl<R: PowerRegistry> Drop for BatteryService<R> {
    fn drop(&mut self) {
        if self.open {
            self.close();
        }
    }
}
