use std::io;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::JuiceConfig;
use crate::error::{BatteryError, JuiceError, Result};
use crate::format::{self, Locale};
use crate::notification::{self, Notifier, StatusNotification};
use crate::preferences::Preferences;
use crate::registry::PowerRegistry;
use crate::service::{BatteryReading, BatteryService};
use crate::state::{BatteryState, RedrawGate};
use crate::widget::{self, Timeline};

/// What the menu-bar icon should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconKind {
    State(BatteryState),
    Error(BatteryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconUpdate {
    /// The current icon still matches.
    Keep,
    Draw(IconKind),
    Hide,
}

/// Informational lines at the top of the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLines {
    pub power_source: String,
    pub remaining: String,
    pub charge: String,
}

/// Everything the status item needs after one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub title: String,
    pub icon: IconUpdate,
    pub lines: MenuLines,
    pub notified: Option<StatusNotification>,
}

/// Owns the battery service and the user's preferences, and turns each poll
/// into a [`StatusView`]. Lives on the main thread.
pub struct Monitor<R: PowerRegistry, N: Notifier> {
    service: BatteryService<R>,
    notifier: N,
    preferences: Preferences,
    preferences_path: PathBuf,
    locale: Locale,
    redraw: RedrawGate,
    last_error: Option<BatteryError>,
    last_reading: BatteryReading,
    widget_entries: u32,
    widget_spacing_minutes: u32,
}

impl<R: PowerRegistry, N: Notifier> Monitor<R, N> {
    pub fn new(registry: R, notifier: N, config: &JuiceConfig, preferences_path: PathBuf) -> Self {
        let preferences = Preferences::load(&preferences_path);
        Self {
            service: BatteryService::new(registry),
            notifier,
            preferences,
            preferences_path,
            locale: config.locale(),
            redraw: RedrawGate::new(config.drawing_granularity()),
            last_error: None,
            last_reading: BatteryReading::default(),
            widget_entries: config.widget.entries,
            widget_spacing_minutes: config.widget.spacing_minutes,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Read the battery and build the view. Posts a notification when a
    /// threshold is reached.
    pub fn poll(&mut self) -> StatusView {
        let reading = match self.service.read() {
            Ok(reading) => reading,
            Err(e) => return self.error_view(e),
        };
        self.last_error = None;

        let state = reading.state();
        let icon = if self.preferences.hide_battery_icon {
            self.redraw.reset();
            IconUpdate::Hide
        } else {
            match state {
                Some(ref s) if self.redraw.needs_redraw(s) => IconUpdate::Draw(IconKind::State(*s)),
                _ => IconUpdate::Keep,
            }
        };

        let view = StatusView {
            title: format::menu_bar_title(&reading, &self.preferences, &self.locale),
            icon,
            lines: MenuLines {
                power_source: reading.power_source().label().into(),
                remaining: self.remaining_line(&reading),
                charge: format::charge_with_current(&reading),
            },
            notified: self.notify(state.as_ref()),
        };

        self.last_reading = reading;
        view
    }

    /// The menu shows whichever of time and percentage the title does not.
    fn remaining_line(&self, reading: &BatteryReading) -> String {
        let title_shows_time = match reading.state() {
            Some(BatteryState::Discharging(_)) => self.preferences.show_time_on_battery,
            Some(BatteryState::Charging(_)) => self.preferences.show_time_charging,
            _ => false,
        };
        if title_shows_time {
            format::percentage(reading.percentage, &self.locale)
        } else {
            format::time_remaining(reading.time_remaining_minutes, reading.state().as_ref())
        }
    }

    fn error_view(&mut self, error: BatteryError) -> StatusView {
        warn!(error = %error, "battery read failed");
        self.redraw.reset();
        self.last_reading = BatteryReading::default();

        let icon = if self.last_error.as_ref() == Some(&error) {
            IconUpdate::Keep
        } else {
            IconUpdate::Draw(IconKind::Error(error.clone()))
        };
        self.last_error = Some(error);

        StatusView {
            title: String::new(),
            icon,
            lines: MenuLines {
                power_source: self.last_reading.power_source().label().into(),
                remaining: format::CALCULATING.into(),
                charge: format::PLACEHOLDER.into(),
            },
            notified: None,
        }
    }

    fn notify(&mut self, state: Option<&BatteryState>) -> Option<StatusNotification> {
        let notification = notification::evaluate(
            state,
            &self.preferences.notification_thresholds,
            self.preferences.last_notified(),
            &self.locale,
        )?;

        match notification::deliver(&notification, &self.notifier) {
            Ok(last) => {
                let persisted = self.persist(|p| {
                    p.set_last_notified(last);
                    Ok(())
                });
                if let Err(e) = persisted {
                    warn!(error = %e, "failed to persist last notified threshold");
                    self.preferences.set_last_notified(last);
                }
                Some(notification)
            }
            Err(e) => {
                warn!(threshold = notification.threshold, error = %e, "failed to post notification");
                None
            }
        }
    }

    /// Re-read the preferences file after an external change.
    pub fn reload_preferences(&mut self) {
        self.preferences = Preferences::load(&self.preferences_path);
        self.redraw.reset();
        debug!("preferences reloaded");
    }

    /// Change preferences and persist them.
    pub fn update_preferences<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Preferences) -> Result<()>,
    {
        self.persist(change)?;
        self.redraw.reset();
        info!(path = %self.preferences_path.display(), "preferences updated");
        Ok(())
    }

    /// Apply `change` on top of the file's current contents and save it.
    ///
    /// The file may have been edited since the last reload, so the in-memory
    /// copy is only used when there is no readable file.
    fn persist<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Preferences) -> Result<()>,
    {
        let mut current = match Preferences::read(&self.preferences_path) {
            Ok(prefs) => prefs,
            Err(JuiceError::Io(ref e)) if e.kind() == io::ErrorKind::NotFound => {
                self.preferences.clone()
            }
            Err(e) => {
                warn!(error = %e, "preferences file unreadable, keeping loaded copy");
                self.preferences.clone()
            }
        };
        change(&mut current)?;
        current.save(&self.preferences_path)?;
        self.preferences = current;
        Ok(())
    }

    /// Widget timeline for the most recent reading.
    pub fn timeline(&self) -> Timeline {
        let rows = widget::rows(&self.last_reading, &self.locale);
        Timeline::build(
            Utc::now(),
            self.widget_entries,
            self.widget_spacing_minutes,
            &rows,
        )
    }
}
