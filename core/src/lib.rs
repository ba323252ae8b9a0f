//! Battery monitoring core for the Juice menu-bar app.
//!
//! Polls the power-management registry, derives a [`BatteryState`],
//! formats it for display and decides when a threshold notification is due.

pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod monitor;
pub mod notification;
pub mod preferences;
pub mod registry;
pub mod service;
pub mod state;
pub mod widget;

pub use error::{BatteryError, JuiceError, Result};
pub use monitor::{IconKind, IconUpdate, MenuLines, Monitor, StatusView};
pub use notification::{LastNotified, StatusNotification};
pub use preferences::Preferences;
pub use service::{BatteryReading, BatteryService};
pub use state::{BatteryState, Percentage, PowerSource};
