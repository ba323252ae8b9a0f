use std::fmt;

/// Failures opening the battery's registry service.
///
/// Both are terminal for the poll that hit them; the next poll opens the
/// service again from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatteryError {
    /// A previously opened handle could not be released.
    ConnectionAlreadyOpen,
    /// No battery service is registered (desktop Macs, VMs, Linux).
    ServiceNotFound(String),
}

impl fmt::Display for BatteryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionAlreadyOpen => write!(f, "Battery service connection is already open"),
            Self::ServiceNotFound(msg) => write!(f, "Battery service not found: {msg}"),
        }
    }
}

impl std::error::Error for BatteryError {}

#[derive(Debug)]
pub enum JuiceError {
    Battery(BatteryError),
    Notification(String),
    InvalidThreshold(u8),
    Io(std::io::Error),
    TomlDe(toml::de::Error),
    TomlSer(toml::ser::Error),
    Json(serde_json::Error),
}

impl fmt::Display for JuiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Battery(e) => write!(f, "{e}"),
            Self::Notification(msg) => write!(f, "Notification failed: {msg}"),
            Self::InvalidThreshold(p) => write!(f, "Invalid notification threshold: {p}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::TomlDe(e) => write!(f, "TOML parse error: {e}"),
            Self::TomlSer(e) => write!(f, "TOML write error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for JuiceError {}

impl From<BatteryError> for JuiceError {
    fn from(e: BatteryError) -> Self {
        Self::Battery(e)
    }
}

impl From<std::io::Error> for JuiceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for JuiceError {
    fn from(e: toml::de::Error) -> Self {
        Self::TomlDe(e)
    }
}

impl From<toml::ser::Error> for JuiceError {
    fn from(e: toml::ser::Error) -> Self {
        Self::TomlSer(e)
    }
}

impl From<serde_json::Error> for JuiceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, JuiceError>;
