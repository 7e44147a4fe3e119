//! Log severity levels and the log event schema produced at the engine boundary.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Log severity, ordered from least verbose (`Off`) to most verbose (`Verbose`).
///
/// The engine forwards an event only when `event.level <= threshold`, so a
/// threshold of [`LogLevel::Info`] passes `Error`, `Warn` and `Info` events
/// and drops `Debug` and `Verbose`. A threshold of [`LogLevel::Off`] drops
/// everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    /// Logging disabled.
    Off,
    /// Unrecoverable engine failures (CRC mismatch, file length errors).
    Error,
    /// Recoverable anomalies.
    Warn,
    /// Lifecycle and operational messages.
    Info,
    /// Per-operation detail.
    Debug,
    /// Everything the engine can report.
    Verbose,
}

impl LogLevel {
    /// Converts the numeric wire representation (0..=5) to a level.
    ///
    /// Unknown values map to `Off`, matching the engine's behavior for
    /// unrecognized levels.
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Error,
            2 => Self::Warn,
            3 => Self::Info,
            4 => Self::Debug,
            5 => Self::Verbose,
            _ => Self::Off,
        }
    }

    /// Returns the numeric wire representation (0..=5).
    #[must_use]
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Error => 1,
            Self::Warn => 2,
            Self::Info => 3,
            Self::Debug => 4,
            Self::Verbose => 5,
        }
    }
}

/// A single log event emitted by the engine boundary.
///
/// Events are immutable once constructed. `instance_id` is present when the
/// engine can attribute the event to a specific store instance (recovery
/// events do; general diagnostics usually do not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Severity of the event.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Milliseconds since the Unix epoch at emission time.
    pub timestamp_ms: u64,
    /// Store instance the event refers to, when known.
    pub instance_id: Option<String>,
}

impl LogEvent {
    /// Creates an event stamped with the current wall-clock time.
    pub fn new(level: LogLevel, message: impl Into<String>, instance_id: Option<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            level,
            message: message.into(),
            timestamp_ms,
            instance_id,
        }
    }
}
