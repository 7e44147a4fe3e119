//! Engine boundary traits.
//!
//! The engine is an **opaque external key-value store**: it persists raw
//! string keys and typed values, knows nothing about namespaces or caching,
//! and reports diagnostics through registered log handlers. Everything above
//! this boundary (namespacing, reactive cells, log routing) is this
//! workspace's job; everything below it (mmap persistence, compression, crash
//! recovery) is the engine's.

use crate::error::ClientResult;
use crate::log::{LogEvent, LogLevel};
use async_trait::async_trait;
use std::sync::Arc;

/// Callback invoked by the engine for each log event that passes its
/// severity threshold.
pub type LogHandler = Arc<dyn Fn(LogEvent) + Send + Sync>;

/// Identifies a registered log handler so it can be removed individually.
///
/// Engine implementations mint these; callers treat them as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogHandlerId(pub u64);

/// One engine store instance.
///
/// Stores are namespace-unaware: keys are raw strings exactly as given.
/// Typed getters return `None` when the key is absent so callers can
/// distinguish "missing" from the engine's zero defaults.
///
/// # Invariants
///
/// - `get_*` after `set_*` of the same key and type returns the stored value
/// - `all_keys` enumerates every stored key in a stable order
/// - Implementations must be `Send + Sync`; all operations may suspend
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Stores a string value.
    async fn set_string(&self, key: &str, value: &str) -> ClientResult<()>;

    /// Reads a string value, or `None` if the key is absent.
    async fn get_string(&self, key: &str) -> ClientResult<Option<String>>;

    /// Stores an integer value.
    async fn set_i64(&self, key: &str, value: i64) -> ClientResult<()>;

    /// Reads an integer value, or `None` if the key is absent.
    async fn get_i64(&self, key: &str) -> ClientResult<Option<i64>>;

    /// Stores a boolean value.
    async fn set_bool(&self, key: &str, value: bool) -> ClientResult<()>;

    /// Reads a boolean value, or `None` if the key is absent.
    async fn get_bool(&self, key: &str) -> ClientResult<Option<bool>>;

    /// Stores a float value.
    async fn set_f64(&self, key: &str, value: f64) -> ClientResult<()>;

    /// Reads a float value, or `None` if the key is absent.
    async fn get_f64(&self, key: &str) -> ClientResult<Option<f64>>;

    /// Stores a byte sequence.
    async fn set_bytes(&self, key: &str, value: &[u8]) -> ClientResult<()>;

    /// Reads a byte sequence, or `None` if the key is absent.
    async fn get_bytes(&self, key: &str) -> ClientResult<Option<Vec<u8>>>;

    /// Removes a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> ClientResult<()>;

    /// Removes a batch of keys.
    async fn remove_many(&self, keys: &[String]) -> ClientResult<()>;

    /// Enumerates all stored keys.
    async fn all_keys(&self) -> ClientResult<Vec<String>>;

    /// Returns whether a key is present.
    async fn contains(&self, key: &str) -> ClientResult<bool>;

    /// Returns the number of stored keys.
    async fn count(&self) -> ClientResult<usize>;

    /// Returns the total size of the store in bytes.
    async fn total_size(&self) -> ClientResult<u64>;

    /// Removes every key in the store.
    async fn clear_all(&self) -> ClientResult<()>;
}

/// The engine as a whole: instance management plus engine-wide logging.
///
/// Engines expose one default store and any number of named stores created
/// lazily on first use. The log level and handler registrations are
/// engine-global, matching the native library's process-wide log hook.
#[async_trait]
pub trait KvEngine: Send + Sync {
    /// Returns the store for `instance_id`, creating it on first use.
    ///
    /// `None` (or an empty id, which callers normalize away) selects the
    /// default store. Repeated calls with the same id return the same store.
    fn instance(&self, instance_id: Option<&str>) -> Arc<dyn KvBackend>;

    /// Sets the engine-wide severity threshold.
    ///
    /// Events with `level > threshold` are dropped before any handler runs;
    /// `LogLevel::Off` silences the engine entirely.
    fn set_log_level(&self, level: LogLevel);

    /// Returns the current severity threshold.
    fn log_level(&self) -> LogLevel;

    /// Registers a log handler and returns its id.
    ///
    /// Multiple handlers may be registered; each receives every event that
    /// passes the threshold. Registration may suspend (the native hook is
    /// installed asynchronously).
    async fn add_log_handler(&self, handler: LogHandler) -> ClientResult<LogHandlerId>;

    /// Removes a single log handler. Removing an unknown id is a no-op.
    fn remove_log_handler(&self, id: LogHandlerId);

    /// Removes every registered log handler.
    fn remove_all_log_handlers(&self);
}
