//! In-memory engine for testing and ephemeral storage.

use crate::engine::{KvBackend, KvEngine, LogHandler, LogHandlerId};
use crate::error::{ClientError, ClientResult};
use crate::log::{LogEvent, LogLevel};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A value as the engine stores it, tagged by type.
#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Float(f64),
    Bytes(Vec<u8>),
}

impl StoredValue {
    /// Approximate on-disk footprint: key bytes are accounted separately.
    fn size(&self) -> u64 {
        match self {
            Self::Text(s) => s.len() as u64,
            Self::Int(_) | Self::Float(_) => 8,
            Self::Bool(_) => 1,
            Self::Bytes(b) => b.len() as u64,
        }
    }
}

/// An in-memory store instance.
///
/// Suitable for unit tests, integration tests and ephemeral caches. Keys
/// enumerate in lexicographic order, which is stable across runs.
///
/// The `fail_reads` / `fail_writes` knobs make every subsequent read or
/// write operation fail, for exercising error paths the way the real engine
/// would fail them.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, StoredValue>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read operation fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write operation fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> ClientResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ClientError::engine("injected read failure"));
        }
        Ok(())
    }

    fn check_write(&self) -> ClientResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClientError::engine("injected write failure"));
        }
        Ok(())
    }

    fn put(&self, key: &str, value: StoredValue) -> ClientResult<()> {
        self.check_write()?;
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> ClientResult<Option<StoredValue>> {
        self.check_read()?;
        Ok(self.entries.read().get(key).cloned())
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn set_string(&self, key: &str, value: &str) -> ClientResult<()> {
        self.put(key, StoredValue::Text(value.to_string()))
    }

    async fn get_string(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(match self.get(key)? {
            Some(StoredValue::Text(s)) => Some(s),
            _ => None,
        })
    }

    async fn set_i64(&self, key: &str, value: i64) -> ClientResult<()> {
        self.put(key, StoredValue::Int(value))
    }

    async fn get_i64(&self, key: &str) -> ClientResult<Option<i64>> {
        Ok(match self.get(key)? {
            Some(StoredValue::Int(v)) => Some(v),
            _ => None,
        })
    }

    async fn set_bool(&self, key: &str, value: bool) -> ClientResult<()> {
        self.put(key, StoredValue::Bool(value))
    }

    async fn get_bool(&self, key: &str) -> ClientResult<Option<bool>> {
        Ok(match self.get(key)? {
            Some(StoredValue::Bool(v)) => Some(v),
            _ => None,
        })
    }

    async fn set_f64(&self, key: &str, value: f64) -> ClientResult<()> {
        self.put(key, StoredValue::Float(value))
    }

    async fn get_f64(&self, key: &str) -> ClientResult<Option<f64>> {
        Ok(match self.get(key)? {
            Some(StoredValue::Float(v)) => Some(v),
            _ => None,
        })
    }

    async fn set_bytes(&self, key: &str, value: &[u8]) -> ClientResult<()> {
        self.put(key, StoredValue::Bytes(value.to_vec()))
    }

    async fn get_bytes(&self, key: &str) -> ClientResult<Option<Vec<u8>>> {
        Ok(match self.get(key)? {
            Some(StoredValue::Bytes(v)) => Some(v),
            _ => None,
        })
    }

    async fn remove(&self, key: &str) -> ClientResult<()> {
        self.check_write()?;
        self.entries.write().remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[String]) -> ClientResult<()> {
        self.check_write()?;
        let mut entries = self.entries.write();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn all_keys(&self) -> ClientResult<Vec<String>> {
        self.check_read()?;
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn contains(&self, key: &str) -> ClientResult<bool> {
        self.check_read()?;
        Ok(self.entries.read().contains_key(key))
    }

    async fn count(&self) -> ClientResult<usize> {
        self.check_read()?;
        Ok(self.entries.read().len())
    }

    async fn total_size(&self) -> ClientResult<u64> {
        self.check_read()?;
        let entries = self.entries.read();
        Ok(entries
            .iter()
            .map(|(key, value)| key.len() as u64 + value.size())
            .sum())
    }

    async fn clear_all(&self) -> ClientResult<()> {
        self.check_write()?;
        self.entries.write().clear();
        Ok(())
    }
}

/// An in-memory engine: a default store plus lazily-created named stores,
/// with engine-wide log level and handler registration.
///
/// `emit_log` injects a log event the way the native engine would, applying
/// the severity threshold before dispatching to registered handlers.
pub struct MemoryEngine {
    default_store: Arc<MemoryBackend>,
    named: RwLock<HashMap<String, Arc<MemoryBackend>>>,
    log_level: RwLock<LogLevel>,
    handlers: RwLock<Vec<(LogHandlerId, LogHandler)>>,
    next_handler_id: AtomicU64,
}

impl MemoryEngine {
    /// Creates an engine with an empty default store and no named stores.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_store: Arc::new(MemoryBackend::new()),
            named: RwLock::new(HashMap::new()),
            log_level: RwLock::new(LogLevel::Off),
            handlers: RwLock::new(Vec::new()),
            next_handler_id: AtomicU64::new(0),
        }
    }

    /// Returns the concrete store for an instance id, for test setup that
    /// needs [`MemoryBackend`]'s knobs.
    #[must_use]
    pub fn backend(&self, instance_id: Option<&str>) -> Arc<MemoryBackend> {
        match instance_id.filter(|id| !id.is_empty()) {
            None => Arc::clone(&self.default_store),
            Some(id) => {
                if let Some(store) = self.named.read().get(id) {
                    return Arc::clone(store);
                }
                let mut named = self.named.write();
                Arc::clone(
                    named
                        .entry(id.to_string())
                        .or_insert_with(|| Arc::new(MemoryBackend::new())),
                )
            }
        }
    }

    /// Emits a log event through the engine's dispatch path.
    ///
    /// The event is dropped when the threshold is `Off` or when its level is
    /// more verbose than the threshold, exactly as the native engine gates
    /// its log callback.
    pub fn emit_log(&self, level: LogLevel, message: impl Into<String>, instance_id: Option<&str>) {
        if level == LogLevel::Off {
            return;
        }
        let threshold = *self.log_level.read();
        if threshold == LogLevel::Off || level > threshold {
            return;
        }
        let event = LogEvent::new(level, message, instance_id.map(str::to_string));
        let handlers: Vec<LogHandler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(event.clone());
        }
    }

    /// Returns the number of registered log handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvEngine for MemoryEngine {
    fn instance(&self, instance_id: Option<&str>) -> Arc<dyn KvBackend> {
        self.backend(instance_id)
    }

    fn set_log_level(&self, level: LogLevel) {
        *self.log_level.write() = level;
    }

    fn log_level(&self) -> LogLevel {
        *self.log_level.read()
    }

    async fn add_log_handler(&self, handler: LogHandler) -> ClientResult<LogHandlerId> {
        let id = LogHandlerId(self.next_handler_id.fetch_add(1, Ordering::SeqCst));
        self.handlers.write().push((id, handler));
        Ok(id)
    }

    fn remove_log_handler(&self, id: LogHandlerId) {
        self.handlers.write().retain(|(hid, _)| *hid != id);
    }

    fn remove_all_log_handlers(&self) {
        self.handlers.write().clear();
    }
}
