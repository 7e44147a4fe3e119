//! The `KvClient` facade: namespacing applied above a namespace-unaware engine.

use crate::engine::{KvBackend, KvEngine, LogHandler, LogHandlerId};
use crate::error::ClientResult;
use crate::log::LogLevel;
use crate::namespace;
use crate::scope::Scope;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Client for an external key-value engine.
///
/// All operations take a [`Scope`] selecting the engine instance and the
/// namespace; the facade translates keys through the namespacing layer and
/// delegates to the engine, which never sees a namespace.
///
/// Cloning is cheap: clones share the same engine.
///
/// # Example
///
/// ```rust,ignore
/// use kvcell_client::{KvClient, MemoryEngine, Scope};
/// use std::sync::Arc;
///
/// let client = KvClient::new(Arc::new(MemoryEngine::new()));
/// let scope = Scope::new().namespace("settings");
/// client.set_string(&scope, "theme", "dark").await?;
/// assert_eq!(client.get_string(&scope, "theme").await?.as_deref(), Some("dark"));
/// ```
#[derive(Clone)]
pub struct KvClient {
    engine: Arc<dyn KvEngine>,
}

impl KvClient {
    /// Creates a client over an engine.
    #[must_use]
    pub fn new(engine: Arc<dyn KvEngine>) -> Self {
        Self { engine }
    }

    /// Returns the underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn KvEngine> {
        &self.engine
    }

    fn store(&self, scope: &Scope) -> Arc<dyn KvBackend> {
        self.engine.instance(scope.instance_id.as_deref())
    }

    /// Stores a string value.
    pub async fn set_string(&self, scope: &Scope, key: &str, value: &str) -> ClientResult<()> {
        self.store(scope)
            .set_string(&scope.storage_key(key), value)
            .await
    }

    /// Reads a string value.
    pub async fn get_string(&self, scope: &Scope, key: &str) -> ClientResult<Option<String>> {
        self.store(scope).get_string(&scope.storage_key(key)).await
    }

    /// Stores an integer value.
    pub async fn set_i64(&self, scope: &Scope, key: &str, value: i64) -> ClientResult<()> {
        self.store(scope)
            .set_i64(&scope.storage_key(key), value)
            .await
    }

    /// Reads an integer value; `None` when the key is absent.
    pub async fn get_i64(&self, scope: &Scope, key: &str) -> ClientResult<Option<i64>> {
        self.store(scope).get_i64(&scope.storage_key(key)).await
    }

    /// Stores a boolean value.
    pub async fn set_bool(&self, scope: &Scope, key: &str, value: bool) -> ClientResult<()> {
        self.store(scope)
            .set_bool(&scope.storage_key(key), value)
            .await
    }

    /// Reads a boolean value; `None` when the key is absent.
    pub async fn get_bool(&self, scope: &Scope, key: &str) -> ClientResult<Option<bool>> {
        self.store(scope).get_bool(&scope.storage_key(key)).await
    }

    /// Stores a float value.
    pub async fn set_f64(&self, scope: &Scope, key: &str, value: f64) -> ClientResult<()> {
        self.store(scope)
            .set_f64(&scope.storage_key(key), value)
            .await
    }

    /// Reads a float value; `None` when the key is absent.
    pub async fn get_f64(&self, scope: &Scope, key: &str) -> ClientResult<Option<f64>> {
        self.store(scope).get_f64(&scope.storage_key(key)).await
    }

    /// Stores a byte sequence.
    pub async fn set_bytes(&self, scope: &Scope, key: &str, value: &[u8]) -> ClientResult<()> {
        self.store(scope)
            .set_bytes(&scope.storage_key(key), value)
            .await
    }

    /// Reads a byte sequence; `None` when the key is absent.
    pub async fn get_bytes(&self, scope: &Scope, key: &str) -> ClientResult<Option<Vec<u8>>> {
        self.store(scope).get_bytes(&scope.storage_key(key)).await
    }

    /// Removes a key.
    pub async fn remove(&self, scope: &Scope, key: &str) -> ClientResult<()> {
        self.store(scope).remove(&scope.storage_key(key)).await
    }

    /// Removes a batch of keys, translating each through the namespace.
    pub async fn remove_many(&self, scope: &Scope, keys: &[String]) -> ClientResult<()> {
        let store = self.store(scope);
        match scope.namespace.as_deref() {
            None => store.remove_many(keys).await,
            Some(_) => {
                let stored: Vec<String> = keys.iter().map(|k| scope.storage_key(k)).collect();
                store.remove_many(&stored).await
            }
        }
    }

    /// Enumerates the keys visible in this scope, namespace prefix stripped,
    /// in the engine's enumeration order.
    pub async fn all_keys(&self, scope: &Scope) -> ClientResult<Vec<String>> {
        let stored = self.store(scope).all_keys().await?;
        Ok(namespace::filter_keys(&stored, scope.namespace.as_deref()))
    }

    /// Returns whether a key is present in this scope.
    pub async fn contains(&self, scope: &Scope, key: &str) -> ClientResult<bool> {
        self.store(scope).contains(&scope.storage_key(key)).await
    }

    /// Counts the keys visible in this scope.
    ///
    /// With a namespace this enumerates and filters; without one it is the
    /// engine's native count.
    pub async fn count(&self, scope: &Scope) -> ClientResult<usize> {
        let store = self.store(scope);
        match scope.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            None => store.count().await,
            Some(ns) => {
                let stored = store.all_keys().await?;
                Ok(namespace::filter_keys(&stored, Some(ns)).len())
            }
        }
    }

    /// Returns the total size of the scope's store instance in bytes.
    ///
    /// The engine has no namespace notion, so this reports the whole
    /// instance even when the scope carries a namespace.
    pub async fn total_size(&self, scope: &Scope) -> ClientResult<u64> {
        self.store(scope).total_size().await
    }

    /// Clears the scope: every key in the namespace, or the whole instance
    /// when the scope has no namespace.
    pub async fn clear(&self, scope: &Scope) -> ClientResult<()> {
        let store = self.store(scope);
        match scope.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            None => store.clear_all().await,
            Some(ns) => {
                let stored = store.all_keys().await?;
                let in_namespace: Vec<String> = stored
                    .into_iter()
                    .filter(|key| namespace::strip_key(key, Some(ns)).is_some())
                    .collect();
                if in_namespace.is_empty() {
                    return Ok(());
                }
                debug!(namespace = ns, keys = in_namespace.len(), "clearing namespace");
                store.remove_many(&in_namespace).await
            }
        }
    }

    /// Sets the engine-wide log severity threshold.
    pub fn set_log_level(&self, level: LogLevel) {
        self.engine.set_log_level(level);
    }

    /// Returns the engine-wide log severity threshold.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.engine.log_level()
    }

    /// Registers a log listener with the engine.
    ///
    /// The returned handle removes exactly this listener; other listeners
    /// are unaffected.
    pub async fn add_log_listener(&self, handler: LogHandler) -> ClientResult<ListenerHandle> {
        let id = self.engine.add_log_handler(handler).await?;
        Ok(ListenerHandle {
            engine: Arc::clone(&self.engine),
            id,
            removed: AtomicBool::new(false),
        })
    }

    /// Removes every log listener registered with the engine.
    pub fn remove_log_listeners(&self) {
        self.engine.remove_all_log_handlers();
    }
}

/// Handle for a registered log listener.
///
/// `remove` is idempotent. Dropping the handle without calling it leaves the
/// listener registered.
pub struct ListenerHandle {
    engine: Arc<dyn KvEngine>,
    id: LogHandlerId,
    removed: AtomicBool,
}

impl ListenerHandle {
    /// Removes the listener from the engine.
    pub fn remove(&self) {
        if !self.removed.swap(true, Ordering::SeqCst) {
            self.engine.remove_log_handler(self.id);
        }
    }

    /// Returns whether `remove` has been called.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEngine;

    fn client_with_engine() -> (KvClient, Arc<MemoryEngine>) {
        let engine = Arc::new(MemoryEngine::new());
        (KvClient::new(Arc::clone(&engine) as Arc<dyn KvEngine>), engine)
    }

    #[tokio::test]
    async fn namespaced_keys_are_prefixed_in_storage() {
        let (client, engine) = client_with_engine();
        let scope = Scope::new().namespace("settings");

        client.set_string(&scope, "theme", "dark").await.unwrap();

        // The engine sees the prefixed key, the client surface does not.
        let raw = engine.backend(None);
        assert_eq!(
            raw.get_string("settings:theme").await.unwrap().as_deref(),
            Some("dark")
        );
        assert_eq!(
            client.get_string(&scope, "theme").await.unwrap().as_deref(),
            Some("dark")
        );
    }

    #[tokio::test]
    async fn all_keys_filters_and_strips() {
        let (client, _) = client_with_engine();
        let settings = Scope::new().namespace("settings");
        let other = Scope::new().namespace("other");

        client.set_string(&settings, "a", "1").await.unwrap();
        client.set_string(&settings, "b", "2").await.unwrap();
        client.set_string(&other, "c", "3").await.unwrap();
        client.set_string(&Scope::new(), "plain", "4").await.unwrap();

        assert_eq!(client.all_keys(&settings).await.unwrap(), vec!["a", "b"]);
        assert_eq!(client.count(&settings).await.unwrap(), 2);
        // The default scope sees every stored key, prefixes included.
        assert_eq!(client.count(&Scope::new()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn clear_scoped_leaves_other_namespaces() {
        let (client, _) = client_with_engine();
        let settings = Scope::new().namespace("settings");
        let other = Scope::new().namespace("other");

        client.set_string(&settings, "a", "1").await.unwrap();
        client.set_string(&other, "b", "2").await.unwrap();

        client.clear(&settings).await.unwrap();

        assert_eq!(client.count(&settings).await.unwrap(), 0);
        assert_eq!(
            client.get_string(&other, "b").await.unwrap().as_deref(),
            Some("2")
        );
    }

    #[tokio::test]
    async fn clear_without_namespace_clears_instance() {
        let (client, _) = client_with_engine();
        let settings = Scope::new().namespace("settings");

        client.set_string(&settings, "a", "1").await.unwrap();
        client.set_string(&Scope::new(), "plain", "2").await.unwrap();

        client.clear(&Scope::new()).await.unwrap();
        assert_eq!(client.count(&Scope::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_many_translates_namespaced_keys() {
        let (client, _) = client_with_engine();
        let scope = Scope::new().namespace("ns");

        client.set_string(&scope, "a", "1").await.unwrap();
        client.set_string(&scope, "b", "2").await.unwrap();
        client.set_string(&scope, "keep", "3").await.unwrap();

        client
            .remove_many(&scope, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(client.all_keys(&scope).await.unwrap(), vec!["keep"]);
    }

    #[tokio::test]
    async fn instances_do_not_share_keys() {
        let (client, _) = client_with_engine();
        let default = Scope::new();
        let cache = Scope::new().instance("cache");

        client.set_string(&default, "k", "default").await.unwrap();
        client.set_string(&cache, "k", "cache").await.unwrap();

        assert_eq!(
            client.get_string(&default, "k").await.unwrap().as_deref(),
            Some("default")
        );
        assert_eq!(
            client.get_string(&cache, "k").await.unwrap().as_deref(),
            Some("cache")
        );
    }

    #[tokio::test]
    async fn total_size_ignores_namespace() {
        let (client, _) = client_with_engine();
        let scope = Scope::new().namespace("ns");

        client.set_string(&Scope::new(), "outside", "1").await.unwrap();
        client.set_string(&scope, "inside", "2").await.unwrap();

        // Whole-instance size, not just the namespace's share.
        assert_eq!(
            client.total_size(&scope).await.unwrap(),
            client.total_size(&Scope::new()).await.unwrap()
        );
    }

    #[tokio::test]
    async fn typed_get_distinguishes_absent() {
        let (client, _) = client_with_engine();
        let scope = Scope::new();

        assert_eq!(client.get_i64(&scope, "n").await.unwrap(), None);
        client.set_i64(&scope, "n", 0).await.unwrap();
        assert_eq!(client.get_i64(&scope, "n").await.unwrap(), Some(0));

        assert_eq!(client.get_bool(&scope, "b").await.unwrap(), None);
        client.set_bool(&scope, "b", false).await.unwrap();
        assert_eq!(client.get_bool(&scope, "b").await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn listener_handle_removes_once() {
        let (client, engine) = client_with_engine();

        let handle = client.add_log_listener(Arc::new(|_| {})).await.unwrap();
        assert_eq!(engine.handler_count(), 1);
        assert!(!handle.is_removed());

        handle.remove();
        handle.remove();
        assert!(handle.is_removed());
        assert_eq!(engine.handler_count(), 0);
    }
}
