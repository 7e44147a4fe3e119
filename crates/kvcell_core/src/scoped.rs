//! Per-scope views over a shared cell store.

use crate::cell::ReactiveCell;
use crate::error::CoreResult;
use crate::store::{CellOptions, CellStore};
use kvcell_client::{KvClient, Scope};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A cell store with its scope fixed.
///
/// Scoped stores are partial application: every accessor delegates to the
/// shared base [`CellStore`] with this view's scope, so a cell requested
/// through a scoped store and the same cell requested directly from the base
/// store are one and the same.
pub struct ScopedStore {
    base: Arc<CellStore>,
    scope: Scope,
}

impl ScopedStore {
    /// Creates a view of `base` fixed to `scope`.
    #[must_use]
    pub fn new(base: Arc<CellStore>, scope: Scope) -> Self {
        Self { base, scope }
    }

    /// The scope this view is fixed to.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The shared base store.
    #[must_use]
    pub fn base(&self) -> &Arc<CellStore> {
        &self.base
    }

    /// Requests a cell with an explicit codec. See [`CellStore::cell`].
    pub fn cell<T>(&self, key: &str, options: CellOptions<T>) -> CoreResult<Arc<ReactiveCell<T>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.base.cell(&self.scope, key, options)
    }

    /// String cell; absent reads as `None`.
    pub fn string_cell(&self, key: &str) -> CoreResult<Arc<ReactiveCell<String>>> {
        self.base.string_cell(&self.scope, key)
    }

    /// String cell that never reads as absent.
    pub fn string_cell_with(
        &self,
        key: &str,
        default: impl Into<String>,
    ) -> CoreResult<Arc<ReactiveCell<String>>> {
        self.base.string_cell_with(&self.scope, key, default)
    }

    /// Integer cell; absent or malformed reads as `None`.
    pub fn int_cell(&self, key: &str) -> CoreResult<Arc<ReactiveCell<i64>>> {
        self.base.int_cell(&self.scope, key)
    }

    /// Integer cell that never reads as absent.
    pub fn int_cell_with(&self, key: &str, default: i64) -> CoreResult<Arc<ReactiveCell<i64>>> {
        self.base.int_cell_with(&self.scope, key, default)
    }

    /// Float cell; absent or malformed reads as `None`.
    pub fn float_cell(&self, key: &str) -> CoreResult<Arc<ReactiveCell<f64>>> {
        self.base.float_cell(&self.scope, key)
    }

    /// Float cell that never reads as absent.
    pub fn float_cell_with(&self, key: &str, default: f64) -> CoreResult<Arc<ReactiveCell<f64>>> {
        self.base.float_cell_with(&self.scope, key, default)
    }

    /// Boolean cell; absent or malformed reads as `None`.
    pub fn bool_cell(&self, key: &str) -> CoreResult<Arc<ReactiveCell<bool>>> {
        self.base.bool_cell(&self.scope, key)
    }

    /// Boolean cell that never reads as absent.
    pub fn bool_cell_with(&self, key: &str, default: bool) -> CoreResult<Arc<ReactiveCell<bool>>> {
        self.base.bool_cell_with(&self.scope, key, default)
    }

    /// Byte-sequence cell; absent or malformed reads as `None`.
    pub fn bytes_cell(&self, key: &str) -> CoreResult<Arc<ReactiveCell<Vec<u8>>>> {
        self.base.bytes_cell(&self.scope, key)
    }

    /// Byte-sequence cell that never reads as absent.
    pub fn bytes_cell_with(
        &self,
        key: &str,
        default: Vec<u8>,
    ) -> CoreResult<Arc<ReactiveCell<Vec<u8>>>> {
        self.base.bytes_cell_with(&self.scope, key, default)
    }

    /// Structured cell stored as JSON; absent or malformed reads as `None`.
    pub fn json_cell<T>(&self, key: &str) -> CoreResult<Arc<ReactiveCell<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.base.json_cell(&self.scope, key)
    }

    /// Structured cell that never reads as absent.
    pub fn json_cell_with<T>(&self, key: &str, default: T) -> CoreResult<Arc<ReactiveCell<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.base.json_cell_with(&self.scope, key, default)
    }

    /// Forces a cached cell to re-read its stored value. See
    /// [`CellStore::sync_cell`].
    pub async fn sync_cell<T>(&self, key: &str) -> CoreResult<bool>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.base.sync_cell::<T>(&self.scope, key).await
    }
}

/// Cache of scoped stores over one shared base store.
///
/// Repeated requests for the same scope return the identical
/// `Arc<ScopedStore>`, so call sites that compare store identities see one
/// view per scope. The registry is an explicit object - construct it once
/// and inject it where it is needed.
pub struct StoreRegistry {
    base: Arc<CellStore>,
    scoped: RwLock<HashMap<String, Arc<ScopedStore>>>,
}

impl StoreRegistry {
    /// Creates a registry with a fresh base store over `client`.
    #[must_use]
    pub fn new(client: KvClient) -> Self {
        Self {
            base: Arc::new(CellStore::new(client)),
            scoped: RwLock::new(HashMap::new()),
        }
    }

    /// The shared base store.
    #[must_use]
    pub fn base(&self) -> Arc<CellStore> {
        Arc::clone(&self.base)
    }

    /// Returns the view for `scope`, creating it on first request.
    #[must_use]
    pub fn scoped(&self, scope: Scope) -> Arc<ScopedStore> {
        let cache_key = scope.cache_key();
        if let Some(view) = self.scoped.read().get(&cache_key) {
            return Arc::clone(view);
        }
        let mut scoped = self.scoped.write();
        Arc::clone(
            scoped
                .entry(cache_key)
                .or_insert_with(|| Arc::new(ScopedStore::new(Arc::clone(&self.base), scope))),
        )
    }

    /// Returns the view for the default scope.
    #[must_use]
    pub fn default_scoped(&self) -> Arc<ScopedStore> {
        self.scoped(Scope::new())
    }

    /// Drops every cached view and every cached cell.
    pub fn clear(&self) {
        self.scoped.write().clear();
        self.base.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvcell_client::{KvEngine, MemoryEngine};

    fn registry() -> StoreRegistry {
        let engine = Arc::new(MemoryEngine::new());
        StoreRegistry::new(KvClient::new(engine as Arc<dyn KvEngine>))
    }

    #[tokio::test]
    async fn same_scope_returns_identical_view() {
        let registry = registry();
        let a = registry.scoped(Scope::new().namespace("settings"));
        let b = registry.scoped(Scope::new().namespace("settings"));
        assert!(Arc::ptr_eq(&a, &b));

        let c = registry.scoped(Scope::new().namespace("other"));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn scoped_and_base_share_cells() {
        let registry = registry();
        let scope = Scope::new().instance("cache").namespace("ns");
        let view = registry.scoped(scope.clone());

        let via_view = view.string_cell("k").unwrap();
        let via_base = registry.base().string_cell(&scope, "k").unwrap();
        assert!(Arc::ptr_eq(&via_view, &via_base));
    }

    #[tokio::test]
    async fn scoped_writes_land_in_scope() {
        let registry = registry();
        let view = registry.scoped(Scope::new().namespace("settings"));

        let cell = view.string_cell("theme").unwrap();
        cell.set("dark".to_string());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let stored = registry
            .base()
            .client()
            .get_string(&Scope::new().namespace("settings"), "theme")
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn clear_drops_views_and_cells() {
        let registry = registry();
        let view = registry.scoped(Scope::new().namespace("ns"));
        let cell = view.string_cell("k").unwrap();

        registry.clear();

        let view_after = registry.scoped(Scope::new().namespace("ns"));
        assert!(!Arc::ptr_eq(&view, &view_after));
        let cell_after = view_after.string_cell("k").unwrap();
        assert!(!Arc::ptr_eq(&cell, &cell_after));
    }
}
