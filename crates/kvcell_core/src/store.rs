//! The reactive cell store: a cache of engine-synchronized cells.

use crate::cell::{CellKey, ReactiveCell};
use crate::error::{CoreError, CoreResult};
use kvcell_client::{KvClient, Scope};
use kvcell_codec::{
    BoolCodec, BytesCodec, FloatCodec, IntCodec, JsonCodec, StringCodec, ValueCodec,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Options for requesting a cell.
pub struct CellOptions<T> {
    default: Option<T>,
    codec: Option<Arc<dyn ValueCodec<T>>>,
}

impl<T> CellOptions<T> {
    /// Creates empty options: no default, no codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default: None,
            codec: None,
        }
    }

    /// Seeds the cell with a default and keeps it from ever reading as
    /// absent.
    #[must_use]
    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// Uses a custom codec instead of the accessor's built-in.
    #[must_use]
    pub fn codec(mut self, codec: Arc<dyn ValueCodec<T>>) -> Self {
        self.codec = Some(codec);
        self
    }
}

impl<T> Default for CellOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A cache of [`ReactiveCell`]s keyed by the full `(instance, namespace,
/// key)` triple.
///
/// Requesting a cell is synchronous: on a cache miss the cell is created
/// seeded with its default, inserted, and hydrated from the engine in a
/// spawned task. The insertion happens before the task is spawned, so
/// concurrent requests for the same key observe the same cell and only one
/// hydrate read is ever issued per cached cell.
///
/// One store serves every scope; partial-application views over a fixed
/// scope are provided by [`crate::ScopedStore`].
pub struct CellStore {
    client: KvClient,
    cells: RwLock<HashMap<CellKey, Arc<dyn Any + Send + Sync>>>,
}

impl CellStore {
    /// Creates a store over a client.
    #[must_use]
    pub fn new(client: KvClient) -> Self {
        Self {
            client,
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &KvClient {
        &self.client
    }

    /// Requests the cell for `key` in `scope`.
    ///
    /// `options` must carry a codec; the typed accessors supply built-ins.
    /// Requesting a key that is cached with a different value type is a
    /// misuse error.
    ///
    /// Must be called within a Tokio runtime (the hydrate task is spawned).
    ///
    /// # Errors
    ///
    /// [`CoreError::CodecRequired`] when no codec is configured;
    /// [`CoreError::CellTypeMismatch`] when the cached cell's type differs.
    pub fn cell<T>(
        &self,
        scope: &Scope,
        key: &str,
        options: CellOptions<T>,
    ) -> CoreResult<Arc<ReactiveCell<T>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let cell_key = CellKey::new(scope, key);

        if let Some(entry) = self.cells.read().get(&cell_key) {
            return downcast(Arc::clone(entry), &cell_key);
        }

        let mut cells = self.cells.write();
        // Lost the race between the read and write lock: reuse the winner.
        if let Some(entry) = cells.get(&cell_key) {
            return downcast(Arc::clone(entry), &cell_key);
        }

        let codec = options.codec.ok_or_else(|| CoreError::CodecRequired {
            key: cell_key.to_string(),
        })?;
        let cell = ReactiveCell::new(
            self.client.clone(),
            scope.clone(),
            key.to_string(),
            codec,
            options.default,
        );
        let issued_at = cell.current_version();
        cells.insert(cell_key, Arc::clone(&cell) as Arc<dyn Any + Send + Sync>);
        drop(cells);

        let hydrating = Arc::clone(&cell);
        tokio::spawn(async move {
            hydrating.hydrate(issued_at).await;
        });

        Ok(cell)
    }

    /// String cell; absent reads as `None`.
    pub fn string_cell(&self, scope: &Scope, key: &str) -> CoreResult<Arc<ReactiveCell<String>>> {
        self.cell(scope, key, CellOptions::new().codec(Arc::new(StringCodec)))
    }

    /// String cell that never reads as absent.
    pub fn string_cell_with(
        &self,
        scope: &Scope,
        key: &str,
        default: impl Into<String>,
    ) -> CoreResult<Arc<ReactiveCell<String>>> {
        self.cell(
            scope,
            key,
            CellOptions::new()
                .codec(Arc::new(StringCodec))
                .default_value(default.into()),
        )
    }

    /// Integer cell; absent or malformed reads as `None`.
    pub fn int_cell(&self, scope: &Scope, key: &str) -> CoreResult<Arc<ReactiveCell<i64>>> {
        self.cell(scope, key, CellOptions::new().codec(Arc::new(IntCodec)))
    }

    /// Integer cell that never reads as absent.
    pub fn int_cell_with(
        &self,
        scope: &Scope,
        key: &str,
        default: i64,
    ) -> CoreResult<Arc<ReactiveCell<i64>>> {
        self.cell(
            scope,
            key,
            CellOptions::new()
                .codec(Arc::new(IntCodec))
                .default_value(default),
        )
    }

    /// Float cell; absent or malformed reads as `None`.
    pub fn float_cell(&self, scope: &Scope, key: &str) -> CoreResult<Arc<ReactiveCell<f64>>> {
        self.cell(scope, key, CellOptions::new().codec(Arc::new(FloatCodec)))
    }

    /// Float cell that never reads as absent.
    pub fn float_cell_with(
        &self,
        scope: &Scope,
        key: &str,
        default: f64,
    ) -> CoreResult<Arc<ReactiveCell<f64>>> {
        self.cell(
            scope,
            key,
            CellOptions::new()
                .codec(Arc::new(FloatCodec))
                .default_value(default),
        )
    }

    /// Boolean cell; absent or malformed reads as `None`.
    pub fn bool_cell(&self, scope: &Scope, key: &str) -> CoreResult<Arc<ReactiveCell<bool>>> {
        self.cell(scope, key, CellOptions::new().codec(Arc::new(BoolCodec)))
    }

    /// Boolean cell that never reads as absent.
    pub fn bool_cell_with(
        &self,
        scope: &Scope,
        key: &str,
        default: bool,
    ) -> CoreResult<Arc<ReactiveCell<bool>>> {
        self.cell(
            scope,
            key,
            CellOptions::new()
                .codec(Arc::new(BoolCodec))
                .default_value(default),
        )
    }

    /// Byte-sequence cell; absent or malformed reads as `None`.
    pub fn bytes_cell(&self, scope: &Scope, key: &str) -> CoreResult<Arc<ReactiveCell<Vec<u8>>>> {
        self.cell(scope, key, CellOptions::new().codec(Arc::new(BytesCodec)))
    }

    /// Byte-sequence cell that never reads as absent.
    pub fn bytes_cell_with(
        &self,
        scope: &Scope,
        key: &str,
        default: Vec<u8>,
    ) -> CoreResult<Arc<ReactiveCell<Vec<u8>>>> {
        self.cell(
            scope,
            key,
            CellOptions::new()
                .codec(Arc::new(BytesCodec))
                .default_value(default),
        )
    }

    /// Structured cell stored as JSON; absent or malformed reads as `None`.
    pub fn json_cell<T>(&self, scope: &Scope, key: &str) -> CoreResult<Arc<ReactiveCell<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.cell(
            scope,
            key,
            CellOptions::new().codec(Arc::new(JsonCodec::<T>::new())),
        )
    }

    /// Structured cell that never reads as absent.
    pub fn json_cell_with<T>(
        &self,
        scope: &Scope,
        key: &str,
        default: T,
    ) -> CoreResult<Arc<ReactiveCell<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.cell(
            scope,
            key,
            CellOptions::new()
                .codec(Arc::new(JsonCodec::<T>::new()))
                .default_value(default),
        )
    }

    /// Forces a cached cell to re-read its stored value, overwriting the
    /// in-memory value when one is found.
    ///
    /// Reconciles state changed by another writer. Returns `false` when no
    /// cell for the key is cached (nothing to reconcile).
    ///
    /// # Errors
    ///
    /// [`CoreError::CellTypeMismatch`] when the cached cell's type differs.
    pub async fn sync_cell<T>(&self, scope: &Scope, key: &str) -> CoreResult<bool>
    where
        T: Clone + Send + Sync + 'static,
    {
        let cell_key = CellKey::new(scope, key);
        let entry = self.cells.read().get(&cell_key).map(Arc::clone);
        match entry {
            None => Ok(false),
            Some(entry) => {
                let cell: Arc<ReactiveCell<T>> = downcast(entry, &cell_key)?;
                cell.reconcile().await;
                Ok(true)
            }
        }
    }

    /// Drops every cached cell. Stored values are untouched; the next
    /// request for any key creates and hydrates a fresh cell.
    pub fn clear_cache(&self) {
        self.cells.write().clear();
    }

    /// Returns the number of cached cells.
    #[must_use]
    pub fn cached_cells(&self) -> usize {
        self.cells.read().len()
    }
}

fn downcast<T>(
    entry: Arc<dyn Any + Send + Sync>,
    cell_key: &CellKey,
) -> CoreResult<Arc<ReactiveCell<T>>>
where
    T: Clone + Send + Sync + 'static,
{
    entry
        .downcast::<ReactiveCell<T>>()
        .map_err(|_| CoreError::CellTypeMismatch {
            key: cell_key.to_string(),
        })
}
