//! Reactive cells: observable values synchronized with the engine.

use crate::stream::Subject;
use kvcell_client::{KvClient, Scope};
use kvcell_codec::ValueCodec;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Fully-qualified identity of a cell: instance, namespace and raw key.
///
/// Two equal keys always resolve to the same stored value and, within one
/// store, the same cached cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellKey {
    /// Engine instance; `None` is the default instance.
    pub instance_id: Option<String>,
    /// Namespace; `None` stores the raw key.
    pub namespace: Option<String>,
    /// The raw key as application code sees it.
    pub key: String,
}

impl CellKey {
    /// Builds the key for a scope and raw key.
    #[must_use]
    pub fn new(scope: &Scope, key: &str) -> Self {
        Self {
            instance_id: scope.instance_id.clone(),
            namespace: scope.namespace.clone(),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.instance_id.as_deref().unwrap_or("default"),
            self.namespace.as_deref().unwrap_or(""),
            self.key
        )
    }
}

struct CellState<T> {
    value: Option<T>,
    /// Bumped by every local write; hydrate reads are discarded when the
    /// version moved while they were in flight.
    version: u64,
}

/// A mutable, observable value holder synchronized with the engine.
///
/// Reads are synchronous against the cell's in-memory value. [`set`] updates
/// that value synchronously, then persists it to the engine in a background
/// task; persistence failures are logged and swallowed, so a cell never
/// errors out of a write and a reader immediately after a write always
/// observes the write.
///
/// Cells are created and cached by a store; all call sites that request the
/// same [`CellKey`] share one cell.
///
/// [`set`]: ReactiveCell::set
pub struct ReactiveCell<T> {
    client: KvClient,
    scope: Scope,
    key: String,
    codec: Arc<dyn ValueCodec<T>>,
    default: Option<T>,
    state: RwLock<CellState<T>>,
    changes: Subject<T>,
}

impl<T> fmt::Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("scope", &self.scope)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<T> ReactiveCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        client: KvClient,
        scope: Scope,
        key: String,
        codec: Arc<dyn ValueCodec<T>>,
        default: Option<T>,
    ) -> Arc<Self> {
        let seeded = default.clone();
        Arc::new(Self {
            client,
            scope,
            key,
            codec,
            default,
            state: RwLock::new(CellState {
                value: seeded,
                version: 0,
            }),
            changes: Subject::new(),
        })
    }

    /// The raw key this cell is bound to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The scope this cell persists into.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the current value.
    ///
    /// `None` means no value is stored and the cell has no default. Cells
    /// created with a default never return `None`.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.state.read().value.clone()
    }

    /// Returns the current value, or `fallback` when the cell is empty.
    #[must_use]
    pub fn get_or(&self, fallback: T) -> T {
        self.get().unwrap_or(fallback)
    }

    /// The stream of values this cell takes on, from writes, hydration and
    /// forced re-syncs.
    #[must_use]
    pub fn changes(&self) -> Subject<T> {
        self.changes.clone()
    }

    /// Writes a value.
    ///
    /// The in-memory value updates before this returns; serialization and
    /// the engine write run afterwards in a spawned task. A persistence
    /// failure leaves the in-memory value in place and is only logged.
    ///
    /// Must be called within a Tokio runtime.
    pub fn set(self: &Arc<Self>, value: T) {
        {
            let mut state = self.state.write();
            state.value = Some(value.clone());
            state.version += 1;
        }
        self.changes.next(&value);

        let cell = Arc::clone(self);
        tokio::spawn(async move {
            cell.persist(value).await;
        });
    }

    async fn persist(&self, value: T) {
        let text = match self.codec.encode(&value) {
            Ok(text) => text,
            Err(err) => {
                warn!(key = %self.key, error = %err, "value encoding failed, write not persisted");
                return;
            }
        };
        if let Err(err) = self.client.set_string(&self.scope, &self.key, &text).await {
            warn!(key = %self.key, error = %err, "persist failed, keeping in-memory value");
        }
    }

    /// Version counter snapshot, taken when a hydrate is issued.
    pub(crate) fn current_version(&self) -> u64 {
        self.state.read().version
    }

    /// Reads the stored value and applies it, unless a local write happened
    /// after the hydrate was issued - local writes are authoritative.
    ///
    /// `issued_at` is the version snapshot taken synchronously when the
    /// hydrate was requested, not when this task got to run.
    pub(crate) async fn hydrate(&self, issued_at: u64) {
        match self.client.get_string(&self.scope, &self.key).await {
            Ok(Some(text)) => match self.codec.decode(&text) {
                Some(value) => self.apply_unless_stale(issued_at, value),
                None => {
                    // Malformed stored text degrades to the default.
                    if let Some(default) = self.default.clone() {
                        self.apply_unless_stale(issued_at, default);
                    }
                }
            },
            Ok(None) => {
                // Nothing stored: a default-valued cell re-asserts its
                // default so it never shows an absent value.
                if let Some(default) = self.default.clone() {
                    self.apply_unless_stale(issued_at, default);
                }
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "hydrate read failed, keeping seeded value");
            }
        }
    }

    fn apply_unless_stale(&self, issued_at: u64, value: T) {
        {
            let mut state = self.state.write();
            if state.version != issued_at {
                return;
            }
            state.value = Some(value.clone());
        }
        self.changes.next(&value);
    }

    /// Re-reads the stored value and overwrites the in-memory value when one
    /// is found, reconciling state written by another process.
    ///
    /// The overwrite bumps the version so older in-flight hydrates cannot
    /// clobber it.
    pub(crate) async fn reconcile(&self) {
        match self.client.get_string(&self.scope, &self.key).await {
            Ok(Some(text)) => {
                if let Some(value) = self.codec.decode(&text) {
                    {
                        let mut state = self.state.write();
                        state.value = Some(value.clone());
                        state.version += 1;
                    }
                    self.changes.next(&value);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(key = %self.key, error = %err, "re-sync read failed, keeping current value");
            }
        }
    }
}
