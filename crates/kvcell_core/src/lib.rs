//! # kvcell Core
//!
//! Reactive cell cache, event streams and log routing over an external
//! key-value engine.
//!
//! This crate provides:
//! - [`Subject`] / [`FilteredSubject`] - multi-subscriber event streams
//! - [`ReactiveCell`] - observable values synchronized with the engine
//! - [`CellStore`] - the cache of cells, keyed by (instance, namespace, key)
//! - [`ScopedStore`] / [`StoreRegistry`] - per-scope views over one store
//! - [`LogRouter`] / [`LoggerRegistry`] - per-application log event routing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kvcell_client::{KvClient, MemoryEngine, Scope};
//! use kvcell_core::StoreRegistry;
//! use std::sync::Arc;
//!
//! let client = KvClient::new(Arc::new(MemoryEngine::new()));
//! let registry = StoreRegistry::new(client);
//!
//! let settings = registry.scoped(Scope::new().namespace("settings"));
//! let theme = settings.string_cell_with("theme", "light")?;
//!
//! // Reads are synchronous; the cell hydrates from storage in the
//! // background and every write persists in the background.
//! theme.set("dark".to_string());
//! assert_eq!(theme.get().as_deref(), Some("dark"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cell;
mod error;
mod logger;
mod scoped;
mod store;
pub mod stream;

pub use cell::{CellKey, ReactiveCell};
pub use error::{CoreError, CoreResult};
pub use logger::{LogPredicate, LogRouter, LoggerConfig, LoggerRegistry, DEFAULT_APP_ID};
pub use scoped::{ScopedStore, StoreRegistry};
pub use store::{CellOptions, CellStore};
pub use stream::{FilteredSubject, Observable, Observer, StreamError, Subject, Subscription};

// The boundary types that appear in this crate's API surface.
pub use kvcell_client::{KvClient, LogEvent, LogLevel, Scope};
