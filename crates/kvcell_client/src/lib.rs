//! # kvcell Client
//!
//! Engine boundary and namespacing layer for kvcell.
//!
//! This crate defines the contract with the external key-value engine and
//! everything that sits immediately above it:
//!
//! - [`KvBackend`] / [`KvEngine`] - the opaque engine boundary (typed
//!   get/set, enumeration, engine-wide logging); implementations wrap the
//!   real native engine or, for tests, [`MemoryEngine`]
//! - [`namespace`] - the pure prefixing scheme partitioning a
//!   namespace-unaware store
//! - [`Scope`] - the (instance, namespace) pair addressing a partition
//! - [`KvClient`] - the facade applying namespacing above the engine
//! - [`LogLevel`] / [`LogEvent`] - the log schema produced at the boundary
//!
//! The engine itself (persistence format, compression, crash recovery) is
//! out of scope here; it appears only behind the traits.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod engine;
mod error;
mod log;
mod memory;
pub mod namespace;
mod scope;

pub use client::{KvClient, ListenerHandle};
pub use engine::{KvBackend, KvEngine, LogHandler, LogHandlerId};
pub use error::{ClientError, ClientResult};
pub use log::{LogEvent, LogLevel};
pub use memory::{MemoryBackend, MemoryEngine};
pub use scope::Scope;
