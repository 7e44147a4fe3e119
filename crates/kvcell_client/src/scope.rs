//! Scopes: the (instance, namespace) pair addressing a storage partition.

use crate::namespace;

/// A storage partition: which engine instance to talk to and which namespace
/// to prefix keys with.
///
/// The default scope (no instance, no namespace) addresses the engine's
/// default store with raw keys. Empty strings are normalized to "not set",
/// matching the engine boundary's treatment of empty identifiers.
///
/// # Example
///
/// ```
/// use kvcell_client::Scope;
///
/// let scope = Scope::new().instance("cache").namespace("settings");
/// assert_eq!(scope.storage_key("theme"), "settings:theme");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Engine instance identifier; `None` selects the default instance.
    pub instance_id: Option<String>,
    /// Namespace for key prefixing; `None` stores raw keys.
    pub namespace: Option<String>,
}

impl Scope {
    /// Creates the default scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope from optional parts, normalizing empty strings away.
    #[must_use]
    pub fn of(instance_id: Option<&str>, namespace: Option<&str>) -> Self {
        Self {
            instance_id: instance_id
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        }
    }

    /// Sets the instance identifier.
    #[must_use]
    pub fn instance(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.instance_id = if id.is_empty() { None } else { Some(id) };
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        let ns = ns.into();
        self.namespace = if ns.is_empty() { None } else { Some(ns) };
        self
    }

    /// Maps a raw key to the key stored in the engine for this scope.
    #[must_use]
    pub fn storage_key(&self, key: &str) -> String {
        namespace::storage_key(key, self.namespace.as_deref())
    }

    /// Canonical string form used as a cache key for per-scope services.
    ///
    /// Two scopes with equal parts always produce the same string.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "{}\u{1f}{}",
            self.instance_id.as_deref().unwrap_or("default"),
            self.namespace.as_deref().unwrap_or("")
        )
    }
}
