//! Log routing: per-application event routers and their registry.

use crate::error::CoreResult;
use crate::stream::{FilteredSubject, Subject};
use kvcell_client::{KvClient, ListenerHandle, LogEvent, LogLevel};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Predicate applied to events before they are republished.
pub type LogPredicate = Arc<dyn Fn(&LogEvent) -> bool + Send + Sync>;

/// Configuration for enabling a router.
pub struct LoggerConfig {
    level: LogLevel,
    filter: Option<LogPredicate>,
}

impl LoggerConfig {
    /// Creates a configuration with the given severity threshold and no
    /// filter.
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            filter: None,
        }
    }

    /// Drops events failing the predicate before they reach the router's
    /// stream.
    #[must_use]
    pub fn filter(mut self, predicate: impl Fn(&LogEvent) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(predicate));
        self
    }
}

/// Routes engine log events onto an event stream for one application.
///
/// A router owns one stream of matching events and, while enabled, exactly
/// one listener registration with the engine. Each application identifier
/// gets its own router (see [`LoggerRegistry`]); routers do not interfere
/// with each other's listeners.
pub struct LogRouter {
    client: KvClient,
    app_id: String,
    logs: Subject<LogEvent>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl LogRouter {
    fn new(client: KvClient, app_id: String) -> Self {
        Self {
            client,
            app_id,
            logs: Subject::new(),
            listener: Mutex::new(None),
        }
    }

    /// The application identifier this router belongs to.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Returns whether the router currently holds a listener registration.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Enables routing: sets the engine threshold and registers the
    /// listener.
    ///
    /// An enabled router is fully disabled first, so enabling twice never
    /// registers a duplicate listener. Events failing the configured filter
    /// are dropped silently; the rest are republished on [`logs`].
    ///
    /// [`logs`]: LogRouter::logs
    ///
    /// # Errors
    ///
    /// Returns an error when the listener cannot be registered.
    pub async fn enable_logging(&self, config: LoggerConfig) -> CoreResult<()> {
        self.disable_logging();

        self.client.set_log_level(config.level);

        let logs = self.logs.clone();
        let filter = config.filter;
        let handle = self
            .client
            .add_log_listener(Arc::new(move |event: LogEvent| {
                if let Some(filter) = &filter {
                    if !filter(&event) {
                        return;
                    }
                }
                logs.next(&event);
            }))
            .await?;

        *self.listener.lock() = Some(handle);
        debug!(app_id = %self.app_id, "log routing enabled");
        Ok(())
    }

    /// Disables routing: sets the engine threshold to `Off` and removes this
    /// router's listener. No-op when already disabled.
    pub fn disable_logging(&self) {
        let handle = self.listener.lock().take();
        if let Some(handle) = handle {
            self.client.set_log_level(LogLevel::Off);
            handle.remove();
            debug!(app_id = %self.app_id, "log routing disabled");
        }
    }

    /// Disables routing and completes the stream.
    ///
    /// Terminal: derived views terminate with it, and the router accepts no
    /// further events.
    pub fn destroy(&self) {
        self.disable_logging();
        self.logs.complete();
    }

    /// The stream of routed events.
    #[must_use]
    pub fn logs(&self) -> Subject<LogEvent> {
        self.logs.clone()
    }

    /// View of error-level events.
    #[must_use]
    pub fn error_logs(&self) -> FilteredSubject<LogEvent> {
        self.logs_for_level(LogLevel::Error)
    }

    /// View of events at exactly `level`.
    #[must_use]
    pub fn logs_for_level(&self, level: LogLevel) -> FilteredSubject<LogEvent> {
        FilteredSubject::new(&self.logs, move |event: &LogEvent| event.level == level)
    }

    /// View of events attributed to a store instance.
    #[must_use]
    pub fn logs_for_instance(&self, instance_id: impl Into<String>) -> FilteredSubject<LogEvent> {
        let instance_id = instance_id.into();
        FilteredSubject::new(&self.logs, move |event: &LogEvent| {
            event.instance_id.as_deref() == Some(instance_id.as_str())
        })
    }

    /// View of events matching an arbitrary predicate.
    #[must_use]
    pub fn filtered_logs(
        &self,
        predicate: impl Fn(&LogEvent) -> bool + Send + Sync + 'static,
    ) -> FilteredSubject<LogEvent> {
        FilteredSubject::new(&self.logs, predicate)
    }
}

/// Registry of log routers, one per application identifier.
///
/// Routers are created lazily on first request and reused until destroyed.
/// The current application identifier is a convenience for call sites that
/// do not pass one explicitly; reassigning it does not re-point routers
/// already obtained.
pub struct LoggerRegistry {
    client: KvClient,
    routers: RwLock<HashMap<String, Arc<LogRouter>>>,
    current_app: RwLock<String>,
}

/// Application identifier used when none is set.
pub const DEFAULT_APP_ID: &str = "default";

impl LoggerRegistry {
    /// Creates a registry over a client.
    #[must_use]
    pub fn new(client: KvClient) -> Self {
        Self {
            client,
            routers: RwLock::new(HashMap::new()),
            current_app: RwLock::new(DEFAULT_APP_ID.to_string()),
        }
    }

    /// Returns the current application identifier.
    #[must_use]
    pub fn current_app(&self) -> String {
        self.current_app.read().clone()
    }

    /// Sets the current application identifier for subsequent
    /// [`logger`](LoggerRegistry::logger) calls.
    pub fn set_current_app(&self, app_id: impl Into<String>) {
        *self.current_app.write() = app_id.into();
    }

    /// Returns the router for the current application identifier.
    #[must_use]
    pub fn logger(&self) -> Arc<LogRouter> {
        let app_id = self.current_app();
        self.logger_for(app_id)
    }

    /// Returns the router for `app_id`, creating it on first request.
    #[must_use]
    pub fn logger_for(&self, app_id: impl Into<String>) -> Arc<LogRouter> {
        let app_id = app_id.into();
        if let Some(router) = self.routers.read().get(&app_id) {
            return Arc::clone(router);
        }
        let mut routers = self.routers.write();
        Arc::clone(routers.entry(app_id.clone()).or_insert_with(|| {
            Arc::new(LogRouter::new(self.client.clone(), app_id))
        }))
    }

    /// Destroys the router for `app_id` and removes its entry.
    ///
    /// A later `logger_for(app_id)` returns a new, freshly-disabled router.
    pub fn destroy(&self, app_id: &str) {
        let router = self.routers.write().remove(app_id);
        if let Some(router) = router {
            router.destroy();
        }
    }

    /// Destroys every router and empties the registry.
    pub fn destroy_all(&self) {
        let routers: Vec<Arc<LogRouter>> = self.routers.write().drain().map(|(_, r)| r).collect();
        for router in routers {
            router.destroy();
        }
    }

    /// Returns the number of live routers.
    #[must_use]
    pub fn router_count(&self) -> usize {
        self.routers.read().len()
    }
}
