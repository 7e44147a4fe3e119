//! End-to-end tests over the full stack: engine, client, stores, logging.

use kvcell_client::{KvBackend, KvClient, KvEngine, MemoryEngine, Scope};
use kvcell_core::stream::{Observable, Observer};
use kvcell_core::{LogLevel, LoggerConfig, LoggerRegistry, StoreRegistry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn client() -> (KvClient, Arc<MemoryEngine>) {
    let engine = Arc::new(MemoryEngine::new());
    (
        KvClient::new(Arc::clone(&engine) as Arc<dyn KvEngine>),
        engine,
    )
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn values_survive_cache_teardown() {
    let (client, _) = client();
    let scope = Scope::new().namespace("settings");

    // First session: write through a cell.
    let registry = StoreRegistry::new(client.clone());
    let settings = registry.scoped(scope.clone());
    settings
        .string_cell("theme")
        .unwrap()
        .set("dark".to_string());
    settle().await;
    registry.clear();

    // Second session over the same engine: a fresh cell hydrates the value.
    let registry = StoreRegistry::new(client);
    let theme = registry.scoped(scope).string_cell("theme").unwrap();
    assert_eq!(theme.get(), None);
    settle().await;
    assert_eq!(theme.get().as_deref(), Some("dark"));
}

#[tokio::test]
async fn scoped_views_and_cells_have_stable_identity() {
    let (client, _) = client();
    let registry = StoreRegistry::new(client);

    let scope = Scope::new().instance("cache").namespace("session");
    let a = registry.scoped(scope.clone());
    let b = registry.scoped(scope.clone());
    assert!(Arc::ptr_eq(&a, &b));

    let cell_a = a.int_cell_with("counter", 0).unwrap();
    let cell_b = b.int_cell_with("counter", 0).unwrap();
    assert!(Arc::ptr_eq(&cell_a, &cell_b));

    // A write through one handle is a write through both.
    cell_a.set(5);
    assert_eq!(cell_b.get(), Some(5));
}

#[tokio::test]
async fn own_write_wins_over_in_flight_hydration() {
    let (client, engine) = client();
    engine
        .backend(None)
        .set_string("flag", "true")
        .await
        .unwrap();

    let registry = StoreRegistry::new(client);
    let cell = registry.default_scoped().bool_cell("flag").unwrap();

    // Write before the hydrate read resolves; the write must stick.
    cell.set(false);
    assert_eq!(cell.get(), Some(false));
    settle().await;
    assert_eq!(cell.get(), Some(false));
}

#[tokio::test]
async fn typed_cells_share_storage_with_direct_client_access() {
    let (client, _) = client();
    let scope = Scope::new().namespace("profile");
    let registry = StoreRegistry::new(client.clone());

    let age = registry.scoped(scope.clone()).int_cell("age").unwrap();
    age.set(30);
    settle().await;

    // The persisted form is decimal text under the namespaced key.
    assert_eq!(
        client.get_string(&scope, "age").await.unwrap().as_deref(),
        Some("30")
    );
}

#[tokio::test]
async fn log_pipeline_routes_engine_events() {
    let (client, engine) = client();
    let loggers = LoggerRegistry::new(client);
    let router = loggers.logger_for("app");

    router
        .enable_logging(LoggerConfig::new(LogLevel::Info).filter(|e| !e.message.contains("noisy")))
        .await
        .unwrap();
    assert_eq!(engine.log_level(), LogLevel::Info);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    router
        .logs()
        .subscribe(Observer::new().on_next(move |e: &kvcell_core::LogEvent| {
            sink.lock().push((e.level, e.message.clone()));
            Ok(())
        }));

    engine.emit_log(LogLevel::Error, "CRC check failed for: cache", Some("cache"));
    engine.emit_log(LogLevel::Info, "noisy detail", None);
    engine.emit_log(LogLevel::Verbose, "below threshold", None);

    assert_eq!(
        *seen.lock(),
        vec![(LogLevel::Error, "CRC check failed for: cache".to_string())]
    );

    loggers.destroy_all();
    assert!(router.logs().is_terminated());
}

#[tokio::test]
async fn cells_keep_working_while_engine_writes_fail() {
    let (client, engine) = client();
    let registry = StoreRegistry::new(client);
    let cell = registry
        .default_scoped()
        .string_cell_with("status", "idle")
        .unwrap();

    engine.backend(None).set_fail_writes(true);
    cell.set("running".to_string());
    settle().await;

    // The failed persist is swallowed; the visible value is the write.
    assert_eq!(cell.get().as_deref(), Some("running"));

    // Once the engine recovers, later writes persist normally.
    engine.backend(None).set_fail_writes(false);
    cell.set("done".to_string());
    settle().await;
    assert_eq!(
        engine
            .backend(None)
            .get_string("status")
            .await
            .unwrap()
            .as_deref(),
        Some("done")
    );
}
