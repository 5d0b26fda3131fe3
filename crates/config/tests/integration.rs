//! End-to-end tests: files on disk, layering, reload and bootstrap.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use strata_config::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write `content` and pin the file's mtime to `secs` past the epoch
fn write_config(path: &Path, content: &str, secs: u64) {
    std::fs::write(path, content).unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn memory(value: Value) -> Arc<MemorySource> {
    Arc::new(MemorySource::new(Partial::try_from(value).unwrap()))
}

#[tokio::test]
async fn file_change_triggers_exactly_one_rebuild() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.json");
    write_config(&path, r#"{"server": {"port": 8080, "host": "localhost"}}"#, 1_000_000);

    let changes = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&changes);

    let config = ConfigBuilder::new()
        .with_source("defaults", 0, memory(json!({"server": {"workers": 4}})))
        .with_source(
            "file",
            10,
            Arc::new(ObservableFileSource::open(&path).await.unwrap()),
        )
        .with_observer("server.port", move |old, new| {
            seen.lock().unwrap().push((old.clone(), new.clone()));
        })
        .build()
        .await
        .unwrap();

    assert_eq!(config.get_int("server.port").await.unwrap(), 8080);
    assert_eq!(config.get_int("server.workers").await.unwrap(), 4);

    // Nothing changed on disk
    let revision = config.revision().await;
    assert!(!config.reload().await);
    assert_eq!(config.revision().await, revision);

    write_config(&path, r#"{"server": {"port": 9090, "host": "localhost"}}"#, 1_000_060);
    assert!(config.reload().await);
    assert_eq!(config.revision().await, revision + 1);
    assert_eq!(config.get_int("server.port").await.unwrap(), 9090);
    assert_eq!(config.get_int("server.workers").await.unwrap(), 4);

    assert_eq!(
        *changes.lock().unwrap(),
        vec![(json!(8080), json!(9090))]
    );

    config.close().await;
}

#[tokio::test]
async fn background_reload_picks_up_file_changes() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.toml");
    write_config(&path, "level = \"info\"\n", 1_000_000);

    let config = ConfigBuilder::new()
        .with_reload_period(Duration::from_millis(20))
        .with_source(
            "file",
            0,
            Arc::new(ObservableFileSource::open(&path).await.unwrap()),
        )
        .build()
        .await
        .unwrap();
    assert_eq!(config.reload_period(), Some(Duration::from_millis(20)));
    assert_eq!(config.get_string("level").await.unwrap(), "info");

    write_config(&path, "level = \"debug\"\n", 1_000_060);

    let updated = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if config.get_string("level").await.unwrap() == "debug" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(updated.is_ok(), "background reload never applied the change");

    config.close().await;
}

#[tokio::test]
async fn failed_reload_keeps_last_good_tree() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.json");
    write_config(&path, r#"{"name": "svc"}"#, 1_000_000);

    let config = Config::new();
    config
        .add_source(
            "file",
            0,
            Arc::new(ObservableFileSource::open(&path).await.unwrap()),
        )
        .await
        .unwrap();

    std::fs::remove_file(&path).unwrap();
    assert!(!config.reload().await);
    assert_eq!(config.reload_failures(), 1);
    assert_eq!(config.get_string("name").await.unwrap(), "svc");

    // A broken file is a failure too
    write_config(&path, "{broken", 1_000_060);
    assert!(!config.reload().await);
    assert_eq!(config.reload_failures(), 2);
    assert_eq!(config.get_string("name").await.unwrap(), "svc");
}

#[tokio::test]
async fn layering_follows_priority_and_survives_removal() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("base.json");
    write_config(
        &path,
        r#"{"db": {"host": "db.internal", "pool": {"max": 10, "min": 1}}}"#,
        1_000_000,
    );

    let config = Config::new();
    config
        .add_source("base", 0, Arc::new(FileSource::open(&path).await.unwrap()))
        .await
        .unwrap();
    config
        .add_source("override", 50, memory(json!({"db": {"pool": {"max": 50}}})))
        .await
        .unwrap();

    assert_eq!(
        config.get("db").await,
        Some(json!({"host": "db.internal", "pool": {"max": 50, "min": 1}}))
    );

    config.set_source_priority("override", -1).await.unwrap();
    assert_eq!(config.get_int("db.pool.max").await.unwrap(), 10);

    assert!(config.remove_source("base").await);
    assert_eq!(config.get("db").await, Some(json!({"pool": {"max": 50}})));
    assert_eq!(config.source_ids().await, vec!["override"]);
}

#[cfg(feature = "toml")]
#[tokio::test]
async fn bootstrap_from_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_config(
        &dir.path().join("bootstrap.toml"),
        r#"
[[strata.sources]]
id = "defaults"
type = "file"
path = "defaults.json"

[[strata.sources]]
id = "local"
priority = 10
type = "observable_file"
path = "local.toml"
"#,
        1_000_000,
    );
    write_config(
        &dir.path().join("defaults.json"),
        r#"{"server": {"port": 8080, "host": "0.0.0.0"}}"#,
        1_000_000,
    );
    write_config(&dir.path().join("local.toml"), "[server]\nport = 3000\n", 1_000_000);

    let factory = SourceFactory::with_base_dir(dir.path());
    let config = Config::new();
    let bootstrap = factory
        .create(&SourceSpec::File {
            path: "bootstrap.toml".into(),
            format: None,
        })
        .await
        .unwrap();
    config.add_source("bootstrap", i32::MIN, bootstrap).await.unwrap();

    assert_eq!(factory.bootstrap(&config).await.unwrap(), 2);
    assert_eq!(
        config.source_ids().await,
        vec!["bootstrap", "defaults", "local"]
    );
    assert_eq!(config.get_int("server.port").await.unwrap(), 3000);
    assert_eq!(config.get_string("server.host").await.unwrap(), "0.0.0.0");

    write_config(&dir.path().join("local.toml"), "[server]\nport = 4000\n", 1_000_060);
    assert!(config.reload().await);
    assert_eq!(config.get_int("server.port").await.unwrap(), 4000);
}

#[tokio::test]
async fn closed_config_rejects_registration() {
    init_tracing();
    let config = Config::new();
    config
        .add_source("defaults", 0, memory(json!({"a": 1})))
        .await
        .unwrap();

    config.close().await;
    config.close().await;

    assert!(config.is_closed().await);
    assert_eq!(
        config.add_source("late", 0, memory(json!({}))).await,
        Err(ConfigError::Closed)
    );
    assert_eq!(
        config.add_observer("a", |_, _| {}).await,
        Err(ConfigError::Closed)
    );
    assert_eq!(config.get_int("a").await.unwrap(), 1);
}
