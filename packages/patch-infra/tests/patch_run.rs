mod support;

use std::time::Duration;

use patch_infra::{
    orchestrate_patch, probe, run_patch, CommandList, PatchError, RunnerSettings, Store,
    StoreConfig,
};
use tokio_util::sync::CancellationToken;

use support::{fast_settings, memory_store, seed_work_orders};

const NO_TABLES: &[&str] = &[];

#[tokio::test]
async fn drop_then_create_both_succeed() {
    let handle = memory_store().await;
    let commands = CommandList::from_statements([
        "DROP TABLE IF EXISTS shifts",
        "CREATE TABLE shifts (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    ]);

    let run = run_patch(
        &handle,
        &commands,
        &["shifts"],
        &fast_settings(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(run.summary.to_string(), "2 succeeded, 0 failed");
    assert_eq!(run.results.len(), 2);
    assert!(run.probes[0].reachable);
}

#[tokio::test]
async fn altering_a_missing_table_is_recorded_not_fatal() {
    let handle = memory_store().await;
    let commands =
        CommandList::from_statements(["ALTER TABLE missing_table ADD COLUMN shift_code TEXT"]);

    let run = run_patch(
        &handle,
        &commands,
        NO_TABLES,
        &fast_settings(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(run.summary.to_string(), "0 succeeded, 1 failed");
    match &run.results[0].outcome {
        Err(PatchError::Command { ordinal, message, .. }) => {
            assert_eq!(*ordinal, 1);
            assert!(message.contains("missing_table"), "message: {message}");
        }
        other => panic!("expected command error, got {other:?}"),
    }
}

#[tokio::test]
async fn later_commands_run_after_a_failure() {
    let handle = memory_store().await;
    let commands = CommandList::parse(
        "ALTER TABLE nope ADD COLUMN x INT;\n\
         CREATE TABLE IF NOT EXISTS lines (id INTEGER PRIMARY KEY, capacity INT);\n\
         INSERT INTO lines (id, capacity) VALUES (1, 40);",
    );

    let run = run_patch(
        &handle,
        &commands,
        &["lines"],
        &fast_settings(),
        &CancellationToken::new(),
    )
    .await;

    let flags: Vec<bool> = run.results.iter().map(|r| r.succeeded()).collect();
    assert_eq!(flags, vec![false, true, true]);
    assert_eq!(run.summary.succeeded + run.summary.failed, commands.len());

    let rows = handle.select_rows("lines", None, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn probe_distinguishes_existing_and_missing_tables() {
    let handle = memory_store().await;
    seed_work_orders(&handle).await;

    let present = probe(&handle, "work_orders").await;
    assert!(present.reachable);
    assert!(present.error.is_none());

    let missing = probe(&handle, "no_such_table").await;
    assert!(!missing.reachable);
    assert!(missing.error.as_deref().unwrap_or_default().contains("no_such_table"));
}

#[tokio::test]
async fn probe_reports_empty_tables_as_reachable() {
    let handle = memory_store().await;
    handle
        .execute_raw("CREATE TABLE downtime_events (id INTEGER PRIMARY KEY)")
        .await
        .unwrap();
    assert!(probe(&handle, "downtime_events").await.reachable);
}

#[tokio::test]
async fn unreachable_store_produces_no_results() {
    patch_test_support::test_logging::init();
    let config = StoreConfig::new(
        "postgres://svc@127.0.0.1:1/mes",
        Some(patch_infra::Credential::new("hunter2")),
    );
    let settings = RunnerSettings::default()
        .with_command_delay(Duration::ZERO)
        .with_connect_timeout(Duration::from_millis(500));
    let commands = CommandList::from_statements(["CREATE TABLE x (id INT)"]);

    let err = orchestrate_patch(
        &config,
        &settings,
        &commands,
        NO_TABLES,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, PatchError::Unreachable { .. }), "got {err:?}");
    assert!(!err.to_string().contains("hunter2"));
}

#[tokio::test]
async fn unsupported_scheme_is_fatal_and_redacted() {
    patch_test_support::test_logging::init();
    let config = StoreConfig::new(
        "carrierpigeon://svc@loft/mes",
        Some(patch_infra::Credential::new("hunter2")),
    );

    let err = orchestrate_patch(
        &config,
        &fast_settings(),
        &CommandList::from_statements(["SELECT 1"]),
        NO_TABLES,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(err.is_fatal());
    assert!(!err.to_string().contains("hunter2"));
}

#[tokio::test]
async fn orchestrated_run_against_sqlite_completes() {
    patch_test_support::test_logging::init();
    let commands = CommandList::parse(
        "CREATE TABLE IF NOT EXISTS operators (id INTEGER PRIMARY KEY, badge TEXT);\n\
         ALTER TABLE ghosts ADD COLUMN x INT;",
    );

    let run = orchestrate_patch(
        &StoreConfig::new("sqlite::memory:", None),
        &fast_settings(),
        &commands,
        &["operators", "ghosts"],
        &CancellationToken::new(),
    )
    .await
    .expect("sqlite connects");

    assert_eq!(run.summary.to_string(), "1 succeeded, 1 failed");
    let reachable: Vec<bool> = run.probes.iter().map(|p| p.reachable).collect();
    assert_eq!(reachable, vec![true, false]);
}
