use std::time::Duration;

use patch_infra::{connect, ConnectionHandle, RunnerSettings, StoreConfig};

pub fn fast_settings() -> RunnerSettings {
    RunnerSettings::default()
        .with_command_delay(Duration::ZERO)
        .with_connect_timeout(Duration::from_secs(2))
}

/// Fresh single-connection in-memory SQLite store.
pub async fn memory_store() -> ConnectionHandle {
    patch_test_support::test_logging::init();
    connect(&StoreConfig::new("sqlite::memory:", None), &fast_settings())
        .await
        .expect("in-memory sqlite should connect")
}

pub async fn seed_work_orders(handle: &ConnectionHandle) {
    use patch_infra::Store;

    handle
        .execute_raw(
            "CREATE TABLE work_orders (id INTEGER PRIMARY KEY, code TEXT NOT NULL, status TEXT, qty INTEGER)",
        )
        .await
        .expect("create work_orders");
    handle
        .execute_raw(
            "INSERT INTO work_orders (id, code, status, qty) VALUES (1, 'WO-1', 'released', 10), (2, 'WO-2', NULL, 5)",
        )
        .await
        .expect("seed work_orders");
}
