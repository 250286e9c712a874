use tracing::{info, warn};

use crate::error::PatchError;
use crate::infra::db::store::Store;

/// Result of a read-only smoke probe against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub table: String,
    pub reachable: bool,
    pub error: Option<String>,
}

/// Fetch at most one row from `table`. Never mutates state and never fails the run.
pub async fn probe<S>(store: &S, table: &str) -> ProbeResult
where
    S: Store + ?Sized,
{
    match store.select_rows(table, None, 1).await {
        Ok(rows) => {
            info!(table = table, rows = rows.len(), "probe=reachable");
            ProbeResult {
                table: table.to_string(),
                reachable: true,
                error: None,
            }
        }
        Err(e) => {
            let err = PatchError::Query {
                table: table.to_string(),
                message: e.to_string(),
            };
            warn!(error = %err, "probe=unreachable");
            ProbeResult {
                table: table.to_string(),
                reachable: false,
                error: Some(err.to_string()),
            }
        }
    }
}

pub async fn probe_all<S, T>(store: &S, tables: &[T]) -> Vec<ProbeResult>
where
    S: Store + ?Sized,
    T: AsRef<str>,
{
    let mut results = Vec::with_capacity(tables.len());
    for table in tables {
        results.push(probe(store, table.as_ref()).await);
    }
    results
}
