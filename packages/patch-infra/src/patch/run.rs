//! Top-level routine for one patch run.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::runner::RunnerSettings;
use crate::config::store::StoreConfig;
use crate::error::PatchError;
use crate::infra::db::core::{connect, ConnectionHandle};
use crate::patch::command::CommandList;
use crate::patch::executor::{execute, ExecutionResult};
use crate::patch::report::{report, Summary};
use crate::patch::verifier::{probe_all, ProbeResult};

#[derive(Debug)]
pub struct PatchRun {
    pub results: Vec<ExecutionResult>,
    pub probes: Vec<ProbeResult>,
    pub summary: Summary,
}

/// Execute the command list, probe the given tables and report.
pub async fn run_patch<T>(
    handle: &ConnectionHandle,
    commands: &CommandList,
    verify_tables: &[T],
    settings: &RunnerSettings,
    cancel: &CancellationToken,
) -> PatchRun
where
    T: AsRef<str>,
{
    info!(
        "patch=start endpoint={} commands={} delay_ms={}",
        handle.endpoint(),
        commands.len(),
        settings.command_delay.as_millis()
    );

    let results = execute(handle, commands, settings.command_delay, cancel).await;
    let probes = probe_all(handle, verify_tables).await;
    let summary = report(&results);

    info!("patch=done");

    PatchRun {
        results,
        probes,
        summary,
    }
}

/// Connect, run, and release the connection.
///
/// Connection errors abort before any command runs; everything after that
/// is recorded in the returned [`PatchRun`].
pub async fn orchestrate_patch<T>(
    config: &StoreConfig,
    settings: &RunnerSettings,
    commands: &CommandList,
    verify_tables: &[T],
    cancel: &CancellationToken,
) -> Result<PatchRun, PatchError>
where
    T: AsRef<str>,
{
    let handle = connect(config, settings).await?;
    let run = run_patch(&handle, commands, verify_tables, settings, cancel).await;
    if let Err(e) = handle.close().await {
        tracing::warn!(error = %e, "Failed to close connection after patch run");
    }
    Ok(run)
}
