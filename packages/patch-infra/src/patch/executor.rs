use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::PatchError;
use crate::infra::db::store::Store;
use crate::patch::command::{preview, Command, CommandList};

const CANCELLED_MESSAGE: &str = "cancelled before execution";

/// Outcome of one command: rows affected on success, the recorded error otherwise.
#[derive(Debug)]
pub struct ExecutionResult {
    pub command: Command,
    pub outcome: Result<u64, PatchError>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.outcome {
            Ok(_) => None,
            Err(PatchError::Command { message, .. }) => Some(message.clone()),
            Err(other) => Some(other.to_string()),
        }
    }

    fn failed(command: &Command, message: impl Into<String>) -> Self {
        Self {
            command: command.clone(),
            outcome: Err(PatchError::Command {
                ordinal: command.ordinal,
                statement: command.statement.clone(),
                message: message.into(),
            }),
        }
    }
}

/// Run every command in order, recording one result per command.
///
/// A failing command is logged and the batch moves on. Consecutive commands
/// are separated by `delay`; if `cancel` fires, the remaining commands are
/// recorded as failed without being sent.
pub async fn execute<S>(
    store: &S,
    commands: &CommandList,
    delay: Duration,
    cancel: &CancellationToken,
) -> Vec<ExecutionResult>
where
    S: Store + ?Sized,
{
    let total = commands.len();
    let mut results = Vec::with_capacity(total);
    let mut cancelled = cancel.is_cancelled();

    for (idx, command) in commands.iter().enumerate() {
        if idx > 0 && !cancelled && !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    info!(remaining = total - idx, "Patch run cancelled during pause");
                    cancelled = true;
                }
            }
        }
        if !cancelled && cancel.is_cancelled() {
            cancelled = true;
        }

        if cancelled {
            results.push(ExecutionResult::failed(command, CANCELLED_MESSAGE));
            continue;
        }

        info!("[{}/{}] running {}", command.ordinal, total, preview(&command.statement));

        let result = match store.execute_raw(&command.statement).await {
            Ok(rows_affected) => {
                info!(
                    "[{}/{}] ok rows_affected={}",
                    command.ordinal, total, rows_affected
                );
                ExecutionResult {
                    command: command.clone(),
                    outcome: Ok(rows_affected),
                }
            }
            Err(e) => {
                warn!("[{}/{}] failed: {}", command.ordinal, total, e);
                ExecutionResult::failed(command, e.to_string())
            }
        };
        results.push(result);
    }

    results
}
