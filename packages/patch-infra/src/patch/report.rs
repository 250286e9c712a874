use std::fmt;

use tracing::{info, warn};

use crate::patch::command::preview;
use crate::patch::executor::ExecutionResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

pub fn summarize(results: &[ExecutionResult]) -> Summary {
    let succeeded = results.iter().filter(|r| r.succeeded()).count();
    Summary {
        succeeded,
        failed: results.len() - succeeded,
    }
}

/// Log each failure with its command, then the summary line.
pub fn report(results: &[ExecutionResult]) -> Summary {
    for result in results.iter().filter(|r| !r.succeeded()) {
        warn!(
            "❌ #{} {}: {}",
            result.command.ordinal,
            preview(&result.command.statement),
            result.error_message().unwrap_or_default()
        );
    }

    let summary = summarize(results);
    if summary.failed == 0 {
        info!("✅ {summary}");
    } else {
        info!("⚠ {summary}");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::{summarize, Summary};
    use crate::error::PatchError;
    use crate::patch::command::{Command, CommandList};
    use crate::patch::executor::ExecutionResult;

    fn ok(command: &Command) -> ExecutionResult {
        ExecutionResult {
            command: command.clone(),
            outcome: Ok(0),
        }
    }

    fn failed(command: &Command) -> ExecutionResult {
        ExecutionResult {
            command: command.clone(),
            outcome: Err(PatchError::Command {
                ordinal: command.ordinal,
                statement: command.statement.clone(),
                message: "boom".into(),
            }),
        }
    }

    #[test]
    fn counts_sum_to_input_length() {
        let commands = CommandList::from_statements(["a", "b", "c", "d", "e"]);
        let results: Vec<ExecutionResult> = commands
            .iter()
            .map(|c| if c.ordinal % 2 == 0 { failed(c) } else { ok(c) })
            .collect();
        let summary = summarize(&results);
        assert_eq!(summary, Summary { succeeded: 3, failed: 2 });
        assert_eq!(summary.total(), results.len());
    }

    #[test]
    fn summary_line_format() {
        assert_eq!(
            Summary { succeeded: 2, failed: 0 }.to_string(),
            "2 succeeded, 0 failed"
        );
        assert_eq!(summarize(&[]).to_string(), "0 succeeded, 0 failed");
    }
}
