use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("Authentication failed for {endpoint}: {message}")]
    Authentication { endpoint: String, message: String },
    #[error("Store unreachable at {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },
    #[error("Command #{ordinal} failed ({statement}): {message}")]
    Command {
        ordinal: usize,
        statement: String,
        message: String,
    },
    #[error("Query on table '{table}' failed: {message}")]
    Query { table: String, message: String },
}

impl PatchError {
    pub fn config(message: impl Into<String>) -> Self {
        PatchError::Config {
            message: message.into(),
        }
    }

    /// Connection-time errors abort the whole run; everything else is
    /// recorded and the run continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PatchError::Config { .. }
                | PatchError::Authentication { .. }
                | PatchError::Unreachable { .. }
        )
    }
}
