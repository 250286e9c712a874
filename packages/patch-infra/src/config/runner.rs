use std::time::Duration;

use super::env_lookup;
use crate::error::PatchError;

pub const COMMAND_DELAY_VAR: &str = "PATCH_COMMAND_DELAY_MS";
pub const CONNECT_TIMEOUT_VAR: &str = "PATCH_CONNECT_TIMEOUT_MS";

const DEFAULT_COMMAND_DELAY_MS: u64 = 200;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Pacing and timeout settings for one patch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Pause between consecutive commands, to stay under the store's rate limits.
    pub command_delay: Duration,
    pub connect_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            command_delay: Duration::from_millis(DEFAULT_COMMAND_DELAY_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

impl RunnerSettings {
    pub fn from_env() -> Result<Self, PatchError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let command_delay = millis_var(&lookup, COMMAND_DELAY_VAR, DEFAULT_COMMAND_DELAY_MS)?;
        let connect_timeout = millis_var(&lookup, CONNECT_TIMEOUT_VAR, DEFAULT_CONNECT_TIMEOUT_MS)?;
        if connect_timeout.is_zero() {
            return Err(PatchError::config(format!(
                "{CONNECT_TIMEOUT_VAR} must be greater than zero"
            )));
        }
        Ok(Self {
            command_delay,
            connect_timeout,
        })
    }

    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

fn millis_var<F>(lookup: &F, name: &str, default_ms: u64) -> Result<Duration, PatchError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(Duration::from_millis(default_ms)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| {
                PatchError::config(format!(
                    "{name} must be a whole number of milliseconds, got '{raw}'"
                ))
            }),
    }
}
