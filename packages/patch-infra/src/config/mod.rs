pub mod runner;
pub mod store;

use crate::error::PatchError;

/// Get a required variable from the lookup or return a configuration error.
pub(crate) fn must_var<F>(lookup: &F, name: &str) -> Result<String, PatchError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PatchError::config(format!("Required environment variable '{name}' is not set")))
}

pub(crate) fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
