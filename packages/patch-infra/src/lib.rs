//! Schema-patch runner infrastructure.
//! Used by the `patch-runner` CLI and by the MES maintenance tooling.

pub mod config;
pub mod error;
pub mod infra;
pub mod patch;

pub use config::runner::RunnerSettings;
pub use config::store::{Credential, StoreConfig};
pub use error::PatchError;
pub use infra::db::core::{connect, sanitize_db_url, ConnectionHandle};
pub use infra::db::store::{Filter, Store};
pub use patch::command::{Command, CommandList};
pub use patch::executor::{execute, ExecutionResult};
pub use patch::report::{report, summarize, Summary};
pub use patch::run::{orchestrate_patch, run_patch, PatchRun};
pub use patch::verifier::{probe, probe_all, ProbeResult};
pub use sea_orm::DbErr;
