use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use patch_infra::config::store::STORE_URL_VAR;
use patch_infra::{
    connect, probe_all, run_patch, CommandList, ConnectionHandle, DbErr, Filter, PatchError,
    RunnerSettings, Store, StoreConfig,
};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit code when the store cannot be reached or a single-shot operation fails.
const EXIT_FAILURE: i32 = 1;
/// Exit code for usage and configuration errors.
const EXIT_USAGE: i32 = 2;

#[derive(Parser)]
#[command(name = "patch-runner")]
#[command(about = "MES schema-patch runner")]
struct Args {
    /// Store endpoint URL (overrides PATCH_STORE_URL). The credential is
    /// only ever read from PATCH_STORE_CREDENTIAL.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply a SQL patch file, one statement at a time
    Apply {
        /// Patch file; statements are separated by top-level semicolons
        file: PathBuf,

        /// Table to probe after the patch (repeatable)
        #[arg(long = "verify", value_name = "TABLE")]
        verify: Vec<String>,

        /// Pause between statements, overriding PATCH_COMMAND_DELAY_MS
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,
    },
    /// Check that tables can be read
    Probe {
        #[arg(required = true, value_name = "TABLE")]
        tables: Vec<String>,
    },
    /// Print rows from a table as JSON lines
    Rows {
        table: String,

        /// Equality filter, e.g. --where status=released
        #[arg(long = "where", value_name = "COL=VALUE")]
        filter: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Insert one row given as a flat JSON object
    Insert { table: String, row: String },
    /// Delete a row by its identifier
    Delete {
        table: String,
        id: String,

        #[arg(long, default_value = "id")]
        id_column: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn,sea_orm=warn")),
        )
        .init();

    let args = Args::parse();
    let code = run_cli(args, |name| std::env::var(name).ok()).await;
    std::process::exit(code);
}

/// Exit code for an error that stops the run before or while connecting.
fn exit_code(err: &PatchError) -> i32 {
    match err {
        PatchError::Config { .. } => EXIT_USAGE,
        _ => EXIT_FAILURE,
    }
}

/// Everything `main` does after logging is set up, returning the exit code.
async fn run_cli<F>(args: Args, lookup: F) -> i32
where
    F: Fn(&str) -> Option<String>,
{
    let config = match load_store_config(args.endpoint.as_deref(), &lookup) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            return exit_code(&e);
        }
    };
    let mut settings = match RunnerSettings::from_lookup(&lookup) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {e}");
            return exit_code(&e);
        }
    };

    // Parse everything that can fail before opening a connection.
    let op = match prepare(args.command, &mut settings) {
        Ok(op) => op,
        Err(e) => {
            eprintln!("❌ {e}");
            return exit_code(&e);
        }
    };

    let handle = match connect(&config, &settings).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Connection failed: {e}");
            return exit_code(&e);
        }
    };

    let code = run(op, &handle, &settings).await;

    if let Err(e) = handle.close().await {
        warn!(error = %e, "Failed to close connection");
    }
    code
}

fn load_store_config<F>(endpoint: Option<&str>, lookup: &F) -> Result<StoreConfig, PatchError>
where
    F: Fn(&str) -> Option<String>,
{
    StoreConfig::from_lookup(|name| match endpoint {
        Some(endpoint) if name == STORE_URL_VAR => Some(endpoint.to_string()),
        _ => lookup(name),
    })
}

enum Op {
    Apply {
        commands: CommandList,
        verify: Vec<String>,
    },
    Probe {
        tables: Vec<String>,
    },
    Rows {
        table: String,
        filter: Option<Filter>,
        limit: u64,
    },
    Insert {
        table: String,
        row: Map<String, Value>,
    },
    Delete {
        table: String,
        id_column: String,
        id: Value,
    },
}

fn prepare(cmd: Cmd, settings: &mut RunnerSettings) -> Result<Op, PatchError> {
    match cmd {
        Cmd::Apply {
            file,
            verify,
            delay_ms,
        } => {
            if let Some(ms) = delay_ms {
                *settings = settings.with_command_delay(Duration::from_millis(ms));
            }
            let commands = CommandList::from_file(&file)?;
            if commands.is_empty() {
                return Err(PatchError::config(format!(
                    "patch file {} holds no statements",
                    file.display()
                )));
            }
            Ok(Op::Apply { commands, verify })
        }
        Cmd::Probe { tables } => Ok(Op::Probe { tables }),
        Cmd::Rows {
            table,
            filter,
            limit,
        } => {
            let filter = filter.as_deref().map(Filter::parse).transpose()?;
            Ok(Op::Rows {
                table,
                filter,
                limit,
            })
        }
        Cmd::Insert { table, row } => match serde_json::from_str::<Value>(&row) {
            Ok(Value::Object(row)) => Ok(Op::Insert { table, row }),
            Ok(_) => Err(PatchError::config("row must be a JSON object")),
            Err(e) => Err(PatchError::config(format!("row is not valid JSON: {e}"))),
        },
        Cmd::Delete {
            table,
            id,
            id_column,
        } => {
            let id = serde_json::from_str(&id).unwrap_or(Value::String(id));
            Ok(Op::Delete {
                table,
                id_column,
                id,
            })
        }
    }
}

async fn run(op: Op, handle: &ConnectionHandle, settings: &RunnerSettings) -> i32 {
    match op {
        Op::Apply { commands, verify } => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received; remaining statements will be skipped");
                    on_signal.cancel();
                }
            });

            // Individual statement and probe failures are already reported.
            run_patch(handle, &commands, verify.as_slice(), settings, &cancel).await;
            0
        }
        Op::Probe { tables } => {
            for probe in probe_all(handle, tables.as_slice()).await {
                match &probe.error {
                    None => info!("✅ {} reachable", probe.table),
                    Some(e) => warn!("❌ {} unreachable: {e}", probe.table),
                }
            }
            0
        }
        Op::Rows {
            table,
            filter,
            limit,
        } => match handle.select_rows(&table, filter.as_ref(), limit).await {
            Ok(rows) => {
                for row in &rows {
                    println!("{row}");
                }
                info!("{} row(s) from {table}", rows.len());
                0
            }
            Err(e) => {
                error!("{}", query_error(&table, e));
                EXIT_FAILURE
            }
        },
        Op::Insert { table, row } => match handle.insert_row(&table, &row).await {
            Ok(n) => {
                info!("inserted {n} row(s) into {table}");
                0
            }
            Err(e) => {
                error!("{}", query_error(&table, e));
                EXIT_FAILURE
            }
        },
        Op::Delete {
            table,
            id_column,
            id,
        } => match handle.delete_by_id(&table, &id_column, &id).await {
            Ok(0) => {
                warn!("no row in {table} with {id_column}={id}");
                0
            }
            Ok(n) => {
                info!("deleted {n} row(s) from {table}");
                0
            }
            Err(e) => {
                error!("{}", query_error(&table, e));
                EXIT_FAILURE
            }
        },
    }
}

fn query_error(table: &str, e: DbErr) -> PatchError {
    PatchError::Query {
        table: table.to_string(),
        message: e.to_string(),
    }
}
