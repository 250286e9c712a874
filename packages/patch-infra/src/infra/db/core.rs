use std::fmt;

use percent_encoding::utf8_percent_encode;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    RuntimeErr,
};
use tracing::{info, warn};

use crate::config::runner::RunnerSettings;
use crate::config::store::{Credential, StoreConfig, USERINFO};
use crate::error::PatchError;

/// SQLSTATE codes Postgres reports for rejected credentials.
const AUTH_SQLSTATES: [&str; 2] = ["28P01", "28000"];

/// Authenticated session against the remote store.
///
/// Owned by the run's top-level routine and lent to the executor and
/// verifier. Released when dropped or via [`ConnectionHandle::close`].
pub struct ConnectionHandle {
    conn: DatabaseConnection,
    endpoint: String,
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.endpoint)
            .field("backend", &self.backend())
            .finish()
    }
}

impl ConnectionHandle {
    /// Wrap an already open connection. The endpoint is sanitized before it is kept.
    pub fn from_connection(conn: DatabaseConnection, endpoint: &str) -> Self {
        Self {
            conn,
            endpoint: sanitize_db_url(endpoint),
        }
    }

    /// Sanitized endpoint, safe to log.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.conn.get_database_backend()
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub async fn close(self) -> Result<(), PatchError> {
        let endpoint = self.endpoint;
        self.conn
            .close()
            .await
            .map_err(|e| PatchError::Unreachable {
                endpoint,
                message: format!("failed to close connection: {e}"),
            })
    }
}

/// Open a single-connection session to the configured store.
///
/// There is no retry here; the caller decides what to do with a failure.
pub async fn connect(
    config: &StoreConfig,
    settings: &RunnerSettings,
) -> Result<ConnectionHandle, PatchError> {
    let url = config.connection_url()?;
    let endpoint = sanitize_db_url(&config.endpoint);

    let mut opt = ConnectOptions::new(url);
    opt.min_connections(1)
        .max_connections(1)
        .connect_timeout(settings.connect_timeout)
        .acquire_timeout(settings.connect_timeout)
        .sqlx_logging(true);

    info!("connect=start endpoint={}", endpoint);

    let conn = Database::connect(opt).await.map_err(|e| {
        let err = classify_connect_error(e, &endpoint, config.credential.as_ref());
        warn!(error = %err, "connect=failed");
        err
    })?;

    info!(
        "connect=ok endpoint={} backend={:?}",
        endpoint,
        conn.get_database_backend()
    );

    Ok(ConnectionHandle { conn, endpoint })
}

fn classify_connect_error(
    err: DbErr,
    endpoint: &str,
    credential: Option<&Credential>,
) -> PatchError {
    let message = redact_secret(&err.to_string(), credential);
    let endpoint = endpoint.to_string();

    match &err {
        DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
            if is_auth_failure(db_err.code().as_deref(), db_err.message()) =>
        {
            PatchError::Authentication { endpoint, message }
        }
        DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Configuration(_))) => PatchError::Config {
            message: format!("invalid endpoint {endpoint}: {message}"),
        },
        DbErr::Conn(RuntimeErr::Internal(raw)) if raw.contains("no supporting driver") => {
            PatchError::Config {
                message: format!("unsupported endpoint scheme: {endpoint}"),
            }
        }
        _ if is_auth_failure(None, &message) => PatchError::Authentication { endpoint, message },
        _ => PatchError::Unreachable { endpoint, message },
    }
}

fn is_auth_failure(sqlstate: Option<&str>, message: &str) -> bool {
    if let Some(code) = sqlstate {
        if AUTH_SQLSTATES.contains(&code) {
            return true;
        }
    }
    let lowered = message.to_ascii_lowercase();
    lowered.contains("password authentication failed")
        || lowered.contains("invalid authorization specification")
}

/// Mask the credential (raw and percent-encoded) wherever a driver echoes it back.
fn redact_secret(message: &str, credential: Option<&Credential>) -> String {
    let Some(credential) = credential else {
        return message.to_string();
    };
    let raw = credential.expose();
    if raw.is_empty() {
        return message.to_string();
    }
    let encoded = utf8_percent_encode(raw, USERINFO).to_string();
    message.replace(raw, "***").replace(&encoded, "***")
}

/// Sanitize database URL by masking password in connection strings.
/// Used for logging and error context.
pub fn sanitize_db_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let (scheme, rest) = url.split_at(scheme_end + 3);
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    let Some(at) = authority.rfind('@') else {
        return url.to_string();
    };
    let userinfo = &authority[..at];
    let host = &authority[at + 1..];

    match userinfo.find(':') {
        Some(colon) => format!("{scheme}{}:***@{host}{tail}", &userinfo[..colon]),
        None => url.to_string(),
    }
}
