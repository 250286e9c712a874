//! Logging for patch runner tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

/// Quiet by default; driver chatter stays at warn even when a test raises
/// the crate level through `TEST_LOG=patch_infra=debug`.
pub const DEFAULT_FILTER: &str = "warn,sqlx=warn,sea_orm=warn";

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Filter directives from `TEST_LOG`, then `RUST_LOG`, then [`DEFAULT_FILTER`].
/// Unparseable directives fall back to the default instead of failing the test.
pub fn filter_from<F>(lookup: F) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    lookup("TEST_LOG")
        .or_else(|| lookup("RUST_LOG"))
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the test subscriber once per test binary. Safe to call from every test.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        fmt()
            .with_env_filter(filter_from(|name| std::env::var(name).ok()))
            .with_test_writer()
            .without_time()
            .with_target(false)
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::EnvFilter;

    use super::{filter_from, init, DEFAULT_FILTER};

    #[test]
    fn default_filter_applies_without_env() {
        let filter = filter_from(|_| None);
        assert_eq!(filter.to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
    }

    #[test]
    fn test_log_wins_over_rust_log() {
        let filter = filter_from(|name| match name {
            "TEST_LOG" => Some("patch_infra=debug".to_string()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        });
        assert_eq!(filter.to_string(), "patch_infra=debug");
    }

    #[test]
    fn malformed_directives_fall_back_to_default() {
        let filter = filter_from(|name| (name == "TEST_LOG").then(|| "patch_infra=[".to_string()));
        assert_eq!(filter.to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        tracing::info!("logging initialized twice without panicking");
    }
}
