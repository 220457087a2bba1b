//! Subscriber setup shared by the binaries.
//!
//! Logs always go to stderr: stdout belongs to the terminal display and the
//! end-of-run summary.

use tracing_subscriber::EnvFilter;

/// Loads `.env`, then installs the global subscriber. `RUST_LOG` (from the
/// process or from `.env`) wins over `default_directives`.
pub fn init(default_directives: &str) {
    // NOTE - .env first, it may carry RUST_LOG
    dotenvy::dotenv().ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter(rust_log.as_deref(), default_directives))
        .with_writer(std::io::stderr)
        .init();
}

/// `rust_log` when it parses, the defaults otherwise.
pub fn filter(rust_log: Option<&str>, default_directives: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_the_defaults() {
        let filter = filter(Some("homerun=debug"), "homerun=info");
        assert_eq!(filter.to_string(), "homerun=debug");
    }

    #[test]
    fn missing_or_broken_rust_log_falls_back() {
        assert_eq!(filter(None, "homerun=info").to_string(), "homerun=info");
        assert_eq!(
            filter(Some("homerun=[nope"), "homerun=info").to_string(),
            "homerun=info"
        );
    }
}
