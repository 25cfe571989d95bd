//! Logging infrastructure for ragline.
//!
//! This module initializes the tracing subscriber for structured logging.
//! All logs are emitted to stderr to keep stdout clean for command output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

const RAGLINE_CRATES: &[&str] = &[
    "ragline",
    "ragline_core",
    "ragline_llm",
    "ragline_knowledge",
    "ragline_history",
];

/// Level for third-party crates when only a bare level is given.
const DEPENDENCY_LEVEL: &str = "warn";

/// Initialize the tracing subscriber with stderr output.
///
/// # Arguments
/// * `log_level` - Optional filter override (e.g., "debug", "ragline_knowledge=trace").
///   A bare level applies to the ragline crates only; dependencies stay at `warn`.
/// * `no_color` - Disable colored output
///
/// # Example
/// ```no_run
/// use ragline_core::logging::init_logging;
///
/// init_logging(None, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    let env_filter = EnvFilter::try_new(filter_directives(filter_str))
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

/// Expand a bare level into per-crate directives; full filter strings pass through.
fn filter_directives(filter: &str) -> String {
    let filter = filter.trim();
    if filter.is_empty() || filter.contains('=') || filter.contains(',') {
        return filter.to_string();
    }

    let mut directives = vec![DEPENDENCY_LEVEL.to_string()];
    directives.extend(RAGLINE_CRATES.iter().map(|krate| format!("{}={}", krate, filter)));
    directives.join(",")
}

fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_scoped_to_ragline_crates() {
        let directives = filter_directives("debug");
        assert!(directives.starts_with("warn,ragline=debug,"));
        assert!(directives.contains("ragline_knowledge=debug"));
        assert!(!directives.contains("reqwest"));
    }

    #[test]
    fn test_explicit_filter_passes_through() {
        assert_eq!(filter_directives("hyper=trace"), "hyper=trace");
        assert_eq!(filter_directives("info,ragline_llm=trace"), "info,ragline_llm=trace");
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let result = init_logging(Some("ragline=loud"), true);
        assert!(result.is_err());
    }

    #[test]
    fn test_init_logging_twice() {
        // Only the first global init in a process can succeed.
        let _ = init_logging(Some("warn"), true);
        assert!(init_logging(Some("warn"), true).is_err());
    }
}
