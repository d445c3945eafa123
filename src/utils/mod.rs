//! Utilities: logging setup (tracing to stderr, RUST_LOG aware) and small
//! environment helpers.
//!
//! Key items:
//!   init_logging / derive_level
//!   env_path

use std::path::PathBuf;

/// Logging helpers.
pub mod logging {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;

    /// Map `-q` / `-v` / `-vv` to a default level. `RUST_LOG` still wins.
    pub fn derive_level(verbose: u8, quiet: bool) -> LevelFilter {
        if quiet {
            return LevelFilter::ERROR;
        }
        match verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Install the global subscriber. Logs go to stderr so stdout stays
    /// reserved for command results. A second call is a no-op.
    pub fn init_logging(level: LevelFilter) {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

/// Non-empty environment value as a path (blank values count as unset).
pub fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn level_from_flags() {
        assert_eq!(derive_level(0, false), LevelFilter::INFO);
        assert_eq!(derive_level(1, false), LevelFilter::DEBUG);
        assert_eq!(derive_level(5, false), LevelFilter::TRACE);
        assert_eq!(derive_level(2, true), LevelFilter::ERROR);
    }

    #[test]
    fn env_path_ignores_unset() {
        assert_eq!(env_path("CMDLANG_TEST_SURELY_UNSET_VAR"), None);
    }
}
