//! Logging setup for processes embedding the dev server.
//!
//! Built on `tracing-subscriber`: `--verbose` turns on debug output for the
//! kiln crates, `--quiet` keeps errors only, otherwise `RUST_LOG` decides
//! with an `info` fallback.
//!
//! ```rust,no_run
//! use kiln_hmr::logger::{init_logger, should_use_colors};
//!
//! init_logger(false, false, !should_use_colors());
//! tracing::info!("dev server ready");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "kiln_hmr=debug,kiln_graph=debug,kiln_config=debug";
const QUIET_FILTER: &str = "kiln_hmr=error,kiln_graph=error,kiln_config=error";
const DEFAULT_FILTER: &str = "kiln_hmr=info,kiln_graph=info,kiln_config=info";

/// Filter for the given flags. `verbose` wins over `quiet`.
pub fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(build_filter(verbose, quiet), no_color);
}

/// Install the global subscriber with a custom filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Whether stdout should get colored output.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::Term::stdout().features().colors_supported()
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_no_color_wins() {
        // SAFETY: tests touching the environment are serialized
        unsafe {
            std::env::set_var("NO_COLOR", "1");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(!should_use_colors());
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::remove_var("FORCE_COLOR");
        }
    }

    #[test]
    #[serial]
    fn test_force_color() {
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(should_use_colors());
        unsafe {
            std::env::remove_var("FORCE_COLOR");
        }
    }

    #[test]
    fn test_verbose_filter_enables_debug() {
        let filter = build_filter(true, true).to_string();
        assert!(filter.contains("kiln_graph=debug"));
    }

    #[test]
    fn test_quiet_filter() {
        let filter = build_filter(false, true).to_string();
        assert!(filter.contains("kiln_hmr=error"));
    }
}
