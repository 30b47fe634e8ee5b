//! Diagnostic logging setup.
//!
//! The library only emits `tracing` events; the binary installs the
//! subscriber. Logs go to stderr so command output on stdout stays clean.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "taskboard=info";
const VERBOSE_FILTER: &str = "taskboard=debug";

/// Build the filter: `RUST_LOG` wins, else the verbosity default.
pub fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: bool, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // A subscriber is already installed (tests, embedding callers).
    let _ = result;
}
