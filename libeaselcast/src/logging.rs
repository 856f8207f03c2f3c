//! Diagnostic logging for the Easelcast binaries
//!
//! All four bins run headlessly under cron, so logging goes to stderr and
//! stays out of the way of their stdout output (lists, JSON, summaries).
//! Setting `EASELCAST_LOG_FORMAT=json` switches to one JSON object per
//! line for log shippers. This is separate from the publish audit trail
//! (see [`crate::post_log`]), which records attempts, not diagnostics.

use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber for a binary.
///
/// `default_level` is the floor used when neither `RUST_LOG` nor
/// `EASELCAST_LOG_LEVEL` is set; the trigger bins run at `info`, the
/// operator bins at `warn` so command output stays clean. `--verbose`
/// overrides everything to debug.
///
/// # Panics
///
/// Panics if a subscriber has already been installed.
pub fn init(default_level: &str, verbose: bool) {
    let filter = env_filter(default_level, verbose);

    if json_output() {
        tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

fn env_filter(default_level: &str, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    if let Ok(directives) = std::env::var("EASELCAST_LOG_LEVEL") {
        return EnvFilter::new(directives);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn json_output() -> bool {
    std::env::var("EASELCAST_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"))
}
