//! Tracing subscriber setup for the CLI.
//!
//! Logs go to stderr so `--json` output on stdout stays parseable. The filter
//! comes from `CASEPORT_LOG` when set, otherwise from the verbosity flag.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "CASEPORT_LOG";

static INIT_ONCE: Once = Once::new();

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "caseport=debug" } else { "warn" }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbose: bool) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

        // Another subscriber may already be installed, e.g. by a test harness
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
