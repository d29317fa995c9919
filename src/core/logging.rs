//! Diagnostics initialisation.
//!
//! Logs go to stderr; stdout carries command output only.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "OPS_LOG";

static INIT_ONCE: Once = Once::new();

/// Default filter for a `-v` count: 0 = warn, 1 = info, 2+ = debug.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "personal_ops=warn",
        1 => "personal_ops=info",
        _ => "personal_ops=debug",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_env(ENV_LOG)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
        if let Err(e) = installed {
            eprintln!("Warning: logging not initialised: {}", e);
        }
    });
}
