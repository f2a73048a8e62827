//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding per-module log directives.
pub const LOG_ENV: &str = "VULNGRAPH_LOG";

/// Install the global subscriber.
///
/// `VULNGRAPH_LOG` (e.g. `vulngraph::domain=debug,vulngraph::api=info`) wins
/// over `default_filter`. Later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("vulngraph=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}
