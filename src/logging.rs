//! Tracing subscriber setup for the binary

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "heart_classifier=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Returns false if a subscriber was already installed.
pub fn init_logging(json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
