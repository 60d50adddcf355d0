/*!
Logging initialization for the demo binary.

`RUST_LOG` wins when set. Otherwise debug builds log at `debug` and release
builds at `info`. With the `profiling` feature, `profiling::scope!` spans are
emitted as tracing spans and show up in the same output.
*/

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

fn default_directives() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives()));

    let fmt_layer = fmt::layer().with_filter(filter);
    let registry = tracing_subscriber::registry().with(fmt_layer);
    registry.init();

    tracing::info!(
        "Logging initialized (profiling {})",
        if cfg!(feature = "profiling") {
            "enabled"
        } else {
            "disabled"
        }
    );
}
