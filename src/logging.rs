//! Diagnostic logging setup.
//!
//! Log events go to stderr so stdout stays free for machine-readable output.
//! `RUST_LOG` takes precedence; otherwise the level follows the `-v` count.

use std::io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "depthframe=warn",
        1 => "depthframe=info",
        2 => "depthframe=debug",
        _ => "depthframe=trace",
    }
}

/// Install the global subscriber.
///
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_by_verbosity() {
        assert_eq!(default_directive(0), "depthframe=warn");
        assert_eq!(default_directive(2), "depthframe=debug");
        assert_eq!(default_directive(9), "depthframe=trace");
    }

    #[test]
    fn test_init_twice() {
        init(0);
        init(1);
    }
}
