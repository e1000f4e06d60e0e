//! Tracing subscriber setup for binaries and tests embedding the pipeline

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str =
    "chartschema_core=info,chartschema_gen=info,chartschema_pipeline=info";
const VERBOSE_LOG_FILTER: &str =
    "chartschema_core=debug,chartschema_gen=debug,chartschema_pipeline=debug";

#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Default to debug output when `RUST_LOG` is unset
    pub verbose: bool,
}

/// Install a stderr subscriber filtered by `RUST_LOG`
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(config: LogConfig) -> bool {
    let default_filter = if config.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter),
        )
        .try_init()
        .is_ok()
}
