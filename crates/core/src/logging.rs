//! Tracing subscriber setup for embedders

use tracing_subscriber::EnvFilter;

use crate::config::HookConfig;

/// Default filter directive when `RUST_LOG` is unset
pub fn default_directive(config: &HookConfig) -> &'static str {
    if config.debug {
        "debug"
    } else {
        "info"
    }
}

/// Install a fmt subscriber
///
/// `RUST_LOG` takes precedence over the config. Does nothing if a global
/// subscriber is already set, so calling it on every load is fine.
pub fn init(config: &HookConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
