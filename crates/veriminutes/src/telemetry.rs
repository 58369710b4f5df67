//! Logging setup.
//!
//! The log level comes from `RUST_LOG` and defaults to `info`. Installing a
//! subscriber twice is harmless: the second call reports `false`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a human-readable subscriber.
///
/// ```no_run
/// veriminutes::telemetry::init();
/// tracing::info!("notary started");
/// ```
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber for log aggregation.
pub fn init_json() -> bool {
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init();
        assert!(!init_json());
    }
}
