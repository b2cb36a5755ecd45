use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default filter directive applied when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

// Guards the global subscriber installation for tests. Installing a
// subscriber twice panics, and the test harness runs many tests in one
// process, so initialization must happen at most once.
static TEST_TRACING: Once = Once::new();

/// Installs the global tracing subscriber for a service binary.
///
/// The filter is taken from `RUST_LOG` when present, falling back to
/// [`DEFAULT_FILTER`]. Call this exactly once, at process start, before any
/// spans or events are emitted.
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("tracing initialized for service '{}'", service_name);
}

/// Installs a test-friendly tracing subscriber at most once per process.
///
/// Output goes through the libtest capture writer so logs only show up for
/// failing tests.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
