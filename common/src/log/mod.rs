pub mod tracing_factory;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initializes a bare tracing subscriber for unit/integration tests.
/// Safe to call more than once: the second call's error (global subscriber
/// already set) is ignored.
pub fn init_test_log() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
