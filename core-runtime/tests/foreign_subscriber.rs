//! Logging setup when the embedding process already installed a subscriber.
//!
//! Lives in its own test binary because the global subscriber can only be
//! set once per process.

use core_runtime::logging::{init_logging, is_initialized, try_init_logging, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_existing_subscriber_is_left_in_place() {
    tracing::subscriber::set_global_default(tracing_subscriber::registry()).unwrap();

    let config = LoggingConfig::default().with_console(false);
    let err = init_logging(config.clone()).unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized(_)));
    assert!(!is_initialized());

    assert!(!try_init_logging(config).unwrap());
    assert!(is_initialized());
}
