//! Test helpers for the Arc wallet crates.

#![warn(unused_crate_dependencies, unreachable_pub)]

#[macro_use]
extern crate tracing;

mod mock;
pub use mock::MockWallet;

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
