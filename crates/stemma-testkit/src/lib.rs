//! # Stemma Testkit
//!
//! Test instrumentation for the Stemma coordination core: a scriptable
//! in-memory persistence gateway that records every call, and record
//! fixtures for session tests.

pub mod fixtures;
pub mod gateway;

pub use gateway::{RecordedCall, ScriptedGateway};

use std::sync::Once;

/// Initialize env-filtered tracing output for tests. Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
