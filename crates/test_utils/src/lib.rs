//! Test Utilities Crate
//!
//! Shared test infrastructure for the crudkit workspace.
//!
//! # Modules
//!
//! - `authors`: the example author domain used by every suite
//! - `generators`: random test data
//! - `contract`: the repository contract suite run against both backings

pub mod authors;
pub mod contract;
pub mod generators;

pub use authors::*;
pub use contract::*;
pub use generators::*;

use std::sync::Once;

/// Initializes test logging once per process
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
