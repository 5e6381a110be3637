//! The Myriad generator driver.
//!
//! Loads JSON class descriptors, resolves them with [`myriad_codegen`] and
//! writes the generated C files.
//!
//! # Tracing
//!
//! - `RUST_LOG=myriad_codegen=debug`: module build and class resolution.
//! - `RUST_LOG=myriad_codegen=trace`: every generated delegator and slot.

use std::sync::Once;

pub mod commands;
pub mod descriptor;
mod error;
mod session;

pub use error::DriverError;
pub use session::Session;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call more than once. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}
