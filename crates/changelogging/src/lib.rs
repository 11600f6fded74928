//! Build changelogs from fragments.
//!
//! Fragments are small files named `<issue>.<type>`. A build groups them by type and inserts the
//! rendered entry after a marker line of the output file.

pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

pub use crate::cli::Cli;

/// Install the stderr log subscriber, honouring `RUST_LOG` (default `warn`).
pub fn init() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}
