pub mod cli;
pub mod fs;
pub mod tracing;

/// Common information for the `--version` CLI flags.
pub fn version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
