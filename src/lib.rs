//! Export of trained Tsetlin machine parameters into fixed-layout binary artifacts.
/// Tool directories for config and logs.
pub mod app_dirs;
/// TOML export configuration.
pub mod config;
/// Artifact codec: header, layout transforms, writer and reader.
pub mod export;
/// Logging setup for the command line tools.
pub mod logging;
/// Model snapshots and provider state files.
pub mod model;
