pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, toml_config::TomlConfig, SyncSettings};
pub use core::{engine::SyncEngine, pipeline::SyncPipeline};
pub use domain::model::SyncReport;
pub use utils::error::{Result, SyncError};
