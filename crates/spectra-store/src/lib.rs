//! SQLite persistence, JSON import/export and configuration for the
//! `spectra-core` analytic database.

pub mod config;
pub mod error;
pub mod json_bridge;
pub mod schema;
pub mod store;

pub use config::{CONFIG_FILENAME, Config, DB_FILENAME, ProductConfig, SeedConfig, default_data_dir};
pub use error::{Result, StoreError};
pub use store::Store;
