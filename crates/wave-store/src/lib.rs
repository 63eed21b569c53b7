//! SQLite persistence and configuration loading for `wave-core`.

pub mod config;
pub mod error;
pub mod paths;
pub mod schema;
pub mod store;

pub use config::{load_config, parse_config, to_toml};
pub use error::{Result, StoreError};
pub use paths::{default_base_dir, open_data_dir, resolve_data_dir};
pub use store::Store;
