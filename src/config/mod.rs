//! Host configuration for Tab Trail.
//!
//! ## config.kdl - Host preferences
//!
//! Located at `<data-dir>/config.kdl`.
//!
//! Contains:
//! - `backend` - Storage backend ("file", "sqlite", "memory")
//! - `tracking-enabled`, `retention-days`, `max-pages-per-tab` - Settings
//!   seeded into the store on first start
//!
//! ## Precedence
//!
//! CLI flag > config.kdl > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, DATA_DIR_ENV, Resolved, ResolvedConfig, ValueSource, resolve_config,
    resolve_data_dir,
};
pub use schema::{CONFIG_FILE, TrailConfig, read_config, write_config};
