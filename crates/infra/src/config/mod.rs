//! Configuration loading
//!
//! Loads [`steeple_domain::Config`] from `STEEPLE_*` environment variables
//! or a JSON/TOML file.

pub mod loader;

// Re-export commonly used items
pub use loader::{find_config_path, load, load_from_env, load_from_file};
