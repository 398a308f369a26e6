//! Configuration loading
//!
//! Reads [`calmate_domain::Config`] from a JSON or TOML file and layers
//! environment overrides on top.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths, CONFIG_PATH_ENV};
