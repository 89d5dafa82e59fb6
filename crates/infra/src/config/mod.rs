//! Configuration loading
//!
//! Builds a [`PipelineConfig`](reportflow_domain::PipelineConfig) from
//! environment variables or a config file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, load_from_vars, probe_config_paths};
