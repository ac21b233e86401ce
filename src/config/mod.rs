//! Configuration management for babble.
//!
//! Handles loading and saving application configuration from TOML files in
//! the user's config directory, and centralizes the directory paths the rest
//! of the crate derives files from.

pub mod file;
pub mod paths;

pub use file::{AudioConfig, BabbleConfig};
pub use paths::{config_path, state_dir};
