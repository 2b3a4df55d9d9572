//! Configuration module for the playground
//!
//! YAML configuration with per-field defaults, environment overrides and
//! validation. See [`types::PlaygroundConfig`] for the full layout.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;

#[cfg(test)]
mod tests;

use crate::errors::PlaygroundError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<PlaygroundConfig, PlaygroundError> {
    ConfigLoader::from_file(path).await
}
