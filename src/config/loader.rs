//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ShadowConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and controller construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// A required collaborator was not supplied to the controller builder.
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<ShadowConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ShadowConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the configuration the daemon runs with.
///
/// An explicit `--mesh-server` flag wins over the file. A missing file falls
/// back to defaults; a file that exists but fails to parse is an error. The
/// result is validated, so an unresolved mesh server fails here.
pub fn resolve_config(
    path: Option<&Path>,
    mesh_server_flag: Option<&str>,
) -> Result<ShadowConfig, ConfigError> {
    let mut config = match path {
        Some(path) if path.exists() => parse_config(&fs::read_to_string(path)?)?,
        Some(path) => {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            ShadowConfig::default()
        }
        None => ShadowConfig::default(),
    };

    if let Some(flag) = mesh_server_flag.filter(|s| !s.trim().is_empty()) {
        config.mesh_server = flag.trim().to_string();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
