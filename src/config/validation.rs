//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, queue depth >= 1)
//! - Check the mesh server address is present and usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShadowConfig → Result<(), Vec<ValidationError>>
//! - Runs before the controller is constructed

use std::fmt;

use url::Url;

use crate::config::schema::{ShadowConfig, SourceKind};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ShadowConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mesh_server = config.mesh_server.trim();
    if mesh_server.is_empty() {
        errors.push(ValidationError::new("mesh_server", "must not be empty"));
    } else if config.discovery.source == SourceKind::Mesh {
        if let Err(e) = Url::parse(mesh_server) {
            errors.push(ValidationError::new(
                "mesh_server",
                format!("invalid URL `{}`: {}", mesh_server, e),
            ));
        }
    }

    if config.request_timeout_secs == 0 {
        errors.push(ValidationError::new("request_timeout_secs", "must be greater than 0"));
    }
    if config.pull_interval_secs == 0 {
        errors.push(ValidationError::new("pull_interval_secs", "must be greater than 0"));
    }

    let clone = &config.clone;
    if clone.queue_depth == 0 {
        errors.push(ValidationError::new("clone.queue_depth", "must be at least 1"));
    }
    if clone.shadow_suffix.is_empty() && clone.shadow_namespace.is_none() {
        errors.push(ValidationError::new(
            "clone.shadow_suffix",
            "must not be empty unless clone.shadow_namespace is set",
        ));
    }
    if let Some(ns) = &clone.shadow_namespace {
        if ns.trim().is_empty() {
            errors.push(ValidationError::new("clone.shadow_namespace", "must not be blank"));
        }
    }
    if clone.pending_timeout_secs == 0 {
        errors.push(ValidationError::new("clone.pending_timeout_secs", "must be greater than 0"));
    }
    if clone.retry_max_secs < clone.retry_base_secs {
        errors.push(ValidationError::new(
            "clone.retry_max_secs",
            "must be greater than or equal to clone.retry_base_secs",
        ));
    }

    for pair in config
        .discovery
        .label_selector
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        if pair.split_once('=').map_or(true, |(k, _)| k.trim().is_empty()) {
            errors.push(ValidationError::new(
                "discovery.label_selector",
                format!("`{}` is not a key=value pair", pair),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
