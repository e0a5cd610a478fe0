//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the shadow
//! controller. All types derive Serde traits for deserialization from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the shadow controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Mesh control-plane address (e.g., "http://mesh-control.mesh-system:15010").
    pub mesh_server: String,

    /// Upper bound for every list/create call in seconds.
    pub request_timeout_secs: u64,

    /// Delay between discovery cycles in seconds.
    pub pull_interval_secs: u64,

    /// Candidate discovery settings.
    pub discovery: DiscoveryConfig,

    /// Clone pipeline settings.
    pub clone: CloneConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            mesh_server: String::new(),
            request_timeout_secs: 10,
            pull_interval_secs: 30,
            discovery: DiscoveryConfig::default(),
            clone: CloneConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ShadowConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pull_interval(&self) -> Duration {
        Duration::from_secs(self.pull_interval_secs)
    }
}

/// Where candidates are discovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// List `v1/Service` objects from the Kubernetes API.
    #[default]
    Kubernetes,
    /// Ask the mesh control plane at `mesh_server`.
    Mesh,
}

/// Candidate discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Discovery backend.
    pub source: SourceKind,

    /// Namespace to watch. Empty means all namespaces.
    pub namespace: String,

    /// Equality-based label selector ("k=v,k2=v2") a service must match.
    pub label_selector: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Kubernetes,
            namespace: String::new(),
            label_selector: "mesh.emctl.io/inject=enabled".to_string(),
        }
    }
}

/// Clone pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CloneConfig {
    /// Capacity of the job channel between search and clone (>= 1).
    pub queue_depth: usize,

    /// Suffix appended to the source name to form the shadow name.
    pub shadow_suffix: String,

    /// Namespace for shadows. `None` keeps the source namespace.
    pub shadow_namespace: Option<String>,

    /// Base delay before a failed clone is retried, in seconds.
    pub retry_base_secs: u64,

    /// Maximum retry delay, in seconds.
    pub retry_max_secs: u64,

    /// A job still pending after this many seconds is scheduled again.
    pub pending_timeout_secs: u64,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            shadow_suffix: "-shadow".to_string(),
            shadow_namespace: None,
            retry_base_secs: 30,
            retry_max_secs: 900,
            pending_timeout_secs: 600,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
