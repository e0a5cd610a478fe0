//! Cluster access subsystem.
//!
//! # Data Flow
//! ```text
//! Discovery:
//!     SearchHandler → ServiceSource::list
//!         → kubernetes.rs (v1/Service list with label selector)
//!         → mesh.rs (GET {mesh_server}/api/v1/services)
//!
//! Cloning:
//!     CloneHandler → ShadowApi::create
//!         → kubernetes.rs (dynamic create, 409 = already exists)
//! ```
//!
//! # Design Decisions
//! - The pipeline only sees these two traits, so tests run without a cluster
//! - Deadlines are applied by the callers, not the adapters
//! - Adapters translate client errors into pipeline error types

use async_trait::async_trait;

use crate::shadow::types::{Candidate, CloneError, CreateOutcome, DiscoveryError, ShadowResource};

pub mod kubernetes;
pub mod mesh;

pub use self::kubernetes::{KubeServiceSource, KubeShadowApi};
pub use self::mesh::MeshServiceSource;

/// Produces the current set of candidates.
#[async_trait]
pub trait ServiceSource: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn list(&self) -> Result<Vec<Candidate>, DiscoveryError>;
}

/// Creates shadow resources.
///
/// Implementations must be idempotent: creating a shadow that already exists
/// returns `CreateOutcome::AlreadyExists`, not an error.
#[async_trait]
pub trait ShadowApi: Send + Sync {
    async fn create(&self, shadow: &ShadowResource) -> Result<CreateOutcome, CloneError>;
}
