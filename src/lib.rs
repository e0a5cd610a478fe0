//! Shadow-service controller library.
//!
//! Discovers mesh services in a Kubernetes cluster and clones them into
//! shadow copies for testing against mirrored traffic.

pub mod cluster;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod shadow;

pub use config::ShadowConfig;
pub use lifecycle::Shutdown;
pub use shadow::{Controller, ControllerHandle, ControllerState};
