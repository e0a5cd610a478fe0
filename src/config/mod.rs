//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! --mesh-server flag ─┐
//! config file (TOML) ─┴→ loader.rs (parse & resolve)
//!     → validation.rs (semantic checks)
//!     → ShadowConfig (validated, immutable)
//!     → handed to the controller at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::CloneConfig;
pub use schema::DiscoveryConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::ShadowConfig;
pub use schema::SourceKind;
