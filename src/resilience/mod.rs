//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the cluster or mesh control plane:
//!     → timeouts.rs (every list/create has a deadline)
//!
//! Failed clone:
//!     → backoff.rs (delay before the registry allows a retry)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries are driven by the next discovery cycle, never inline
//! - Jittered backoff keeps failing clones from retrying in lockstep

pub mod backoff;
pub mod timeouts;
