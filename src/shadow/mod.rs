//! Shadow-service discovery-and-clone pipeline.
//!
//! # Data Flow
//! ```text
//! ServiceSource ──list──▶ SearchHandler ──policy──▶ CallbackRegistry::register
//!                              │                      (new or retry-eligible)
//!                              ▼
//!                   bounded mpsc<CloneJob> (FIFO, backpressure)
//!                              │
//!                              ▼
//!                      consumer loop ──▶ CloneHandler ──▶ ShadowApi::create
//!                              │
//!                              └──▶ CallbackRegistry::mark_done(Cloned | Failed)
//! ```
//!
//! # Design Decisions
//! - Search is the only reader of the registry; the consumer only reports
//!   status transitions
//! - "Seen" and "cloned" are separate states, so failed clones are retried on
//!   a later cycle after a backoff
//! - Both loops stop on a shared shutdown signal; a panic in either stops
//!   the other and marks the controller crashed

pub mod clone;
pub mod controller;
pub mod policy;
pub mod registry;
pub mod search;
pub mod types;

pub use clone::{CloneHandler, ShadowNaming};
pub use controller::{Controller, ControllerBuilder, ControllerHandle, ControllerState};
pub use policy::{InclusionPolicy, MeshLabelPolicy};
pub use registry::{CallbackRegistry, RegistrySummary, RetryPolicy};
pub use search::{CycleError, CycleReport, SearchHandler};
pub use types::{
    Candidate, CandidateId, CloneError, CloneJob, CloneStatus, CreateOutcome, DiscoveryError,
    ShadowResource,
};
