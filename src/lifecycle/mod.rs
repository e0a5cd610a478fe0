//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed loop leaves at its next blocking point
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes before it starts
//! - Startup is fail-fast: configuration errors surface before any task runs

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
