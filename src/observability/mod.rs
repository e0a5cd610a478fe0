//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Search and clone loops produce:
//!     → logging.rs (structured log events with candidate and job fields)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout (pretty for humans, JSON for log aggregation)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every log line about a clone carries the job id and candidate identity
//! - Metrics go through the `metrics` facade, so recording is a no-op until
//!   an exporter is installed
//! - `RUST_LOG` overrides the configured level

pub mod logging;
pub mod metrics;
