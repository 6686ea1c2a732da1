//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (submission and confirmation counters)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never formatted key material
//! - Metrics go through the `metrics` facade; they are no-ops until a
//!   recorder is installed by the embedding application

pub mod logging;
pub mod metrics;
