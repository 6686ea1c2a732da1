//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! RPC call:
//!     → timeouts.rs (every call has a deadline)
//! Submission:
//!     → retries.rs (attempt budget + delay schedule)
//!     → backoff.rs (fixed or exponential with jitter)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only stale-reference errors are retried, never fatal rejections

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::{calculate_backoff, BackoffPolicy};
pub use retries::RetryPolicy;
pub use timeouts::with_rpc_timeout;
