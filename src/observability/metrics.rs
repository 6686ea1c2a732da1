//! Submission and confirmation metrics.
//!
//! # Metrics
//! - `dapp_submission_attempts_total` (counter): network submissions by chain
//! - `dapp_submission_outcomes_total` (counter): terminal submit results by chain, outcome
//! - `dapp_confirmations_total` (counter): confirmation waits by chain, outcome

use metrics::counter;

/// Record one network submission.
pub fn record_submission_attempt(chain: &'static str) {
    counter!("dapp_submission_attempts_total", "chain" => chain).increment(1);
}

/// Record the terminal result of `submit_with_retry`.
pub fn record_submission_outcome(chain: &'static str, outcome: &'static str) {
    counter!("dapp_submission_outcomes_total", "chain" => chain, "outcome" => outcome).increment(1);
}

/// Record the terminal result of a confirmation wait.
pub fn record_confirmation(chain: &'static str, outcome: &'static str) {
    counter!("dapp_confirmations_total", "chain" => chain, "outcome" => outcome).increment(1);
}
