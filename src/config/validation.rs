//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and URLs.
//! Every violation is reported, not just the first.

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: String },

    #[error("submission.max_backoff_ms ({max}) is below submission.backoff_ms ({base})")]
    BackoffRange { base: u64, max: u64 },

    #[error("observability.log_level: unknown level '{0}'")]
    LogLevel(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "ethereum.rpc_url", &config.ethereum.rpc_url, &["http", "https"]);
    for url in &config.ethereum.failover_urls {
        check_url(&mut errors, "ethereum.failover_urls", url, &["http", "https"]);
    }
    if let Some(url) = &config.solana.rpc_url {
        check_url(&mut errors, "solana.rpc_url", url, &["http", "https"]);
    }
    if let Some(url) = &config.solana.ws_url {
        check_url(&mut errors, "solana.ws_url", url, &["ws", "wss"]);
    }

    check_nonzero(&mut errors, "ethereum.chain_id", config.ethereum.chain_id);
    check_nonzero(&mut errors, "ethereum.rpc_timeout_secs", config.ethereum.rpc_timeout_secs);
    check_nonzero(&mut errors, "ethereum.poll_interval_ms", config.ethereum.poll_interval_ms);
    check_nonzero(&mut errors, "solana.rpc_timeout_secs", config.solana.rpc_timeout_secs);
    check_nonzero(&mut errors, "submission.max_attempts", u64::from(config.submission.max_attempts));
    check_nonzero(
        &mut errors,
        "submission.confirmation_timeout_secs",
        config.submission.confirmation_timeout_secs,
    );

    let multiplier = config.ethereum.gas_price_multiplier;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        errors.push(ValidationError::NotPositive {
            field: "ethereum.gas_price_multiplier",
            value: multiplier.to_string(),
        });
    }

    if config.submission.exponential && config.submission.max_backoff_ms < config.submission.backoff_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.submission.backoff_ms,
            max: config.submission.max_backoff_ms,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, schemes: &[&str]) {
    match url::Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        _ => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

fn check_nonzero(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}
