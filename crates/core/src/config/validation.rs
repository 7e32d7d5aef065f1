//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Largest page size the remote listings accept.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Longest listing window, in days (about a century).
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Longest search cache lifetime, in hours (ten years).
pub const MAX_SEARCH_TTL_HOURS: i64 = 87_600;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `page_size` is outside 1..=1000
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `base_url` is empty
    /// - `window_days` is 0 or exceeds 36500
    /// - `search_ttl_hours` is negative or exceeds 87600
    /// - `max_pages` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(invalid("page_size", "must be between 1 and 1000"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.base_url.is_empty() {
            return Err(invalid("base_url", "must not be empty"));
        }

        if self.window_days == 0 {
            return Err(invalid("window_days", "must be greater than 0"));
        }
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(invalid("window_days", "must not exceed 36500"));
        }

        if self.search_ttl_hours < 0 {
            return Err(invalid("search_ttl_hours", "must not be negative"));
        }
        if self.search_ttl_hours > MAX_SEARCH_TTL_HOURS {
            return Err(invalid("search_ttl_hours", "must not exceed 87600 (ten years)"));
        }

        // Leave max_pages unset for an unbounded run.
        if self.max_pages == Some(0) {
            return Err(invalid("max_pages", "must be at least 1 when set"));
        }

        Ok(())
    }
}
