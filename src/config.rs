use crate::eager_env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
}

/// Shutdown settings of a ruler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulerConfig {
    /// How long to look for a PENDING ruler to hand over to before giving up.
    pub search_pending_for: Duration,
    /// Time budget for draining locally scheduled work.
    pub flush_check_period: Duration,
    /// Whether shutdown looks for a replacement at all.
    pub claim_on_rollout: bool,
}

impl RulerConfig {
    pub fn new(
        search_pending_for: Duration,
        flush_check_period: Duration,
        claim_on_rollout: bool,
    ) -> Result<Self, ConfigError> {
        if search_pending_for.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: "search_pending_for",
            });
        }
        if flush_check_period.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: "flush_check_period",
            });
        }

        Ok(Self {
            search_pending_for,
            flush_check_period,
            claim_on_rollout,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(
            Duration::from_secs(*eager_env::SEARCH_PENDING_FOR_SECONDS),
            Duration::from_secs(*eager_env::FLUSH_CHECK_PERIOD_SECONDS),
            *eager_env::CLAIM_ON_ROLLOUT,
        )
    }
}
