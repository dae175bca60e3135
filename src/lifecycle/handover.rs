use crate::logging::{Logger, debug, info, warn};
use crate::ring::{ClusterMember, MemberState, MembershipSnapshot, MembershipStore};
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Number of polls the search window is split into.
const PENDING_SEARCH_ITERATIONS: u32 = 10;

/// Lower bound on the poll interval, so tiny windows cannot spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum HandoverError {
    #[error("no pending ruler found within {window:?}")]
    NoReplacementFound { window: Duration },
    #[error("search for a pending ruler was cancelled")]
    Cancelled,
    #[error("search window must be greater than zero")]
    InvalidWindow,
}

/// Looks for a ruler that is about to join the ring and can take over from this one.
///
/// Only detects the replacement: rules are re-read from the rule store by whoever owns them, so
/// nothing is transferred.
pub struct HandoverCoordinator<S> {
    store: Arc<S>,
    ring_key: String,
    logger: Logger,
}

impl<S: MembershipStore + Send + Sync> HandoverCoordinator<S> {
    pub fn new(store: Arc<S>, ring_key: impl Into<String>, logger: Logger) -> Self {
        Self {
            store,
            ring_key: ring_key.into(),
            logger,
        }
    }

    /// First PENDING member of a freshly fetched ring, if any.
    async fn find_pending(&self) -> Result<Option<ClusterMember>> {
        let ring = self.store.get(&self.ring_key).await?;

        Ok(ring
            .members_in_state(MemberState::Pending)
            .into_iter()
            .next())
    }

    /// Polls the ring until a PENDING ruler shows up, `window` elapses or `cancel` fires.
    ///
    /// The ring is fetched every `window / 10`. Fetch errors are logged and retried; only running
    /// out of time (or being cancelled) is reported to the caller. When several rulers are
    /// pending, the first one in snapshot order is returned.
    pub async fn search(
        &self,
        cancel: &CancellationToken,
        window: Duration,
    ) -> Result<ClusterMember, HandoverError> {
        if window.is_zero() {
            return Err(HandoverError::InvalidWindow);
        }

        let interval = (window / PENDING_SEARCH_ITERATIONS).max(MIN_POLL_INTERVAL);
        let deadline = Instant::now() + window;

        debug!(self.logger, "looking for pending rulers (window {window:?})");

        let mut last_err = None;

        loop {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(self.logger, "search for pending rulers cancelled");
                    return Err(HandoverError::Cancelled);
                }
                attempt = time::timeout_at(deadline, self.find_pending()) => attempt,
            };

            match attempt {
                Ok(Ok(Some(member))) => {
                    info!(self.logger, "found pending ruler {member}");
                    return Ok(member);
                }
                Ok(Ok(None)) => {
                    debug!(self.logger, "no pending rulers");
                    last_err = None;
                }
                Ok(Err(e)) => {
                    debug!(self.logger, "error looking for pending rulers: {e}");
                    last_err = Some(e);
                }
                Err(_) => {
                    debug!(self.logger, "ring fetch did not finish before the deadline");
                    last_err = Some(anyhow!("ring fetch did not finish before the deadline"));
                }
            }

            if Instant::now() >= deadline {
                match &last_err {
                    Some(e) => warn!(
                        self.logger,
                        "could not find pending ruler before deadline ({window:?}): {e}"
                    ),
                    None => warn!(
                        self.logger,
                        "could not find pending ruler before deadline ({window:?})"
                    ),
                }
                return Err(HandoverError::NoReplacementFound { window });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(self.logger, "search for pending rulers cancelled");
                    return Err(HandoverError::Cancelled);
                }
                _ = time::sleep(interval) => {}
            }
        }
    }
}
