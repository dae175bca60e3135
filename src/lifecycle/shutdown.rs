use crate::lifecycle::{FlushTransferer, TransferError};
use crate::logging::{Logger, error, info};
use crate::ring::ClusterMember;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum HandoverOutcome {
    /// `claim_on_rollout` is off, nobody was looked for.
    Skipped,
    Found(ClusterMember),
    Failed(TransferError),
}

#[derive(Debug)]
pub struct ShutdownReport {
    pub handover: HandoverOutcome,
    pub elapsed: Duration,
}

/// Drives the shutdown hooks of a ruler.
///
/// A failed handover is reported but never stops the shutdown: local work is flushed either way.
pub struct Lifecycler {
    claim_on_rollout: bool,
    logger: Logger,
}

impl Lifecycler {
    pub fn new(claim_on_rollout: bool, logger: Logger) -> Self {
        Self {
            claim_on_rollout,
            logger,
        }
    }

    pub async fn shutdown<T: FlushTransferer + Sync>(
        &self,
        hooks: &T,
        cancel: &CancellationToken,
    ) -> ShutdownReport {
        let started = Instant::now();

        hooks.stop_incoming_requests();

        let handover = if self.claim_on_rollout {
            let transfer_started = Instant::now();

            match hooks.transfer_out(cancel).await {
                Ok(member) => {
                    info!(
                        self.logger,
                        "replacement ruler {member} found in {:?}",
                        transfer_started.elapsed()
                    );
                    HandoverOutcome::Found(member)
                }
                Err(e) => {
                    error!(
                        self.logger,
                        "failed to hand over to another ruler after {:?}, flushing anyway: {e}",
                        transfer_started.elapsed()
                    );
                    HandoverOutcome::Failed(e)
                }
            }
        } else {
            HandoverOutcome::Skipped
        };

        let flush_started = Instant::now();
        hooks.flush(cancel).await;
        hooks.flushed();

        info!(self.logger, "flush finished in {:?}", flush_started.elapsed());

        ShutdownReport {
            handover,
            elapsed: started.elapsed(),
        }
    }
}
