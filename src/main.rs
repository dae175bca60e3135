mod config;
mod eager_env;
mod lifecycle;
mod logging;
mod ring;
mod scheduler;

use crate::{
    config::RulerConfig,
    eager_env::check_env,
    lifecycle::{
        Ruler,
        drain::DrainLoop,
        handover::HandoverCoordinator,
        shutdown::{HandoverOutcome, Lifecycler},
    },
    logging::Logger,
    ring::consul::ConsulClient,
    scheduler::Scheduler,
};
use log::{error, info, warn};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // Variables already present in the environment take precedence over .env
    let _ = dotenvy::dotenv();

    env_logger::builder()
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .init();
    check_env();

    let instance_id = eager_env::INSTANCE_ID.as_str();
    let config = RulerConfig::from_env().expect("Invalid ruler configuration");

    let consul = ConsulClient::new(
        eager_env::CONSUL_URL.clone(),
        Duration::from_secs(*eager_env::CONSUL_REQUEST_TIMEOUT_SECONDS),
    )
    .expect("failed to create consul client");
    let consul = Arc::new(consul);

    let scheduler = Arc::new(Scheduler::new());

    let ruler = Ruler::new(
        config,
        HandoverCoordinator::new(
            consul,
            eager_env::RING_KEY.as_str(),
            Logger::global("ruler::handover"),
        ),
        DrainLoop::new(scheduler.clone(), Logger::global("ruler::flush")),
    );
    let lifecycler = Lifecycler::new(config.claim_on_rollout, Logger::global("ruler::lifecycle"));

    info!("Ruler {instance_id} started");

    shutdown_signal().await;

    info!(
        "Ruler {instance_id} shutting down with {} scheduled items",
        scheduler.len().await
    );

    // A second signal aborts the graceful part of the shutdown
    let cancel = CancellationToken::new();
    let abort = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received second shutdown signal, aborting handover and flush");
        abort.cancel();
    });

    let report = lifecycler.shutdown(&ruler, &cancel).await;

    match report.handover {
        HandoverOutcome::Found(member) => info!("Handed over to {member}"),
        HandoverOutcome::Failed(e) => error!("Shutting down without a replacement: {e}"),
        HandoverOutcome::Skipped => info!("Handover disabled, no replacement searched"),
    }

    info!("Ruler {instance_id} stopped after {:?}", report.elapsed);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
