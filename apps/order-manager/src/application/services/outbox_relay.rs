//! Outbox Relay Loop
//!
//! Runs [`RelayOutboxUseCase::run_cycle`] on a fixed interval until the
//! shutdown token fires. A cycle in progress always finishes; cancellation is
//! only observed while waiting for the next tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::application::ports::{EventPublisherPort, OrderStorePort};
use crate::application::use_cases::RelayOutboxUseCase;
use crate::observability;

/// Spawn the relay loop on `tracker`.
///
/// With `wake` set, a notification runs a cycle immediately; the interval
/// keeps running as the backstop either way.
pub fn spawn_outbox_relay<S, P>(
    use_case: Arc<RelayOutboxUseCase<S, P>>,
    interval: Duration,
    wake: Option<Arc<Notify>>,
    shutdown: &CancellationToken,
    tracker: &TaskTracker,
) where
    S: OrderStorePort + ?Sized + 'static,
    P: EventPublisherPort + ?Sized + 'static,
{
    tracker.spawn(run_relay(use_case, interval, wake, shutdown.clone()));
}

async fn run_relay<S, P>(
    use_case: Arc<RelayOutboxUseCase<S, P>>,
    interval: Duration,
    wake: Option<Arc<Notify>>,
    shutdown: CancellationToken,
) where
    S: OrderStorePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    tracing::info!(
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        push_wake = wake.is_some(),
        "Starting outbox relay"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
            () = woken(wake.as_deref()) => {}
        }

        relay_once(&use_case).await;
    }

    tracing::info!("Outbox relay stopped");
}

async fn woken(wake: Option<&Notify>) {
    match wake {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}

async fn relay_once<S, P>(use_case: &RelayOutboxUseCase<S, P>)
where
    S: OrderStorePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    let started = Instant::now();

    match use_case.run_cycle().await {
        Ok(report) if report.is_idle() => {}
        Ok(report) => {
            tracing::debug!(
                fetched = report.fetched,
                published = report.published,
                failed = report.failed,
                "Outbox relay cycle finished"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Outbox relay cycle failed, retrying next tick");
        }
    }
    observability::record_relay_cycle(started.elapsed());

    match use_case.backlog_age().await {
        Ok(age) => observability::update_oldest_unprocessed_age(age),
        Err(e) => tracing::debug!(error = %e, "Could not read outbox backlog age"),
    }
}
