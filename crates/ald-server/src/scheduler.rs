//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring coordinate backfill and the idle session/watch sweep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ald_core::AppConfig;
use ald_geocode::{backfill_coordinates, BackfillOptions, GoogleGeocoder};
use ald_store::BackendClient;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;

/// Every minute, on the minute (UTC).
const IDLE_SWEEP_SCHEDULE: &str = "0 * * * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is rejected, or the scheduler fails to start.
pub async fn build_scheduler(
    state: &AppState,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_idle_sweep_job(&scheduler, state.clone()).await?;

    if state.geocoder.is_enabled() {
        let backend = Arc::clone(&state.backend);
        let geocoder = Arc::clone(&state.geocoder);
        register_backfill_job(&scheduler, backend, geocoder, config).await?;
    } else {
        tracing::warn!("scheduler: geocoding disabled; coordinate backfill not scheduled");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the sweep that reclaims sessions and watchers idle past the TTL.
async fn register_idle_sweep_job(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(IDLE_SWEEP_SCHEDULE, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            let reclaimed = state.reclaim_idle(Instant::now()).await;
            if reclaimed.sessions > 0 || reclaimed.watches > 0 {
                tracing::info!(
                    sessions = reclaimed.sessions,
                    watches = reclaimed.watches,
                    "scheduler: idle entries reclaimed"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(schedule = IDLE_SWEEP_SCHEDULE, "scheduler: idle sweep registered");
    Ok(())
}

fn backfill_options(config: &AppConfig) -> BackfillOptions {
    BackfillOptions {
        max_requests: config.backfill_max_requests,
        delay: Duration::from_millis(config.backfill_delay_ms),
    }
}

/// Register the coordinate backfill on `config.backfill_cron` (UTC).
async fn register_backfill_job(
    scheduler: &JobScheduler,
    backend: Arc<BackendClient>,
    geocoder: Arc<GoogleGeocoder>,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    let options = backfill_options(config);
    let schedule = config.backfill_cron.clone();

    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let backend = Arc::clone(&backend);
        let geocoder = Arc::clone(&geocoder);
        let options = options.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting coordinate backfill");
            run_backfill_job(&backend, &geocoder, &options).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(schedule = %schedule, "scheduler: coordinate backfill registered");
    Ok(())
}

/// Runs one backfill; failures are logged, never propagated.
async fn run_backfill_job(
    backend: &BackendClient,
    geocoder: &GoogleGeocoder,
    options: &BackfillOptions,
) {
    match backfill_coordinates(backend, geocoder, options).await {
        Ok(report) => tracing::info!(
            updated = report.updated,
            skipped = report.skipped,
            processed = report.processed,
            "scheduler: coordinate backfill complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: coordinate backfill failed"),
    }
}
