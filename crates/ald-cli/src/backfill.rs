use std::time::Duration;

use ald_core::AppConfig;
use ald_geocode::{backfill_coordinates, BackfillOptions};

use crate::{build_backend, build_geocoder, print_json};

fn backfill_options(config: &AppConfig, max_requests: Option<usize>) -> BackfillOptions {
    BackfillOptions {
        max_requests: max_requests.unwrap_or(config.backfill_max_requests),
        delay: Duration::from_millis(config.backfill_delay_ms),
    }
}

/// Geocodes facilities lacking coordinates and prints the run report.
///
/// # Errors
///
/// Fails when geocoding is disabled or the facility list cannot be loaded.
/// Per-facility failures only count as skipped.
pub(crate) async fn run_backfill(
    config: &AppConfig,
    max_requests: Option<usize>,
) -> anyhow::Result<()> {
    let backend = build_backend(config)?;
    let geocoder = build_geocoder(config)?;
    if !geocoder.is_enabled() {
        anyhow::bail!("ALD_GEOCODER_API_KEY is required for backfill");
    }

    let options = backfill_options(config, max_requests);
    tracing::info!(
        max_requests = options.max_requests,
        delay_ms = config.backfill_delay_ms,
        "backfill: starting"
    );
    let report = backfill_coordinates(&backend, &geocoder, &options).await?;
    print_json(&report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            backend_url: "http://localhost:5000".to_owned(),
            env: ald_core::Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "info".to_owned(),
            geocoder_api_key: None,
            geocoder_base_url: "http://localhost:9".to_owned(),
            http_timeout_secs: 5,
            user_agent: "ald-test".to_owned(),
            geocoder_max_retries: 0,
            geocoder_backoff_base_ms: 0,
            search_page_size: 50,
            watch_interval_secs: 30,
            notification_capacity: 10,
            idle_ttl_secs: 1800,
            backfill_max_requests: 1000,
            backfill_delay_ms: 200,
            backfill_cron: "0 0 3 * * *".to_owned(),
        }
    }

    #[test]
    fn max_requests_flag_overrides_config() {
        let options = backfill_options(&config(), Some(5));
        assert_eq!(options.max_requests, 5);
        assert_eq!(options.delay, Duration::from_millis(200));
    }

    #[test]
    fn max_requests_defaults_to_config() {
        assert_eq!(backfill_options(&config(), None).max_requests, 1000);
    }

    #[tokio::test]
    async fn disabled_geocoder_fails_fast() {
        let err = run_backfill(&config(), None).await.unwrap_err();
        assert!(err.to_string().contains("ALD_GEOCODER_API_KEY"));
    }
}
