use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it from a
/// `HashMap` without `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let backend_url = require("ALD_BACKEND_URL")?;
    let env = parse_environment(&or_default("ALD_ENV", "development"));

    let bind_addr = or_default("ALD_BIND_ADDR", "0.0.0.0:3001")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("ALD_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("ALD_LOG_LEVEL", "info");

    let geocoder_api_key = lookup("ALD_GEOCODER_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let geocoder_base_url = or_default("ALD_GEOCODER_BASE_URL", "https://maps.googleapis.com");
    let http_timeout_secs = parse_u64("ALD_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("ALD_USER_AGENT", "ald/0.1 (facility-directory)");
    let geocoder_max_retries = parse_u32("ALD_GEOCODER_MAX_RETRIES", "1")?;
    let geocoder_backoff_base_ms = parse_u64("ALD_GEOCODER_BACKOFF_BASE_MS", "500")?;

    let search_page_size = parse_usize("ALD_SEARCH_PAGE_SIZE", "50")?;
    if search_page_size == 0 {
        return Err(invalid("ALD_SEARCH_PAGE_SIZE", "must be at least 1".to_string()));
    }

    let watch_interval_secs = parse_u64("ALD_WATCH_INTERVAL_SECS", "30")?;
    if watch_interval_secs == 0 {
        return Err(invalid(
            "ALD_WATCH_INTERVAL_SECS",
            "must be at least 1".to_string(),
        ));
    }

    let notification_capacity = parse_usize("ALD_NOTIFICATION_CAPACITY", "10")?;
    if notification_capacity == 0 {
        return Err(invalid(
            "ALD_NOTIFICATION_CAPACITY",
            "must be at least 1".to_string(),
        ));
    }

    let idle_ttl_secs = parse_u64("ALD_IDLE_TTL_SECS", "1800")?;
    if idle_ttl_secs == 0 {
        return Err(invalid("ALD_IDLE_TTL_SECS", "must be at least 1".to_string()));
    }

    let backfill_max_requests = parse_usize("ALD_BACKFILL_MAX_REQUESTS", "1000")?;
    let backfill_delay_ms = parse_u64("ALD_BACKFILL_DELAY_MS", "200")?;
    let backfill_cron = or_default("ALD_BACKFILL_CRON", "0 0 3 * * *");

    Ok(AppConfig {
        backend_url,
        env,
        bind_addr,
        log_level,
        geocoder_api_key,
        geocoder_base_url,
        http_timeout_secs,
        user_agent,
        geocoder_max_retries,
        geocoder_backoff_base_ms,
        search_page_size,
        watch_interval_secs,
        notification_capacity,
        idle_ttl_secs,
        backfill_max_requests,
        backfill_delay_ms,
        backfill_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
