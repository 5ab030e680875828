use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub geocoder_api_key: Option<String>,
    pub geocoder_base_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub geocoder_max_retries: u32,
    pub geocoder_backoff_base_ms: u64,
    pub search_page_size: usize,
    pub watch_interval_secs: u64,
    pub notification_capacity: usize,
    pub idle_ttl_secs: u64,
    pub backfill_max_requests: usize,
    pub backfill_delay_ms: u64,
    pub backfill_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("backend_url", &self.backend_url)
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "geocoder_api_key",
                &self.geocoder_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("geocoder_base_url", &self.geocoder_base_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("geocoder_max_retries", &self.geocoder_max_retries)
            .field("geocoder_backoff_base_ms", &self.geocoder_backoff_base_ms)
            .field("search_page_size", &self.search_page_size)
            .field("watch_interval_secs", &self.watch_interval_secs)
            .field("notification_capacity", &self.notification_capacity)
            .field("idle_ttl_secs", &self.idle_ttl_secs)
            .field("backfill_max_requests", &self.backfill_max_requests)
            .field("backfill_delay_ms", &self.backfill_delay_ms)
            .field("backfill_cron", &self.backfill_cron)
            .finish()
    }
}
