pub mod app_config;
pub mod config;
pub mod facility;
pub mod geo;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use facility::{Facility, AFFIRMATIVE_FLAG};
pub use geo::{haversine_miles, GeoPoint, DEFAULT_MAP_CENTER, EARTH_RADIUS_MILES};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
