mod backfill;
mod saved;
mod search;
mod watch;

use ald_core::AppConfig;
use ald_geocode::GoogleGeocoder;
use ald_store::BackendClient;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::saved::SavedCommands;

#[derive(Debug, Parser)]
#[command(name = "ald-cli")]
#[command(about = "Assisted-living directory command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one search over the facility list and print the resulting view
    Search {
        /// Free-text query matched against city, county and zip
        #[arg(long)]
        query: Option<String>,
        /// Distance filter in miles around the reference point (0 = off)
        #[arg(long, default_value = "0")]
        radius: u32,
        /// Only Medicaid-certified facilities
        #[arg(long)]
        medicaid: bool,
        /// Only SALS-certified facilities
        #[arg(long)]
        sals: bool,
        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: usize,
        /// Reference latitude (use with --lng instead of geocoding the query)
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Reference longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },
    /// Watch a user's saved facilities and print bed-count notifications
    Watch {
        /// User whose saved list is watched
        #[arg(long)]
        user: String,
        /// Stop after this many cycles (runs until Ctrl-C when omitted)
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Geocode facilities that have no coordinates yet
    Backfill {
        /// Cap on geocoding requests for this run (defaults to config)
        #[arg(long)]
        max_requests: Option<usize>,
    },
    /// Manage a user's saved facilities
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = ald_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Search {
            query,
            radius,
            medicaid,
            sals,
            pages,
            lat,
            lng,
        } => {
            let args = search::SearchArgs {
                query,
                radius,
                medicaid,
                sals,
                pages,
                location: lat.zip(lng),
            };
            search::run_search(&config, &args).await?;
        }
        Commands::Watch { user, cycles } => watch::run_watch(&config, &user, cycles).await?,
        Commands::Backfill { max_requests } => {
            backfill::run_backfill(&config, max_requests).await?;
        }
        Commands::Saved { command } => saved::run_saved(&config, command).await?,
    }

    Ok(())
}

fn build_backend(config: &AppConfig) -> anyhow::Result<BackendClient> {
    Ok(BackendClient::new(
        &config.backend_url,
        config.http_timeout_secs,
        &config.user_agent,
    )?)
}

fn build_geocoder(config: &AppConfig) -> anyhow::Result<GoogleGeocoder> {
    Ok(GoogleGeocoder::with_base_url(
        config.geocoder_api_key.clone(),
        config.http_timeout_secs,
        &config.user_agent,
        &config.geocoder_base_url,
    )?
    .with_retry_policy(config.geocoder_max_retries, config.geocoder_backoff_base_ms))
}

/// Pretty-prints `value` as JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
