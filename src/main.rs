//! carpark_service - find the nearest car parks with free lots.
//!
//! Usage:
//!   carpark_service nearest --latitude 1.30 --longitude 103.85 [--page 1] [--per-page 10]
//!   carpark_service stats
//!   carpark_service ingest

use std::error::Error;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use carpark_service::availability::{AvailabilityLookup, InMemoryAvailability, PostgresAvailability};
use carpark_service::catalog::{DirectorySource, LocationCatalog};
use carpark_service::config::{self, ServiceConfig};
use carpark_service::db;
use carpark_service::ingest::carpark_api;
use carpark_service::logging::{self, LogSource};
use carpark_service::query::NearestQueryService;
use carpark_service::request;
use carpark_service::response;

const FALLBACK_PER_PAGE: NonZeroUsize = NonZeroUsize::new(10).unwrap();

#[derive(Debug, Parser)]
#[command(name = "carpark_service", version, about = "Nearest available car park lookup")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the nearest car parks with free lots as JSON
    Nearest(NearestArgs),
    /// Print catalog size and load time
    Stats,
    /// Fetch the availability feed once and store it
    Ingest,
}

/// Raw values; validation happens in `request::parse_nearest` so the CLI
/// rejects exactly what any other front end would.
#[derive(Debug, Args)]
struct NearestArgs {
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    page: Option<String>,
    #[arg(long = "per-page", allow_hyphen_values = true)]
    per_page: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    logging::init_logger(
        config.logging.min_level(),
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );
    logging::info(
        LogSource::System,
        None,
        &format!("carpark_service {} starting", env!("CARGO_PKG_VERSION")),
    );

    match cli.command {
        Command::Nearest(args) => run_nearest(&config, &args),
        Command::Stats => run_stats(&config),
        Command::Ingest => run_ingest(&config),
    }
}

fn open_catalog(config: &ServiceConfig) -> LocationCatalog {
    LocationCatalog::new(DirectorySource::new(
        config.catalog.data_dir.clone(),
        config.catalog.file_prefix.clone(),
    ))
}

/// PostgreSQL when reachable; otherwise an empty store, so the query still
/// runs and simply finds no free lots.
fn open_availability() -> Box<dyn AvailabilityLookup> {
    match db::connect_and_verify(&[db::SCHEMA]) {
        Ok(client) => Box::new(PostgresAvailability::new(client)),
        Err(e) => {
            logging::error(
                LogSource::Database,
                None,
                &format!("{}; continuing without availability data", e),
            );
            Box::new(InMemoryAvailability::new())
        }
    }
}

fn run_nearest(config: &ServiceConfig, args: &NearestArgs) -> Result<(), Box<dyn Error>> {
    let default_per_page =
        NonZeroUsize::new(config.query.default_per_page).unwrap_or(FALLBACK_PER_PAGE);

    let params = match request::parse_nearest(
        args.latitude.as_deref(),
        args.longitude.as_deref(),
        args.page.as_deref(),
        args.per_page.as_deref(),
        default_per_page,
    ) {
        Ok(params) => params,
        Err(e) => {
            let body = response::render_error(&e, Utc::now());
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(2);
        }
    };

    let catalog = open_catalog(config);
    let availability = open_availability();
    let service = NearestQueryService::new(&catalog, availability.as_ref());

    let result = service.find_nearest(params.latitude, params.longitude, params.page, params.per_page);
    let body = response::render_nearest(&result, Utc::now());
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn run_stats(config: &ServiceConfig) -> Result<(), Box<dyn Error>> {
    let catalog = open_catalog(config);
    let stats = catalog.stats();

    println!("Car parks:  {}", stats.count);
    match stats.loaded_at {
        Some(at) => println!("Loaded at:  {}", at.to_rfc3339()),
        None => println!("Loaded at:  never (catalog source unreadable)"),
    }
    Ok(())
}

fn run_ingest(config: &ServiceConfig) -> Result<(), Box<dyn Error>> {
    let http = carpark_api::build_client(config.ingest.timeout_secs)?;
    let mut client = db::connect_and_verify(&[db::SCHEMA])?;

    let (fetched, stored) = carpark_api::run_once(&http, &mut client, &config.ingest.api_url, Utc::now())?;
    println!("Fetched {} records, stored {} new rows", fetched, stored);
    Ok(())
}
