mod commands;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use geoplace_engine::{CancellationToken, EngineSettings, PlacesEngine};
use geoplace_upstream::LocationClient;
use tracing_subscriber::EnvFilter;

use crate::commands::Outcome;

#[derive(Debug, Parser)]
#[command(name = "geoplace")]
#[command(about = "Geocoding, nearby and open-now place search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Geocode free text into a list of places
    SearchPlaces {
        query: String,
        #[arg(long, default_value_t = 5)]
        max_results: u32,
    },
    /// Best coordinates for a location string
    Coordinates { location: String },
    /// Nearest address for a position
    Reverse {
        #[command(flatten)]
        position: Position,
    },
    /// Full detail for one place id
    Place { place_id: String },
    /// Places around a position, widening the radius as needed
    Nearby {
        #[command(flatten)]
        position: Position,
        #[command(flatten)]
        expansion: ExpansionArgs,
    },
    /// Places matching a query that are open right now
    OpenNow {
        query: String,
        /// Search centre; the query is geocoded when omitted
        #[arg(long, allow_negative_numbers = true, requires = "latitude")]
        longitude: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "longitude")]
        latitude: Option<f64>,
        #[command(flatten)]
        expansion: ExpansionArgs,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct Position {
    #[arg(long, allow_negative_numbers = true)]
    longitude: f64,
    #[arg(long, allow_negative_numbers = true)]
    latitude: f64,
}

#[derive(Debug, Clone, Copy, Args)]
struct ExpansionArgs {
    #[arg(long, default_value_t = 5)]
    max_results: u32,
    /// Initial search radius in meters
    #[arg(long, default_value_t = 500)]
    radius: u32,
    /// Largest radius searched, in meters
    #[arg(long, default_value_t = 10_000)]
    max_radius: u32,
    #[arg(long, default_value_t = 2.0)]
    expansion_factor: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = geoplace_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let client = Arc::new(LocationClient::from_app_config(&config)?);
    let engine = PlacesEngine::new(client, EngineSettings::from_app_config(&config));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    match commands::run(&engine, cli.command, &cancel).await? {
        Outcome::Success(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failure(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("received ctrl-c, cancelling in-flight search");
        cancel.cancel();
    }
}
