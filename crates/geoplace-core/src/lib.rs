mod app_config;
mod config;
pub mod places;
pub mod requests;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use places::{
    Contacts, Coordinates, OpeningHoursComponent, OpeningHoursEntry, PlaceRecord, PlaceSummary,
    PlaceTimeZone,
};
pub use requests::{
    ExpansionOutcome, OpenNowSearchRequest, SearchRequest, StopReason, MAX_RESULTS_LIMIT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
