use geoplace_core::{Coordinates, OpenNowSearchRequest, SearchRequest};
use geoplace_engine::{CancellationToken, ErrorPayload, PlaceError, PlacesEngine};
use serde::Serialize;
use serde_json::Value;

use crate::{Commands, ExpansionArgs, Position};

/// What gets printed: the operation's result or its structured error.
#[derive(Debug)]
pub(crate) enum Outcome {
    Success(Value),
    Failure(ErrorPayload),
}

pub(crate) async fn run(
    engine: &PlacesEngine,
    command: Commands,
    cancel: &CancellationToken,
) -> serde_json::Result<Outcome> {
    match command {
        Commands::SearchPlaces { query, max_results } => {
            render(engine.search_places(&query, max_results).await)
        }
        Commands::Coordinates { location } => render(engine.get_coordinates(&location).await),
        Commands::Reverse { position } => {
            render(
                engine
                    .reverse_geocode(position.longitude, position.latitude)
                    .await,
            )
        }
        Commands::Place { place_id } => render(engine.get_place(&place_id).await),
        Commands::Nearby {
            position,
            expansion,
        } => {
            let request = search_request(position, expansion);
            render(engine.search_nearby(&request, cancel).await)
        }
        Commands::OpenNow {
            query,
            longitude,
            latitude,
            expansion,
        } => {
            let request = open_now_request(query, longitude.zip(latitude), expansion);
            render(engine.search_open_now(&request, cancel).await)
        }
    }
}

pub(crate) fn search_request(position: Position, expansion: ExpansionArgs) -> SearchRequest {
    SearchRequest {
        longitude: position.longitude,
        latitude: position.latitude,
        max_results: expansion.max_results,
        radius: expansion.radius,
        max_radius: expansion.max_radius,
        expansion_factor: expansion.expansion_factor,
    }
}

pub(crate) fn open_now_request(
    query: String,
    center: Option<(f64, f64)>,
    expansion: ExpansionArgs,
) -> OpenNowSearchRequest {
    OpenNowSearchRequest {
        query,
        max_results: expansion.max_results,
        initial_radius: expansion.radius,
        max_radius: expansion.max_radius,
        expansion_factor: expansion.expansion_factor,
        center: center.map(|(longitude, latitude)| Coordinates {
            longitude,
            latitude,
        }),
    }
}

pub(crate) fn render<T: Serialize>(result: Result<T, PlaceError>) -> serde_json::Result<Outcome> {
    match result {
        Ok(value) => serde_json::to_value(value).map(Outcome::Success),
        Err(err) => Ok(Outcome::Failure(err.payload())),
    }
}
