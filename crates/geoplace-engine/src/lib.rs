//! Adaptive radius search and open-now filtering over a places service.
//!
//! [`PlacesEngine`] is the single entry point. It is constructed once with
//! a shared [`geoplace_upstream::PlacesUpstream`] handle and validates every
//! request before the upstream is touched.

mod engine;
pub mod error;
mod executor;
pub mod expansion;
pub mod hours;
mod normalize;
mod open_now;
pub mod response;
mod validate;

pub use engine::{EngineSettings, PlacesEngine};
pub use error::{ErrorKind, ErrorPayload, MalformedRecordError, PlaceError};
pub use executor::StepResult;
pub use expansion::{expand, iteration_cap, next_radius, ExpansionParams};
pub use hours::{
    evaluate_open_now, evaluate_record, is_open_now, OpenNowEvaluation, OpenStatus, TimeBasis,
};
pub use normalize::normalize_place;
pub use response::{CoordinatesResponse, OpenNowResponse, OpenPlace, SearchPlacesResponse};
pub use tokio_util::sync::CancellationToken;
