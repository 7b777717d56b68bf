use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use geoplace_core::{
    AppConfig, ExpansionOutcome, OpenNowSearchRequest, PlaceRecord, SearchRequest,
    MAX_RESULTS_LIMIT,
};
use geoplace_upstream::PlacesUpstream;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorKind, PlaceError};
use crate::executor::QueryExecutor;
use crate::expansion::expand;
use crate::normalize::normalize_place;
use crate::open_now::OpenNowSearch;
use crate::response::{CoordinatesResponse, OpenNowResponse, SearchPlacesResponse};
use crate::validate;

/// Tuning knobs for [`PlacesEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Deadline for one upstream call, transport retries included.
    pub call_timeout: Duration,
    /// Records requested per open-now step, before open filtering.
    pub open_now_page_size: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            open_now_page_size: MAX_RESULTS_LIMIT,
        }
    }
}

impl EngineSettings {
    /// Gives every attempt the configured request timeout, plus a margin for
    /// back-off sleeps.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let attempts = u64::from(config.max_retries) + 1;
        let per_call = config.request_timeout_secs.saturating_mul(attempts);
        Self {
            call_timeout: Duration::from_secs(per_call.saturating_add(10)),
            ..Self::default()
        }
    }
}

/// Entry point for every places operation.
///
/// Holds the shared upstream handle; per-request state lives on the stack
/// of each call, so one engine serves any number of concurrent requests.
#[derive(Clone)]
pub struct PlacesEngine {
    upstream: Arc<dyn PlacesUpstream>,
    settings: EngineSettings,
}

impl PlacesEngine {
    #[must_use]
    pub fn new(upstream: Arc<dyn PlacesUpstream>, settings: EngineSettings) -> Self {
        Self { upstream, settings }
    }

    #[must_use]
    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(self.upstream.as_ref(), self.settings.call_timeout)
    }

    fn ensure_configured(&self) -> Result<(), PlaceError> {
        self.upstream.ensure_configured().map_err(PlaceError::from)
    }

    /// Geocodes free text into up to `max_results` places.
    ///
    /// # Errors
    ///
    /// Validation, configuration or upstream failures as [`PlaceError`].
    pub async fn search_places(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<SearchPlacesResponse, PlaceError> {
        log_failure("search_places", self.run_search_places(query, max_results).await)
    }

    /// Best match for a location string.
    ///
    /// # Errors
    ///
    /// [`PlaceError::NotFound`] when nothing matches, otherwise as
    /// [`PlacesEngine::search_places`].
    pub async fn get_coordinates(
        &self,
        location: &str,
    ) -> Result<CoordinatesResponse, PlaceError> {
        log_failure("get_coordinates", self.run_get_coordinates(location).await)
    }

    /// Nearest address or place for a position.
    ///
    /// # Errors
    ///
    /// [`PlaceError::Validation`] for out-of-range coordinates,
    /// [`PlaceError::NotFound`] when the service has nothing there.
    pub async fn reverse_geocode(
        &self,
        longitude: f64,
        latitude: f64,
    ) -> Result<PlaceRecord, PlaceError> {
        log_failure(
            "reverse_geocode",
            self.run_reverse_geocode(longitude, latitude).await,
        )
    }

    /// Full detail for one place id.
    ///
    /// # Errors
    ///
    /// [`PlaceError::NotFound`] when the service does not know the id.
    pub async fn get_place(&self, place_id: &str) -> Result<PlaceRecord, PlaceError> {
        log_failure("get_place", self.run_get_place(place_id).await)
    }

    /// Places around a point, widening the radius until `max_results`
    /// distinct places are found or `max_radius` has been searched.
    ///
    /// # Errors
    ///
    /// Validation and configuration failures before any call, the first
    /// step's upstream failure, or [`PlaceError::Cancelled`].
    pub async fn search_nearby(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<ExpansionOutcome, PlaceError> {
        log_failure("search_nearby", self.run_search_nearby(request, cancel).await)
    }

    /// Open places matching `request.query`, evaluated now.
    ///
    /// # Errors
    ///
    /// As [`PlacesEngine::search_open_now_at`].
    pub async fn search_open_now(
        &self,
        request: &OpenNowSearchRequest,
        cancel: &CancellationToken,
    ) -> Result<OpenNowResponse, PlaceError> {
        self.search_open_now_at(request, Utc::now(), cancel).await
    }

    /// Open places matching `request.query`, evaluated at `at`.
    ///
    /// Without an explicit centre the query text is geocoded first and the
    /// best hit becomes the centre of the search circle.
    ///
    /// # Errors
    ///
    /// [`PlaceError::NotFound`] when no centre can be geocoded, otherwise
    /// as [`PlacesEngine::search_nearby`].
    pub async fn search_open_now_at(
        &self,
        request: &OpenNowSearchRequest,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<OpenNowResponse, PlaceError> {
        log_failure(
            "search_open_now",
            self.run_search_open_now(request, at, cancel).await,
        )
    }

    async fn run_search_places(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<SearchPlacesResponse, PlaceError> {
        let text = validate::non_empty("query", query)?;
        let max_results = validate::max_results(max_results)?;
        self.ensure_configured()?;

        let step = self.executor().geocode(text, max_results).await?;
        let mut places = step.records;
        places.truncate(max_results as usize);
        Ok(SearchPlacesResponse {
            query: text.to_string(),
            places,
        })
    }

    async fn run_get_coordinates(
        &self,
        location: &str,
    ) -> Result<CoordinatesResponse, PlaceError> {
        let text = validate::non_empty("location", location)?;
        self.ensure_configured()?;

        let step = self.executor().geocode(text, 1).await?;
        let record = step.records.into_iter().next().ok_or_else(|| {
            PlaceError::NotFound(format!("no coordinates found for '{text}'"))
        })?;
        Ok(CoordinatesResponse::from_record(text, record))
    }

    async fn run_reverse_geocode(
        &self,
        longitude: f64,
        latitude: f64,
    ) -> Result<PlaceRecord, PlaceError> {
        let position = validate::coordinates(longitude, latitude)?;
        self.ensure_configured()?;

        let step = self.executor().reverse(position).await?;
        step.records.into_iter().next().ok_or_else(|| {
            PlaceError::NotFound(format!("no place found at ({longitude}, {latitude})"))
        })
    }

    async fn run_get_place(&self, place_id: &str) -> Result<PlaceRecord, PlaceError> {
        let id = validate::non_empty("place_id", place_id)?;
        self.ensure_configured()?;

        let raw = self.executor().place(id).await.map_err(|err| {
            if err.is_not_found() {
                PlaceError::NotFound(format!("no place with id '{id}'"))
            } else {
                PlaceError::from(err)
            }
        })?;
        normalize_place(raw).map_err(|err| PlaceError::Unavailable(err.to_string()))
    }

    async fn run_search_nearby(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<ExpansionOutcome, PlaceError> {
        let (center, params) = validate::search_request(request)?;
        self.ensure_configured()?;

        let executor = self.executor();
        let executor = &executor;
        let page_size = params.max_results;
        expand(params, cancel, move |radius| async move {
            Ok::<_, PlaceError>(executor.nearby(center, radius, page_size).await?)
        })
        .await
    }

    async fn run_search_open_now(
        &self,
        request: &OpenNowSearchRequest,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<OpenNowResponse, PlaceError> {
        let (query, center, params) = validate::open_now_request(request)?;
        self.ensure_configured()?;

        let executor = self.executor();
        let center = match center {
            Some(center) => center,
            None => {
                if cancel.is_cancelled() {
                    return Err(PlaceError::Cancelled);
                }
                let hit = executor.geocode(&query, 1).await?;
                hit.records
                    .into_iter()
                    .next()
                    .map(|record| record.coordinates)
                    .ok_or_else(|| {
                        PlaceError::NotFound(format!("could not locate '{query}'"))
                    })?
            }
        };

        OpenNowSearch {
            executor: &executor,
            query: &query,
            center,
            page_size: self.settings.open_now_page_size.max(params.max_results),
            at,
        }
        .run(params, cancel)
        .await
    }
}

/// Logs terminal upstream failures at error level; caller mistakes and
/// normal empty outcomes stay at debug.
fn log_failure<T>(operation: &str, result: Result<T, PlaceError>) -> Result<T, PlaceError> {
    if let Err(err) = &result {
        match err.kind() {
            ErrorKind::UpstreamNotConfigured
            | ErrorKind::UpstreamUnavailable
            | ErrorKind::UpstreamRejected => {
                tracing::error!(operation, error = %err, "places operation failed");
            }
            ErrorKind::ValidationError | ErrorKind::NotFound | ErrorKind::Cancelled => {
                tracing::debug!(operation, error = %err, "places operation returned no result");
            }
        }
    }
    result
}
