//! One bounded upstream call, normalized.
//!
//! The executor never retries; transport retries live in the client and
//! radius growth lives in [`crate::expansion`].

use std::future::Future;
use std::time::Duration;

use geoplace_core::{Coordinates, PlaceRecord};
use geoplace_upstream::{
    NearbyQuery, PlacesUpstream, RawPage, SearchCircle, TextQuery, UpstreamError,
};

use crate::normalize::normalize_place;

/// Normalized records from one upstream call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResult {
    pub records: Vec<PlaceRecord>,
    /// Total the upstream claims to have, when it reports one.
    pub reported_total: Option<u64>,
    /// Raw records dropped because they could not be read at all.
    pub skipped: usize,
}

impl StepResult {
    /// Normalizes every item of `page`, skipping malformed records.
    pub(crate) fn from_page(page: RawPage, context: &str) -> Self {
        let mut records = Vec::with_capacity(page.items.len());
        let mut skipped = 0usize;
        for (index, raw) in page.items.into_iter().enumerate() {
            match normalize_place(raw) {
                Ok(record) => records.push(record),
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(context, index, error = %err, "skipping malformed place record");
                }
            }
        }
        Self {
            records,
            reported_total: page.reported_total,
            skipped,
        }
    }
}

/// Issues single upstream calls under a per-call deadline.
pub(crate) struct QueryExecutor<'a> {
    upstream: &'a dyn PlacesUpstream,
    call_timeout: Duration,
}

impl<'a> QueryExecutor<'a> {
    pub(crate) fn new(upstream: &'a dyn PlacesUpstream, call_timeout: Duration) -> Self {
        Self {
            upstream,
            call_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, UpstreamError>>,
    ) -> Result<T, UpstreamError> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| UpstreamError::Timeout(self.call_timeout))?
    }

    pub(crate) async fn geocode(
        &self,
        text: &str,
        max_results: u32,
    ) -> Result<StepResult, UpstreamError> {
        tracing::debug!(max_results, "geocode");
        let query = TextQuery::geocode(text, max_results);
        let page = self.bounded(self.upstream.search_text(&query)).await?;
        Ok(StepResult::from_page(page, "geocode"))
    }

    pub(crate) async fn text_within(
        &self,
        text: &str,
        center: Coordinates,
        radius: u32,
        max_results: u32,
    ) -> Result<StepResult, UpstreamError> {
        tracing::debug!(radius, max_results, "text search within circle");
        let query = TextQuery::within(text, max_results, SearchCircle { center, radius });
        let page = self.bounded(self.upstream.search_text(&query)).await?;
        Ok(StepResult::from_page(page, "search-text"))
    }

    pub(crate) async fn nearby(
        &self,
        center: Coordinates,
        radius: u32,
        max_results: u32,
    ) -> Result<StepResult, UpstreamError> {
        tracing::debug!(radius, max_results, "nearby search");
        let query = NearbyQuery {
            position: center,
            radius,
            max_results,
        };
        let page = self.bounded(self.upstream.search_nearby(&query)).await?;
        Ok(StepResult::from_page(page, "search-nearby"))
    }

    pub(crate) async fn reverse(&self, position: Coordinates) -> Result<StepResult, UpstreamError> {
        tracing::debug!("reverse geocode");
        let page = self
            .bounded(self.upstream.reverse_geocode(position))
            .await?;
        Ok(StepResult::from_page(page, "reverse-geocode"))
    }

    pub(crate) async fn place(&self, place_id: &str) -> Result<serde_json::Value, UpstreamError> {
        tracing::debug!("place detail");
        self.bounded(self.upstream.get_place(place_id)).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn malformed_records_are_skipped_and_counted() {
        let page = RawPage {
            items: vec![
                json!({ "Title": "First" }),
                json!("garbage"),
                json!({ "Title": "Second" }),
                json!(null),
            ],
            reported_total: Some(4),
        };
        let step = StepResult::from_page(page, "test");

        assert_eq!(step.skipped, 2);
        assert_eq!(step.reported_total, Some(4));
        let names: Vec<_> = step.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn empty_page_is_an_empty_step() {
        let step = StepResult::from_page(RawPage::default(), "test");
        assert!(step.records.is_empty());
        assert_eq!(step.skipped, 0);
        assert!(step.reported_total.is_none());
    }
}
