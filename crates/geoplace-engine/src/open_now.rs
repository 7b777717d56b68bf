//! "Find N open places matching a query near here."
//!
//! Each expansion step runs a circle-restricted text search and keeps only
//! the records that are open at the evaluation instant, so the radius keeps
//! growing until enough *open* places are found.

use chrono::{DateTime, Utc};
use geoplace_core::Coordinates;
use tokio_util::sync::CancellationToken;

use crate::error::PlaceError;
use crate::executor::{QueryExecutor, StepResult};
use crate::expansion::{expand, ExpansionParams};
use crate::hours::{evaluate_record, TimeBasis};
use crate::response::{OpenNowResponse, OpenPlace};

pub(crate) struct OpenNowSearch<'a> {
    pub executor: &'a QueryExecutor<'a>,
    pub query: &'a str,
    pub center: Coordinates,
    pub page_size: u32,
    pub at: DateTime<Utc>,
}

impl OpenNowSearch<'_> {
    /// Runs the expansion and annotates each open place with how its status
    /// was determined.
    pub(crate) async fn run(
        &self,
        params: ExpansionParams,
        cancel: &CancellationToken,
    ) -> Result<OpenNowResponse, PlaceError> {
        let Self {
            executor,
            query,
            center,
            page_size,
            at,
        } = *self;

        let outcome = expand(params, cancel, move |radius| async move {
            let page = executor
                .text_within(query, center, radius, page_size)
                .await?;
            Ok::<_, PlaceError>(open_only(page, at))
        })
        .await?;

        let open_places: Vec<OpenPlace> = outcome
            .places
            .into_iter()
            .map(|place| {
                let time_basis = evaluate_record(&place, at).basis;
                OpenPlace { place, time_basis }
            })
            .collect();
        let assumed_local = open_places
            .iter()
            .filter(|p| p.time_basis == TimeBasis::AssumedLocal)
            .count();
        if assumed_local > 0 {
            tracing::warn!(
                assumed_local,
                at = %at,
                "places without a UTC offset were evaluated as if the instant were local time"
            );
        }

        Ok(OpenNowResponse {
            query: query.to_string(),
            center,
            evaluated_at: at,
            open_places,
            radius_used: outcome.radius_used,
            stop_reason: outcome.stop_reason,
            steps: outcome.steps,
            skipped: outcome.skipped,
        })
    }
}

/// Keeps the open records; the open count becomes the step's total.
fn open_only(page: StepResult, at: DateTime<Utc>) -> StepResult {
    let fetched = page.records.len();
    let records: Vec<_> = page
        .records
        .into_iter()
        .filter(|record| evaluate_record(record, at).is_open())
        .collect();
    tracing::debug!(fetched, open = records.len(), "filtered step to open places");
    StepResult {
        reported_total: Some(records.len() as u64),
        records,
        skipped: page.skipped,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use geoplace_core::{OpeningHoursEntry, PlaceRecord};

    use super::*;

    fn place(name: &str, open_now: Option<bool>) -> PlaceRecord {
        PlaceRecord {
            name: name.into(),
            opening_hours: open_now
                .map(|flag| {
                    vec![OpeningHoursEntry {
                        open_now: Some(flag),
                        ..OpeningHoursEntry::default()
                    }]
                })
                .unwrap_or_default(),
            ..PlaceRecord::default()
        }
    }

    #[test]
    fn step_keeps_only_open_places_and_counts_them() {
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let page = StepResult {
            records: vec![
                place("open", Some(true)),
                place("closed", Some(false)),
                place("unknown", None),
                place("also open", Some(true)),
            ],
            reported_total: Some(40),
            skipped: 1,
        };
        let filtered = open_only(page, at);

        let names: Vec<_> = filtered.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["open", "also open"]);
        assert_eq!(filtered.reported_total, Some(2));
        assert_eq!(filtered.skipped, 1);
    }
}
