//! Adaptive radius expansion.
//!
//! Runs a step function at a growing radius until enough distinct places
//! have been collected or the radius ceiling has been searched. Shared by
//! nearby search and open-now search.

use std::collections::HashSet;
use std::future::Future;

use geoplace_core::{ExpansionOutcome, PlaceRecord, StopReason};
use tokio_util::sync::CancellationToken;

use crate::error::PlaceError;
use crate::executor::StepResult;

/// Validated expansion parameters. Build these through the engine's
/// request validation; the controller assumes the invariants hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionParams {
    pub initial_radius: u32,
    pub max_radius: u32,
    pub max_results: u32,
    pub expansion_factor: f64,
}

/// Next radius after `radius`: grows by `factor`, by at least one meter,
/// and never past `max_radius`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn next_radius(radius: u32, max_radius: u32, factor: f64) -> u32 {
    let grown = (f64::from(radius) * factor).ceil();
    let at_least_one_more = f64::from(radius.saturating_add(1));
    grown.max(at_least_one_more).min(f64::from(max_radius)) as u32
}

/// Upper bound on the number of steps, independent of floating-point drift.
///
/// Geometric growth reaches the ceiling within
/// `ceil(log_factor(max / initial)) + 1` steps and the one-meter minimum
/// within `max - initial + 1`; the smaller bound applies.
#[must_use]
pub fn iteration_cap(initial_radius: u32, max_radius: u32, factor: f64) -> u32 {
    let linear = max_radius.saturating_sub(initial_radius).saturating_add(1);
    if initial_radius == 0 || max_radius <= initial_radius {
        return 1;
    }
    let geometric = (f64::from(max_radius) / f64::from(initial_radius)).ln() / factor.ln();
    if !geometric.is_finite() || geometric < 0.0 {
        return linear;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let geometric = (geometric.ceil() as u32).saturating_add(1);
    geometric.min(linear).max(1)
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum PlaceKey {
    Id(String),
    NameAt(String, u64, u64),
}

impl PlaceKey {
    fn of(record: &PlaceRecord) -> Self {
        match &record.place_id {
            Some(id) => PlaceKey::Id(id.clone()),
            None => PlaceKey::NameAt(
                record.name.clone(),
                record.coordinates.longitude.to_bits(),
                record.coordinates.latitude.to_bits(),
            ),
        }
    }
}

/// Distinct places in first-seen order, capped at `limit`.
struct Accumulator {
    limit: usize,
    seen: HashSet<PlaceKey>,
    places: Vec<PlaceRecord>,
}

impl Accumulator {
    fn new(limit: u32) -> Self {
        let limit = limit as usize;
        Self {
            limit,
            seen: HashSet::new(),
            places: Vec::with_capacity(limit),
        }
    }

    fn extend(&mut self, records: Vec<PlaceRecord>) {
        for record in records {
            if self.is_full() {
                break;
            }
            if self.seen.insert(PlaceKey::of(&record)) {
                tracing::debug!(place = %record.summary(), "new place");
                self.places.push(record);
            }
        }
    }

    fn is_full(&self) -> bool {
        self.places.len() >= self.limit
    }

    fn len(&self) -> usize {
        self.places.len()
    }
}

/// Drives `step` with a growing radius.
///
/// Stops when `max_results` distinct places have been collected
/// ([`StopReason::TargetMet`]) or after the call at `max_radius`
/// ([`StopReason::CeilingReached`]). `radius_used` is the radius of the
/// step at which the stop condition first held.
///
/// A failed first step returns its error. A failed later step stops the
/// loop and keeps what was collected, with `radius_used` set to the last
/// radius that succeeded ([`StopReason::UpstreamFailed`]).
///
/// # Errors
///
/// Returns [`PlaceError::Cancelled`] if `cancel` fires before a step, or
/// the first step's error.
pub async fn expand<F, Fut>(
    params: ExpansionParams,
    cancel: &CancellationToken,
    mut step: F,
) -> Result<ExpansionOutcome, PlaceError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<StepResult, PlaceError>>,
{
    let cap = iteration_cap(
        params.initial_radius,
        params.max_radius,
        params.expansion_factor,
    );
    let mut accumulated = Accumulator::new(params.max_results);
    let mut radius = params.initial_radius;
    let mut last_ok: Option<u32> = None;
    let mut steps = 0u32;
    let mut skipped = 0u32;

    for iteration in 1..=cap {
        if cancel.is_cancelled() {
            tracing::debug!(steps, "expansion cancelled");
            return Err(PlaceError::Cancelled);
        }
        if iteration == cap {
            radius = params.max_radius;
        }

        match step(radius).await {
            Ok(result) => {
                steps += 1;
                last_ok = Some(radius);
                let reported_total = result.reported_total;
                skipped = skipped
                    .saturating_add(u32::try_from(result.skipped).unwrap_or(u32::MAX));
                accumulated.extend(result.records);
                tracing::debug!(
                    radius,
                    step = steps,
                    accumulated = accumulated.len(),
                    reported_total,
                    "expansion step complete"
                );
            }
            Err(err) => {
                let Some(last_radius) = last_ok else {
                    return Err(err);
                };
                tracing::error!(
                    radius,
                    step = steps + 1,
                    error = %err,
                    "expansion step failed; returning places collected so far"
                );
                return Ok(finish(
                    accumulated,
                    last_radius,
                    StopReason::UpstreamFailed,
                    steps,
                    skipped,
                ));
            }
        }

        if accumulated.is_full() {
            return Ok(finish(
                accumulated,
                radius,
                StopReason::TargetMet,
                steps,
                skipped,
            ));
        }
        if radius >= params.max_radius {
            return Ok(finish(
                accumulated,
                radius,
                StopReason::CeilingReached,
                steps,
                skipped,
            ));
        }
        radius = next_radius(radius, params.max_radius, params.expansion_factor);
    }

    // The last iteration runs at `max_radius` and returns from the loop.
    Ok(finish(
        accumulated,
        last_ok.unwrap_or(params.initial_radius),
        StopReason::CeilingReached,
        steps,
        skipped,
    ))
}

fn finish(
    accumulated: Accumulator,
    radius_used: u32,
    stop_reason: StopReason,
    steps: u32,
    skipped: u32,
) -> ExpansionOutcome {
    if skipped > 0 {
        tracing::warn!(skipped, steps, "unreadable place records were dropped");
    }
    ExpansionOutcome {
        places: accumulated.places,
        radius_used,
        stop_reason,
        steps,
        skipped,
    }
}
