//! Request and outcome types for the radius-expanding searches.

use serde::{Deserialize, Serialize};

use crate::places::{Coordinates, PlaceRecord};

/// Largest `max_results` any operation accepts.
pub const MAX_RESULTS_LIMIT: u32 = 50;

/// Nearby search around a fixed point. Radii are in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub longitude: f64,
    pub latitude: f64,
    pub max_results: u32,
    pub radius: u32,
    pub max_radius: u32,
    pub expansion_factor: f64,
}

/// Text search restricted to places that are open at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenNowSearchRequest {
    pub query: String,
    pub max_results: u32,
    pub initial_radius: u32,
    pub max_radius: u32,
    pub expansion_factor: f64,
    /// Circle centre. When absent the query text is geocoded to find one.
    #[serde(default)]
    pub center: Option<Coordinates>,
}

/// Why the expansion loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Enough distinct results were collected.
    TargetMet,
    /// The radius ceiling was searched without meeting the target.
    CeilingReached,
    /// A later step failed; results gathered before the failure are kept.
    UpstreamFailed,
}

/// Result of a radius-expanding search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionOutcome {
    /// Distinct places in first-seen order, at most `max_results` long.
    pub places: Vec<PlaceRecord>,
    /// Radius at which the loop stopped.
    pub radius_used: u32,
    pub stop_reason: StopReason,
    /// Number of upstream steps that completed successfully.
    pub steps: u32,
    /// Raw records dropped as unreadable, summed over all steps.
    #[serde(default)]
    pub skipped: u32,
}
