//! Success payloads of the caller-facing operations.

use chrono::{DateTime, Utc};
use geoplace_core::{Coordinates, PlaceRecord, StopReason};
use serde::{Deserialize, Serialize};

use crate::hours::TimeBasis;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPlacesResponse {
    pub query: String,
    pub places: Vec<PlaceRecord>,
}

/// Best geocode match for a free-text location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatesResponse {
    pub location: String,
    pub formatted_address: String,
    pub coordinates: Coordinates,
    pub country: String,
    pub region: String,
    pub municipality: String,
}

impl CoordinatesResponse {
    pub(crate) fn from_record(location: &str, record: PlaceRecord) -> Self {
        let formatted_address = if record.address.is_empty() {
            record.name
        } else {
            record.address
        };
        Self {
            location: location.to_string(),
            formatted_address,
            coordinates: record.coordinates,
            country: record.country,
            region: record.region,
            municipality: record.municipality,
        }
    }
}

/// A place that was open at the evaluation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPlace {
    #[serde(flatten)]
    pub place: PlaceRecord,
    /// How the open status was determined.
    pub time_basis: TimeBasis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenNowResponse {
    pub query: String,
    /// Centre of the search circle, given or geocoded from `query`.
    pub center: Coordinates,
    pub evaluated_at: DateTime<Utc>,
    pub open_places: Vec<OpenPlace>,
    pub radius_used: u32,
    pub stop_reason: StopReason,
    pub steps: u32,
    /// Raw records dropped as unreadable.
    pub skipped: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_address_falls_back_to_name() {
        let record = PlaceRecord {
            name: "Seattle, WA, USA".into(),
            ..PlaceRecord::default()
        };
        let response = CoordinatesResponse::from_record("Seattle", record);
        assert_eq!(response.formatted_address, "Seattle, WA, USA");
        assert_eq!(response.location, "Seattle");
    }

    #[test]
    fn open_place_flattens_record_fields() {
        let open = OpenPlace {
            place: PlaceRecord {
                name: "Bakery".into(),
                ..PlaceRecord::default()
            },
            time_basis: TimeBasis::UpstreamFlag,
        };
        let value = serde_json::to_value(&open).unwrap();
        assert_eq!(value["name"], "Bakery");
        assert_eq!(value["time_basis"], "upstream_flag");
    }
}
