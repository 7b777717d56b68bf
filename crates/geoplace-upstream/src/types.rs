//! Query parameters and wire bodies for the places service.
//!
//! Request bodies follow the geo-places v2 JSON API: PascalCase keys and
//! positions as `[longitude, latitude]` pairs. Responses are kept as raw
//! `serde_json::Value` items here; decoding into canonical records happens
//! in the engine's normalizer so one bad record cannot fail a whole page.

use geoplace_core::Coordinates;
use serde::{Deserialize, Serialize};

/// Optional features requested with every search so that contacts, opening
/// hours and time zones come back with the records.
pub(crate) const SEARCH_FEATURES: &[&str] = &["Contact", "TimeZone"];

/// A circular restriction around a centre, radius in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchCircle {
    pub center: Coordinates,
    pub radius: u32,
}

/// Free-text query.
///
/// Without a `circle` this is a plain geocode; with one it is a place
/// search restricted to that circle.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    pub text: String,
    pub max_results: u32,
    pub circle: Option<SearchCircle>,
}

impl TextQuery {
    #[must_use]
    pub fn geocode(text: impl Into<String>, max_results: u32) -> Self {
        Self {
            text: text.into(),
            max_results,
            circle: None,
        }
    }

    #[must_use]
    pub fn within(text: impl Into<String>, max_results: u32, circle: SearchCircle) -> Self {
        Self {
            text: text.into(),
            max_results,
            circle: Some(circle),
        }
    }

    pub(crate) fn is_plain_geocode(&self) -> bool {
        self.circle.is_none()
    }
}

/// Places around a fixed position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub position: Coordinates,
    pub radius: u32,
    pub max_results: u32,
}

/// One page of raw upstream records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub items: Vec<serde_json::Value>,
    /// Total matches the service claims to have, when it says so.
    pub reported_total: Option<u64>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct GeocodeBody<'a> {
    pub query_text: &'a str,
    pub max_results: u32,
    pub additional_features: &'static [&'static str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SearchTextBody<'a> {
    pub query_text: &'a str,
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<SearchTextFilter>,
    pub additional_features: &'static [&'static str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SearchTextFilter {
    pub circle: CircleBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CircleBody {
    pub center: [f64; 2],
    pub radius: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SearchNearbyBody {
    pub query_position: [f64; 2],
    pub query_radius: u32,
    pub max_results: u32,
    pub additional_features: &'static [&'static str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ReverseGeocodeBody {
    pub query_position: [f64; 2],
    pub max_results: u32,
    pub additional_features: &'static [&'static str],
}

impl<'a> SearchTextBody<'a> {
    pub(crate) fn from_query(query: &'a TextQuery) -> Self {
        Self {
            query_text: &query.text,
            max_results: query.max_results,
            filter: query.circle.map(|c| SearchTextFilter {
                circle: CircleBody {
                    center: c.center.as_pair(),
                    radius: c.radius,
                },
            }),
            additional_features: SEARCH_FEATURES,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    #[serde(rename = "ResultItems", alias = "Results")]
    items: Vec<serde_json::Value>,
    #[serde(rename = "Summary", default)]
    summary: Option<ListSummary>,
}

#[derive(Debug, Deserialize)]
struct ListSummary {
    #[serde(rename = "TotalResults", default)]
    total_results: Option<u64>,
}

/// Pulls the record list and optional total out of a list response.
///
/// Accepts the v2 `ResultItems` envelope and the legacy place-index
/// `Results` envelope.
pub(crate) fn page_from_body(body: serde_json::Value) -> Result<RawPage, serde_json::Error> {
    let envelope: ListEnvelope = serde_json::from_value(body)?;
    Ok(RawPage {
        items: envelope.items,
        reported_total: envelope.summary.and_then(|s| s.total_results),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn search_text_body_serializes_circle_filter() {
        let query = TextQuery::within(
            "coffee",
            10,
            SearchCircle {
                center: Coordinates {
                    longitude: -122.33,
                    latitude: 47.6,
                },
                radius: 500,
            },
        );
        let body = serde_json::to_value(SearchTextBody::from_query(&query)).unwrap();
        assert_eq!(
            body,
            json!({
                "QueryText": "coffee",
                "MaxResults": 10,
                "Filter": { "Circle": { "Center": [-122.33, 47.6], "Radius": 500 } },
                "AdditionalFeatures": ["Contact", "TimeZone"]
            })
        );
    }

    #[test]
    fn plain_geocode_detection() {
        assert!(TextQuery::geocode("Seattle", 1).is_plain_geocode());
        let circle = SearchCircle {
            center: Coordinates::ORIGIN,
            radius: 100,
        };
        assert!(!TextQuery::within("Seattle", 1, circle).is_plain_geocode());
    }

    #[test]
    fn page_from_v2_envelope() {
        let page =
            page_from_body(json!({ "ResultItems": [{ "Title": "A" }, { "Title": "B" }] })).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.reported_total.is_none());
    }

    #[test]
    fn page_from_legacy_envelope_with_total() {
        let page = page_from_body(json!({
            "Summary": { "TotalResults": 12 },
            "Results": [{ "Place": { "Label": "Seattle, WA, USA" } }]
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.reported_total, Some(12));
    }

    #[test]
    fn page_requires_an_array() {
        assert!(page_from_body(json!({ "ResultItems": "oops" })).is_err());
        assert!(page_from_body(json!({})).is_err());
    }
}
