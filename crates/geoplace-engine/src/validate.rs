//! Caller-input checks. Everything here runs before the upstream is touched.

use geoplace_core::{Coordinates, OpenNowSearchRequest, SearchRequest, MAX_RESULTS_LIMIT};

use crate::error::PlaceError;
use crate::expansion::ExpansionParams;

pub(crate) fn max_results(value: u32) -> Result<u32, PlaceError> {
    if (1..=MAX_RESULTS_LIMIT).contains(&value) {
        Ok(value)
    } else {
        Err(PlaceError::Validation(format!(
            "max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {value}"
        )))
    }
}

/// Returns the trimmed text, rejecting blank input.
pub(crate) fn non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, PlaceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(PlaceError::Validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

pub(crate) fn coordinates(longitude: f64, latitude: f64) -> Result<Coordinates, PlaceError> {
    Coordinates::new(longitude, latitude).ok_or_else(|| {
        PlaceError::Validation(format!(
            "coordinates out of range: longitude must be within [-180, 180] and latitude \
             within [-90, 90], got ({longitude}, {latitude})"
        ))
    })
}

pub(crate) fn expansion(
    initial_radius: u32,
    max_radius: u32,
    max_results_value: u32,
    expansion_factor: f64,
) -> Result<ExpansionParams, PlaceError> {
    let max_results_value = max_results(max_results_value)?;
    if initial_radius == 0 {
        return Err(PlaceError::Validation(
            "radius must be greater than 0 meters".to_string(),
        ));
    }
    if max_radius < initial_radius {
        return Err(PlaceError::Validation(format!(
            "max_radius ({max_radius}) must be at least the initial radius ({initial_radius})"
        )));
    }
    if !expansion_factor.is_finite() || expansion_factor <= 1.0 {
        return Err(PlaceError::Validation(format!(
            "expansion_factor must be a finite number greater than 1.0, got {expansion_factor}"
        )));
    }
    Ok(ExpansionParams {
        initial_radius,
        max_radius,
        max_results: max_results_value,
        expansion_factor,
    })
}

pub(crate) fn search_request(
    req: &SearchRequest,
) -> Result<(Coordinates, ExpansionParams), PlaceError> {
    let center = coordinates(req.longitude, req.latitude)?;
    let params = expansion(
        req.radius,
        req.max_radius,
        req.max_results,
        req.expansion_factor,
    )?;
    Ok((center, params))
}

pub(crate) fn open_now_request(
    req: &OpenNowSearchRequest,
) -> Result<(String, Option<Coordinates>, ExpansionParams), PlaceError> {
    let query = non_empty("query", &req.query)?.to_string();
    let center = req
        .center
        .map(|c| coordinates(c.longitude, c.latitude))
        .transpose()?;
    let params = expansion(
        req.initial_radius,
        req.max_radius,
        req.max_results,
        req.expansion_factor,
    )?;
    Ok((query, center, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SearchRequest {
        SearchRequest {
            longitude: -122.33,
            latitude: 47.60,
            max_results: 3,
            radius: 10,
            max_radius: 2000,
            expansion_factor: 2.0,
        }
    }

    #[test]
    fn max_results_bounds_are_inclusive() {
        assert!(max_results(0).is_err());
        assert_eq!(max_results(1).unwrap(), 1);
        assert_eq!(max_results(50).unwrap(), 50);
        assert!(max_results(51).is_err());
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(non_empty("query", "   ").is_err());
        assert_eq!(non_empty("query", "  coffee ").unwrap(), "coffee");
    }

    #[test]
    fn valid_search_request_passes() {
        let (center, params) = search_request(&request()).unwrap();
        assert_eq!(center.as_pair(), [-122.33, 47.60]);
        assert_eq!(params.initial_radius, 10);
        assert_eq!(params.max_radius, 2000);
    }

    #[test]
    fn factor_at_or_below_one_is_rejected() {
        for factor in [1.0, 0.5, -2.0, f64::NAN, f64::INFINITY] {
            let req = SearchRequest {
                expansion_factor: factor,
                ..request()
            };
            assert!(
                matches!(search_request(&req), Err(PlaceError::Validation(_))),
                "factor {factor} should be rejected"
            );
        }
    }

    #[test]
    fn radius_rules() {
        let zero = SearchRequest {
            radius: 0,
            ..request()
        };
        assert!(search_request(&zero).is_err());

        let inverted = SearchRequest {
            radius: 500,
            max_radius: 100,
            ..request()
        };
        assert!(search_request(&inverted).is_err());

        let equal = SearchRequest {
            radius: 500,
            max_radius: 500,
            ..request()
        };
        assert!(search_request(&equal).is_ok());
    }

    #[test]
    fn out_of_range_center_is_rejected() {
        let req = SearchRequest {
            latitude: 95.0,
            ..request()
        };
        assert!(search_request(&req).is_err());
    }

    #[test]
    fn open_now_center_is_checked_when_present() {
        let req = OpenNowSearchRequest {
            query: "pharmacy".into(),
            max_results: 2,
            initial_radius: 100,
            max_radius: 1000,
            expansion_factor: 1.5,
            center: Some(Coordinates {
                longitude: 200.0,
                latitude: 0.0,
            }),
        };
        assert!(open_now_request(&req).is_err());

        let without_center = OpenNowSearchRequest {
            center: None,
            ..req
        };
        let (query, center, _) = open_now_request(&without_center).unwrap();
        assert_eq!(query, "pharmacy");
        assert!(center.is_none());
    }
}
