//! Normalization from raw upstream records to [`PlaceRecord`].
//!
//! Two shapes are understood: the v2 `ResultItems` record (`Title`,
//! `Address.Label`, `Position`) and the legacy place-index record, which
//! wraps the place in `Place` and uses `Label` and `Geometry.Point`. Every
//! field is decoded on its own, so a malformed field falls back to its
//! default instead of failing the record.

use geoplace_core::{
    Contacts, Coordinates, OpeningHoursComponent, OpeningHoursEntry, PlaceRecord, PlaceTimeZone,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::MalformedRecordError;

/// Decodes the field when it has the expected shape, otherwise `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decodes a list element by element, dropping elements of the wrong shape.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPlace {
    #[serde(default, deserialize_with = "lenient")]
    place_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    address: Option<RawAddress>,
    #[serde(default, deserialize_with = "lenient")]
    position: Option<[f64; 2]>,
    #[serde(default, deserialize_with = "lenient")]
    geometry: Option<RawGeometry>,
    #[serde(default, deserialize_with = "lenient_list")]
    categories: Vec<RawCategory>,
    #[serde(default, deserialize_with = "lenient")]
    contacts: Option<RawContacts>,
    #[serde(default, deserialize_with = "lenient_list")]
    opening_hours: Vec<RawOpeningHours>,
    #[serde(default, deserialize_with = "lenient")]
    time_zone: Option<RawTimeZone>,
    #[serde(default, deserialize_with = "lenient")]
    country: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    region: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    municipality: Option<String>,
    /// Legacy wrapper: `{"Place": {...}, "PlaceId": "..."}`.
    #[serde(default, deserialize_with = "lenient")]
    place: Option<Box<RawPlace>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAddress {
    #[serde(default, deserialize_with = "lenient")]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    country: Option<RawNamedCode>,
    #[serde(default, deserialize_with = "lenient")]
    region: Option<RawNamedCode>,
    #[serde(default, deserialize_with = "lenient")]
    locality: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawNamedCode {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    code3: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    code2: Option<String>,
}

impl RawNamedCode {
    fn into_text(self) -> Option<String> {
        self.name
            .or(self.code3)
            .or(self.code)
            .or(self.code2)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawGeometry {
    #[serde(default, deserialize_with = "lenient")]
    point: Option<[f64; 2]>,
}

/// v2 categories are objects; legacy categories are bare strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Named {
        #[serde(rename = "Name")]
        name: Option<String>,
        #[serde(rename = "Id")]
        id: Option<String>,
    },
    Plain(String),
}

impl RawCategory {
    fn into_text(self) -> Option<String> {
        match self {
            RawCategory::Named { name, id } => name.or(id),
            RawCategory::Plain(text) => Some(text),
        }
        .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawContacts {
    #[serde(default, deserialize_with = "lenient_list")]
    phones: Vec<RawContactValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    websites: Vec<RawContactValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    faxes: Vec<RawContactValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    emails: Vec<RawContactValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContactValue {
    Detail {
        #[serde(rename = "Value")]
        value: String,
    },
    Plain(String),
}

fn contact_values(values: Vec<RawContactValue>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| match v {
            RawContactValue::Detail { value } | RawContactValue::Plain(value) => value,
        })
        .filter(|v| !v.is_empty())
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawOpeningHours {
    #[serde(default, deserialize_with = "lenient_list")]
    display: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    open_now: Option<bool>,
    #[serde(default, deserialize_with = "lenient_list")]
    components: Vec<RawHoursComponent>,
    #[serde(default, deserialize_with = "lenient_list")]
    categories: Vec<RawCategory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHoursComponent {
    #[serde(default, deserialize_with = "lenient")]
    open_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    open_duration: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    recurrence: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawTimeZone {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    /// Text (`"-07:00"`) in v2, integer seconds in the legacy shape.
    #[serde(default)]
    offset: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    offset_seconds: Option<i64>,
}

impl RawTimeZone {
    fn into_time_zone(self) -> Option<PlaceTimeZone> {
        let (offset, legacy_seconds) = match self.offset {
            Some(Value::String(text)) if !text.is_empty() => (Some(text), None),
            Some(Value::Number(n)) => (None, n.as_i64()),
            _ => (None, None),
        };
        let offset_seconds = self
            .offset_seconds
            .or(legacy_seconds)
            .and_then(|s| i32::try_from(s).ok());
        let zone = PlaceTimeZone {
            name: self.name.filter(|s| !s.is_empty()),
            offset,
            offset_seconds,
        };
        (zone != PlaceTimeZone::default()).then_some(zone)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Normalizes one raw upstream record.
///
/// # Errors
///
/// Returns [`MalformedRecordError`] when `raw` is not a JSON object. Any
/// individual field of the wrong shape only falls back to its default.
pub fn normalize_place(raw: Value) -> Result<PlaceRecord, MalformedRecordError> {
    if !raw.is_object() {
        return Err(MalformedRecordError {
            reason: format!("expected a JSON object, got {}", json_type_name(&raw)),
        });
    }
    let outer: RawPlace = serde_json::from_value(raw).map_err(|e| MalformedRecordError {
        reason: e.to_string(),
    })?;

    // Legacy records put the place one level down and the id beside it.
    let (raw, outer_id) = match outer.place {
        Some(inner) => (*inner, outer.place_id),
        None => (outer, None),
    };

    Ok(into_record(raw, outer_id))
}

fn into_record(raw: RawPlace, outer_id: Option<String>) -> PlaceRecord {
    let address = raw.address.unwrap_or_default();
    let label = non_empty(raw.label);
    let address_label = non_empty(address.label);

    let name = non_empty(raw.title)
        .or_else(|| label.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let address_text = address_label.or(label).unwrap_or_default();

    let coordinates = raw
        .position
        .or(raw.geometry.and_then(|g| g.point))
        .and_then(|[lon, lat]| Coordinates::new(lon, lat))
        .unwrap_or(Coordinates::ORIGIN);

    let contacts = raw
        .contacts
        .map(|c| Contacts {
            phones: contact_values(c.phones),
            websites: contact_values(c.websites),
            faxes: contact_values(c.faxes),
            emails: contact_values(c.emails),
        })
        .unwrap_or_default();

    let opening_hours = raw
        .opening_hours
        .into_iter()
        .map(|h| OpeningHoursEntry {
            display: h.display,
            components: h
                .components
                .into_iter()
                .map(|c| OpeningHoursComponent {
                    open_time: c.open_time,
                    open_duration: c.open_duration,
                    recurrence: c.recurrence,
                })
                .collect(),
            open_now: h.open_now,
            categories: h
                .categories
                .into_iter()
                .filter_map(RawCategory::into_text)
                .collect(),
        })
        .collect();

    PlaceRecord {
        name,
        address: address_text,
        coordinates,
        categories: raw
            .categories
            .into_iter()
            .filter_map(RawCategory::into_text)
            .collect(),
        contacts,
        opening_hours,
        place_id: non_empty(raw.place_id).or_else(|| non_empty(outer_id)),
        country: non_empty(raw.country)
            .or_else(|| address.country.and_then(RawNamedCode::into_text))
            .unwrap_or_default(),
        region: non_empty(raw.region)
            .or_else(|| address.region.and_then(RawNamedCode::into_text))
            .unwrap_or_default(),
        municipality: non_empty(raw.municipality)
            .or_else(|| non_empty(address.locality))
            .unwrap_or_default(),
        time_zone: raw.time_zone.and_then(RawTimeZone::into_time_zone),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
