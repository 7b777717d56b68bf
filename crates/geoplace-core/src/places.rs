//! Canonical place records.
//!
//! Every upstream shape is normalized into [`PlaceRecord`] before the rest of
//! the system sees it. Sequence fields are always present (possibly empty) so
//! callers can iterate without null checks.

use serde::{Deserialize, Serialize};

/// A WGS-84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    /// `(0.0, 0.0)`, the stand-in for records without a usable position.
    pub const ORIGIN: Self = Self {
        longitude: 0.0,
        latitude: 0.0,
    };

    /// Builds a coordinate pair, returning `None` when either component is
    /// non-finite or outside the WGS-84 range.
    #[must_use]
    pub fn new(longitude: f64, latitude: f64) -> Option<Self> {
        let candidate = Self {
            longitude,
            latitude,
        };
        candidate.is_valid().then_some(candidate)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }

    /// Position in the upstream `[longitude, latitude]` order.
    #[must_use]
    pub fn as_pair(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Contact channels for a place.
///
/// `Debug` redacts email addresses; use [`PlaceRecord::summary`] for log output.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contacts {
    pub phones: Vec<String>,
    pub websites: Vec<String>,
    pub faxes: Vec<String>,
    pub emails: Vec<String>,
}

impl std::fmt::Debug for Contacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contacts")
            .field("phones", &self.phones)
            .field("websites", &self.websites)
            .field("faxes", &self.faxes)
            .field("emails", &format_args!("[{} redacted]", self.emails.len()))
            .finish()
    }
}

/// One structured opening-hours rule as delivered upstream.
///
/// Values are kept verbatim (`"T080000"`, `"PT10H00M"`,
/// `"FREQ:DAILY;BYDAY:MO,TU"`); interpretation happens at evaluation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHoursComponent {
    pub open_time: Option<String>,
    pub open_duration: Option<String>,
    pub recurrence: Option<String>,
}

/// An alternative schedule for a place (regular hours, holiday hours, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHoursEntry {
    pub display: Vec<String>,
    pub components: Vec<OpeningHoursComponent>,
    /// Upstream-asserted current status, authoritative when present.
    pub open_now: Option<bool>,
    pub categories: Vec<String>,
}

/// Time zone information reported for a place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceTimeZone {
    pub name: Option<String>,
    /// UTC offset as text, e.g. `"-07:00"`.
    pub offset: Option<String>,
    pub offset_seconds: Option<i32>,
}

/// Canonical, upstream-agnostic place record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub categories: Vec<String>,
    pub contacts: Contacts,
    pub opening_hours: Vec<OpeningHoursEntry>,
    /// Opaque upstream identifier; `None` means detail lookup is unavailable.
    pub place_id: Option<String>,
    pub country: String,
    pub region: String,
    pub municipality: String,
    pub time_zone: Option<PlaceTimeZone>,
}

impl Default for PlaceRecord {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            address: String::new(),
            coordinates: Coordinates::ORIGIN,
            categories: Vec::new(),
            contacts: Contacts::default(),
            opening_hours: Vec::new(),
            place_id: None,
            country: String::new(),
            region: String::new(),
            municipality: String::new(),
            time_zone: None,
        }
    }
}

impl PlaceRecord {
    /// Log-safe view of the record. Never includes email addresses.
    #[must_use]
    pub fn summary(&self) -> PlaceSummary<'_> {
        PlaceSummary { record: self }
    }
}

/// Borrowed, log-safe rendering of a [`PlaceRecord`].
pub struct PlaceSummary<'a> {
    record: &'a PlaceRecord,
}

impl std::fmt::Display for PlaceSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.record;
        write!(
            f,
            "{} @ ({}, {})",
            r.name, r.coordinates.longitude, r.coordinates.latitude
        )?;
        if !r.address.is_empty() {
            write!(f, " [{}]", r.address)?;
        }
        if !r.categories.is_empty() {
            write!(f, " categories={}", r.categories.join(", "))?;
        }
        if !r.contacts.phones.is_empty() {
            write!(f, " phones={}", r.contacts.phones.join(", "))?;
        }
        if !r.contacts.websites.is_empty() {
            write!(f, " websites={}", r.contacts.websites.join(", "))?;
        }
        if !r.contacts.faxes.is_empty() {
            write!(f, " faxes={}", r.contacts.faxes.join(", "))?;
        }
        Ok(())
    }
}
