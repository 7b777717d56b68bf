//! Open-now evaluation for opening-hours entries.
//!
//! Each entry is an alternative schedule and is evaluated on its own: its
//! upstream `OpenNow` flag decides when present, otherwise its structured
//! components are evaluated against the place's local wall clock. The place
//! is open when any entry says so. Local time comes from the record's fixed
//! UTC offset; when the record has none, the instant is read as already
//! local and the result says so through [`TimeBasis::AssumedLocal`].

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, NaiveTime, Utc, Weekday};
use geoplace_core::{OpeningHoursComponent, OpeningHoursEntry, PlaceRecord, PlaceTimeZone};
use regex::Regex;
use serde::{Deserialize, Serialize};

static OPEN_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^T?(\d{2}):?(\d{2})(?::?(\d{2}))?").expect("valid regex")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").expect("valid regex")
});

static OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:UTC|GMT)?([+-])(\d{2}):?(\d{2})$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenStatus {
    Open,
    Closed,
    /// No flag and no usable component; callers treat this as not open.
    Unknown,
}

/// Where the answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasis {
    /// An explicit upstream `OpenNow` flag.
    UpstreamFlag,
    /// Components evaluated in the place's own UTC offset.
    PlaceOffset,
    /// Components evaluated with the instant taken as local time.
    AssumedLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenNowEvaluation {
    pub status: OpenStatus,
    pub basis: TimeBasis,
}

impl OpenNowEvaluation {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == OpenStatus::Open
    }
}

/// Evaluates `entries` at instant `at`.
///
/// The reported basis is the one of the entry that decided the answer: the
/// first open entry, else the first entry that could be evaluated.
#[must_use]
pub fn evaluate_open_now(
    entries: &[OpeningHoursEntry],
    time_zone: Option<&PlaceTimeZone>,
    at: DateTime<Utc>,
) -> OpenNowEvaluation {
    let (local, clock_basis) = match time_zone.and_then(resolve_offset) {
        Some(offset) => (
            at.with_timezone(&offset).naive_local(),
            TimeBasis::PlaceOffset,
        ),
        None => (at.naive_utc(), TimeBasis::AssumedLocal),
    };

    let mut decided: Option<OpenNowEvaluation> = None;
    for entry in entries {
        let Some(eval) = evaluate_entry(entry, local, clock_basis) else {
            continue;
        };
        if eval.is_open() {
            return eval;
        }
        if decided.is_none() {
            decided = Some(eval);
        }
    }

    decided.unwrap_or(OpenNowEvaluation {
        status: OpenStatus::Unknown,
        basis: clock_basis,
    })
}

/// `None` when the entry has neither a flag nor a usable component.
fn evaluate_entry(
    entry: &OpeningHoursEntry,
    local: NaiveDateTime,
    clock_basis: TimeBasis,
) -> Option<OpenNowEvaluation> {
    if let Some(open) = entry.open_now {
        return Some(OpenNowEvaluation {
            status: status_of(open),
            basis: TimeBasis::UpstreamFlag,
        });
    }

    let mut rules = entry.components.iter().filter_map(HoursRule::parse).peekable();
    rules.peek()?;
    let open = rules.any(|rule| rule.covers(local));
    Some(OpenNowEvaluation {
        status: status_of(open),
        basis: clock_basis,
    })
}

fn status_of(open: bool) -> OpenStatus {
    if open {
        OpenStatus::Open
    } else {
        OpenStatus::Closed
    }
}

/// Evaluates a record's opening hours in its own time zone.
#[must_use]
pub fn evaluate_record(record: &PlaceRecord, at: DateTime<Utc>) -> OpenNowEvaluation {
    evaluate_open_now(&record.opening_hours, record.time_zone.as_ref(), at)
}

/// `true` only when the place is known to be open. Unknown counts as closed.
#[must_use]
pub fn is_open_now(
    entries: &[OpeningHoursEntry],
    time_zone: Option<&PlaceTimeZone>,
    at: DateTime<Utc>,
) -> bool {
    evaluate_open_now(entries, time_zone, at).is_open()
}

fn resolve_offset(tz: &PlaceTimeZone) -> Option<FixedOffset> {
    tz.offset_seconds
        .and_then(FixedOffset::east_opt)
        .or_else(|| tz.offset.as_deref().and_then(parse_offset))
}

/// Parses `"+05:30"`, `"-0700"` or `"UTC-07:00"`.
fn parse_offset(text: &str) -> Option<FixedOffset> {
    let caps = OFFSET.captures(text.trim())?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps[3].parse().ok()?;
    let seconds = hours * 3600 + minutes * 60;
    FixedOffset::east_opt(if &caps[1] == "-" { -seconds } else { seconds })
}

/// A parsed opening-hours component.
#[derive(Debug)]
struct HoursRule {
    opens_at: NaiveTime,
    duration: Duration,
    days: DaySet,
}

#[derive(Debug)]
enum DaySet {
    Every,
    Only(HashSet<Weekday>),
}

impl HoursRule {
    fn parse(component: &OpeningHoursComponent) -> Option<Self> {
        let opens_at = parse_open_time(component.open_time.as_deref()?)?;
        let duration = parse_duration(component.open_duration.as_deref()?)?;
        let days = match component.recurrence.as_deref() {
            Some(recurrence) => parse_by_day(recurrence)?,
            None => DaySet::Every,
        };
        Some(Self {
            opens_at,
            duration,
            days,
        })
    }

    fn applies_on(&self, day: Weekday) -> bool {
        match &self.days {
            DaySet::Every => true,
            DaySet::Only(days) => days.contains(&day),
        }
    }

    /// Checks today's opening and every earlier opening long enough to
    /// still be running, so intervals past midnight are honoured.
    fn covers(&self, local: NaiveDateTime) -> bool {
        let lookback_days = self.duration.num_days() + 1;
        (0..=lookback_days).any(|back| {
            let day = local.date() - Duration::days(back);
            if !self.applies_on(day.weekday()) {
                return false;
            }
            let start = day.and_time(self.opens_at);
            start <= local && local < start + self.duration
        })
    }
}

fn parse_open_time(text: &str) -> Option<NaiveTime> {
    let caps = OPEN_TIME.captures(text.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Parses an ISO-8601 duration such as `"PT10H00M"` or `"P1DT2H"`.
///
/// Anything longer than a week is clamped to a week.
fn parse_duration(text: &str) -> Option<Duration> {
    let caps = DURATION.captures(text.trim())?;
    let part = |i: usize| -> Option<i64> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    let total = Duration::try_days(part(1)?)?
        .checked_add(&Duration::try_hours(part(2)?)?)?
        .checked_add(&Duration::try_minutes(part(3)?)?)?
        .checked_add(&Duration::try_seconds(part(4)?)?)?;
    (total > Duration::zero()).then(|| total.min(Duration::weeks(1)))
}

/// Reads the `BYDAY` list from `"FREQ:DAILY;BYDAY:MO,TU"`.
///
/// A rule without `BYDAY` applies every day; an unrecognised day code makes
/// the whole rule unusable.
fn parse_by_day(recurrence: &str) -> Option<DaySet> {
    let by_day = recurrence.split(';').find_map(|part| {
        let (key, value) = part.split_once([':', '='])?;
        key.trim().eq_ignore_ascii_case("BYDAY").then_some(value)
    });
    let Some(by_day) = by_day else {
        return Some(DaySet::Every);
    };
    by_day
        .split(',')
        .map(|code| weekday(code.trim()))
        .collect::<Option<HashSet<_>>>()
        .map(DaySet::Only)
}

fn weekday(code: &str) -> Option<Weekday> {
    match code.to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
#[path = "hours_test.rs"]
mod tests;
