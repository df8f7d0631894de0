//! Shared data models decoded from directory store records.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;

use crate::schema;
use crate::store::Record;

/// Mapping between a staff code and a LINE user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub record_id: String,
    pub staff_code: String,
    pub user_identifier: String,
    pub registered_at: Option<String>,
}

impl IdentityRecord {
    /// Decode an identity record; both the staff code and user id must be present.
    pub fn from_record(record: &Record) -> Option<Self> {
        let staff_code = record
            .text(schema::identity::STAFF_CODE)
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        let user_identifier = record
            .text(schema::identity::USER_ID)
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        Some(Self {
            record_id: record.id.clone(),
            staff_code: staff_code.to_string(),
            user_identifier: user_identifier.to_string(),
            registered_at: record
                .date_start(schema::identity::REGISTERED_AT)
                .map(String::from),
        })
    }
}

/// A record from the meeting calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingRecord {
    pub record_id: String,
    pub title: String,
    pub category: Option<String>,
    /// Raw ISO-8601 start as stored
    pub scheduled_at: Option<String>,
    pub location: Option<String>,
    /// Attendee display names, in store order
    pub attendees: Vec<String>,
}

impl MeetingRecord {
    pub fn from_record(record: &Record) -> Self {
        Self {
            record_id: record.id.clone(),
            title: record
                .text(schema::meeting::TITLE)
                .unwrap_or_default()
                .to_string(),
            category: record.select(schema::meeting::CATEGORY).map(String::from),
            scheduled_at: record
                .date_start(schema::meeting::SCHEDULED_AT)
                .map(String::from),
            location: record.select(schema::meeting::LOCATION).map(String::from),
            attendees: record
                .people(schema::meeting::ATTENDEES)
                .iter()
                .map(|p| p.name.clone())
                .collect(),
        }
    }

    pub fn is_meeting(&self) -> bool {
        self.category.as_deref() == Some(schema::meeting::MEETING_CATEGORY)
    }
}

/// One line item of a daily meeting report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingSummary {
    pub title: String,
    /// `YYYY/MM/DD HH:MM` in the organizational timezone
    pub formatted_datetime: String,
    pub location: String,
}

/// Monthly send counter as stored on the quota page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub count: u32,
    pub last_sent: Option<NaiveDate>,
}

impl QuotaState {
    pub fn from_record(record: &Record, timezone: FixedOffset) -> Self {
        let count = record
            .number(schema::quota::COUNT)
            .filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| n as u32)
            .unwrap_or(0);
        let last_sent = record
            .date_start(schema::quota::LAST_SENT)
            .and_then(|raw| parse_timestamp(raw, timezone))
            .map(|dt| dt.date_naive());

        Self { count, last_sent }
    }
}

/// Parse a stored date or date-time into the organizational timezone.
///
/// Values carrying an offset are converted; values without one are taken as
/// organizational local time, and a bare date means local midnight.
pub fn parse_timestamp(raw: &str, timezone: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&timezone));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    timezone.from_local_datetime(&naive).single()
}
