//! Daily meeting lookup and report formatting.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{parse_timestamp, IdentityRecord, MeetingRecord, MeetingSummary};
use crate::schema::{identity, meeting};
use crate::store::{DirectoryStore, Filter, TextCondition};
use crate::{replies, Error, Result, SharedClock};

const DISPLAY_DATE: &str = "%Y/%m/%d";
const DISPLAY_DATETIME: &str = "%Y/%m/%d %H:%M";

/// Errors returned by [`MeetingLookupService::meetings_today`].
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("user is not registered")]
    NotRegistered,

    #[error("meeting lookup failed: {0}")]
    LookupFailed(#[source] Error),
}

impl LookupError {
    pub fn reply_text(&self) -> &'static str {
        match self {
            LookupError::NotRegistered => replies::NOT_REGISTERED,
            LookupError::LookupFailed(_) => replies::MEETING_LOOKUP_FAILED,
        }
    }
}

/// Decides whether an attendee entry refers to a staff member.
pub trait AttendeeMatcher: Send + Sync {
    fn matches(&self, staff_code: &str, attendee_name: &str) -> bool;
}

/// Attendee display name contains the staff code anywhere.
///
/// Short codes can match unrelated names ("1" matches "A10 陳").
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringMatcher;

impl AttendeeMatcher for SubstringMatcher {
    fn matches(&self, staff_code: &str, attendee_name: &str) -> bool {
        attendee_name.contains(staff_code)
    }
}

/// Resolves a user's staff code and builds their meeting list for today.
pub struct MeetingLookupService {
    store: Arc<dyn DirectoryStore>,
    meeting_collection: String,
    identity_collection: String,
    clock: SharedClock,
    timezone: FixedOffset,
    matcher: Arc<dyn AttendeeMatcher>,
}

impl MeetingLookupService {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        meeting_collection: impl Into<String>,
        identity_collection: impl Into<String>,
        clock: SharedClock,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            store,
            meeting_collection: meeting_collection.into(),
            identity_collection: identity_collection.into(),
            clock,
            timezone,
            matcher: Arc::new(SubstringMatcher),
        }
    }

    /// Replace the attendee matching rule.
    pub fn with_matcher(mut self, matcher: Arc<dyn AttendeeMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Today's calendar date in the organizational timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock.utc().with_timezone(&self.timezone).date_naive()
    }

    /// Every complete identity record, in store order.
    pub async fn identities(&self) -> Result<Vec<IdentityRecord>> {
        let filter = Filter::title(identity::STAFF_CODE, TextCondition::IsNotEmpty);
        let records = self
            .store
            .query(&self.identity_collection, &filter)
            .await?;
        Ok(records.iter().filter_map(IdentityRecord::from_record).collect())
    }

    /// Find the staff code registered for `user_identifier`.
    ///
    /// There is no reverse index, so this scans the whole identity database.
    pub async fn resolve_staff_code(
        &self,
        user_identifier: &str,
    ) -> std::result::Result<String, LookupError> {
        let identities = self.identities().await.map_err(LookupError::LookupFailed)?;

        let mut by_user: HashMap<String, String> = HashMap::with_capacity(identities.len());
        for record in identities {
            by_user
                .entry(record.user_identifier)
                .or_insert(record.staff_code);
        }

        by_user
            .remove(user_identifier)
            .ok_or(LookupError::NotRegistered)
    }

    /// Every meeting scheduled on today's local calendar day.
    ///
    /// The store compares dates on its own day boundaries, so the query
    /// window spans a day either side and the local day is checked here.
    pub async fn todays_meetings(&self) -> Result<Vec<ScheduledMeeting>> {
        let today = self.today();
        let from = today.pred_opt().unwrap_or(today);
        let to = today.succ_opt().unwrap_or(today);
        let mut conditions = Filter::date_between(meeting::SCHEDULED_AT, from, to);
        conditions.push(Filter::select(meeting::CATEGORY, meeting::MEETING_CATEGORY));

        let records = self
            .store
            .query(&self.meeting_collection, &Filter::And(conditions))
            .await?;

        let mut meetings = Vec::new();
        for record in &records {
            let candidate = MeetingRecord::from_record(record);
            if !candidate.is_meeting() {
                continue;
            }
            let Some(raw) = candidate.scheduled_at.as_deref() else {
                warn!(record_id = %candidate.record_id, "Meeting has no date");
                continue;
            };
            let Some(scheduled) = parse_timestamp(raw, self.timezone) else {
                warn!(record_id = %candidate.record_id, raw, "Unparseable meeting date");
                continue;
            };
            if scheduled.date_naive() != today {
                continue;
            }
            meetings.push(ScheduledMeeting {
                record: candidate,
                scheduled,
            });
        }

        info!(
            candidates = records.len(),
            today = meetings.len(),
            "Loaded today's meetings"
        );
        Ok(meetings)
    }

    /// The subset of `meetings` that lists `staff_code` among its attendees.
    pub fn summaries_for(
        &self,
        staff_code: &str,
        meetings: &[ScheduledMeeting],
    ) -> Vec<MeetingSummary> {
        meetings
            .iter()
            .filter(|m| {
                m.record
                    .attendees
                    .iter()
                    .any(|name| self.matcher.matches(staff_code, name))
            })
            .map(ScheduledMeeting::summary)
            .collect()
    }

    /// Meetings today that list `staff_code` among their attendees.
    pub async fn meetings_for_staff(&self, staff_code: &str) -> Result<Vec<MeetingSummary>> {
        let meetings = self.todays_meetings().await?;
        let summaries = self.summaries_for(staff_code, &meetings);
        info!(staff_code, matched = summaries.len(), "Meeting lookup complete");
        Ok(summaries)
    }

    /// Meetings today for the staff member registered to `user_identifier`.
    pub async fn meetings_today(
        &self,
        user_identifier: &str,
    ) -> std::result::Result<Vec<MeetingSummary>, LookupError> {
        let staff_code = self.resolve_staff_code(user_identifier).await?;
        self.meetings_for_staff(&staff_code)
            .await
            .map_err(LookupError::LookupFailed)
    }

    /// Formatted daily report for `user_identifier`.
    pub async fn daily_report(
        &self,
        user_identifier: &str,
    ) -> std::result::Result<String, LookupError> {
        let meetings = self.meetings_today(user_identifier).await?;
        Ok(format_report(self.today(), &meetings))
    }
}

/// A meeting whose start falls on today's local date.
#[derive(Debug, Clone)]
pub struct ScheduledMeeting {
    pub record: MeetingRecord,
    pub scheduled: DateTime<FixedOffset>,
}

impl ScheduledMeeting {
    fn summary(&self) -> MeetingSummary {
        MeetingSummary {
            title: non_blank(&self.record.title)
                .unwrap_or(replies::UNTITLED_MEETING)
                .to_string(),
            formatted_datetime: self.scheduled.format(DISPLAY_DATETIME).to_string(),
            location: self
                .record
                .location
                .as_deref()
                .and_then(non_blank)
                .unwrap_or(replies::LOCATION_NOT_SPECIFIED)
                .to_string(),
        }
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Render the daily report text.
pub fn format_report(today: NaiveDate, meetings: &[MeetingSummary]) -> String {
    let today_display = today.format(DISPLAY_DATE).to_string();
    if meetings.is_empty() {
        return replies::no_meetings(&today_display);
    }

    let mut lines = vec![replies::report_header(&today_display)];
    for (idx, m) in meetings.iter().enumerate() {
        lines.push(format!("{}. {}", idx + 1, m.title));
        lines.push(format!("－ 時間：{}", m.formatted_datetime));
        lines.push(format!("－ 地點：{}", m.location));
        lines.push(String::new());
    }
    lines.join("\n").trim().to_string()
}
