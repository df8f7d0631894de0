//! Scheduled push of each registered staff member's meetings for the day.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::meetings::{format_report, MeetingLookupService};
use crate::messaging::Messenger;
use crate::quota::{QuotaGuard, SendDecision};
use crate::Result;

/// Counters reported at the end of a digest run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DigestSummary {
    pub users_scanned: u32,
    pub notifications_sent: u32,
    /// Users with meetings who were not notified because the quota ran out
    pub skipped_quota: u32,
    pub errors: u32,
}

/// Pushes daily meeting reports, gated by the monthly quota.
pub struct MeetingDigest {
    meetings: MeetingLookupService,
    quota: QuotaGuard,
    messenger: Arc<dyn Messenger>,
}

impl MeetingDigest {
    pub fn new(
        meetings: MeetingLookupService,
        quota: QuotaGuard,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            meetings,
            quota,
            messenger,
        }
    }

    /// Notify every registered user who has meetings today.
    ///
    /// Today's meetings are read once and matched per user in memory. Fails
    /// only when the identity directory or the meeting calendar can't be
    /// read; per-user send failures are logged and counted.
    pub async fn run(&self) -> Result<DigestSummary> {
        let identities = self.meetings.identities().await?;
        let todays_meetings = self.meetings.todays_meetings().await?;
        let today = self.meetings.today();
        let mut summary = DigestSummary::default();
        let mut quota_exhausted = false;

        for identity in identities {
            summary.users_scanned += 1;

            let meetings = self
                .meetings
                .summaries_for(&identity.staff_code, &todays_meetings);
            if meetings.is_empty() {
                continue;
            }

            if quota_exhausted {
                summary.skipped_quota += 1;
                continue;
            }

            let report = format_report(today, &meetings);
            let user_id = identity.user_identifier.as_str();
            let messenger = &self.messenger;
            let decision = self
                .quota
                .guarded_send(|| async move { messenger.push(user_id, &report).await })
                .await;

            match decision {
                Ok(SendDecision::QuotaExhausted) => {
                    warn!("Quota exhausted, skipping remaining digests");
                    quota_exhausted = true;
                    summary.skipped_quota += 1;
                }
                Ok(sent) => {
                    if sent == SendDecision::SentUnrecorded {
                        warn!(staff_code = %identity.staff_code, "Digest sent but not counted");
                    }
                    info!(staff_code = %identity.staff_code, meetings = meetings.len(), "Digest sent");
                    summary.notifications_sent += 1;
                }
                Err(e) => {
                    error!(staff_code = %identity.staff_code, error = %e, "Failed to send digest");
                    summary.errors += 1;
                }
            }
        }

        info!(
            scanned = summary.users_scanned,
            sent = summary.notifications_sent,
            skipped = summary.skipped_quota,
            errors = summary.errors,
            "Meeting digest complete"
        );
        Ok(summary)
    }
}
