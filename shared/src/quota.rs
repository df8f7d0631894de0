//! Monthly push-message quota.
//!
//! The counter lives on a single store page. Reads and writes are separate
//! calls, so two senders racing between `should_send` and `record_send` can
//! overshoot the ceiling by one each.

use std::future::Future;
use std::sync::Arc;

use chrono::{Datelike, FixedOffset, NaiveDate};
use tracing::{error, info, warn};

use crate::models::QuotaState;
use crate::schema::quota;
use crate::store::{DirectoryStore, Properties, PropertyValue};
use crate::{Result, SharedClock};

/// What happened to a quota-guarded send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDecision {
    Sent,
    /// Delivered, but the counter write failed
    SentUnrecorded,
    QuotaExhausted,
}


/// Gates outbound pushes on a per-calendar-month ceiling.
pub struct QuotaGuard {
    store: Arc<dyn DirectoryStore>,
    record_id: String,
    ceiling: u32,
    clock: SharedClock,
    timezone: FixedOffset,
}

impl QuotaGuard {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        record_id: impl Into<String>,
        ceiling: u32,
        clock: SharedClock,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            store,
            record_id: record_id.into(),
            ceiling,
            clock,
            timezone,
        }
    }

    fn today(&self) -> NaiveDate {
        self.clock.utc().with_timezone(&self.timezone).date_naive()
    }

    /// Current counter state.
    pub async fn state(&self) -> Result<QuotaState> {
        let record = self.store.retrieve(&self.record_id).await?;
        Ok(QuotaState::from_record(&record, self.timezone))
    }

    /// Whether another push is allowed this month.
    ///
    /// A counter last touched in an earlier month is reset first.
    pub async fn should_send(&self) -> Result<bool> {
        let state = self.state().await?;
        let today = self.today();

        let same_month = state
            .last_sent
            .is_some_and(|last| last.year() == today.year() && last.month() == today.month());
        if !same_month {
            info!(previous_count = state.count, "New quota period, resetting counter");
            self.reset().await?;
            return Ok(true);
        }

        Ok(state.count < self.ceiling)
    }

    /// Count one successful push.
    pub async fn record_send(&self) -> Result<()> {
        let state = self.state().await?;
        self.write(state.count.saturating_add(1)).await
    }

    /// Zero the counter and stamp today's date.
    pub async fn reset(&self) -> Result<()> {
        self.write(0).await
    }

    /// Run `send` if the quota allows it, counting it only when it succeeds.
    ///
    /// A delivered message is never reported as an error. If counting it
    /// fails the result is [`SendDecision::SentUnrecorded`].
    pub async fn guarded_send<F, Fut>(&self, send: F) -> Result<SendDecision>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<()>> + Send,
    {
        if !self.should_send().await? {
            warn!(ceiling = self.ceiling, "Monthly message quota exhausted");
            return Ok(SendDecision::QuotaExhausted);
        }

        send().await?;
        match self.record_send().await {
            Ok(()) => Ok(SendDecision::Sent),
            Err(e) => {
                error!(error = %e, "Message sent but quota counter not updated");
                Ok(SendDecision::SentUnrecorded)
            }
        }
    }

    async fn write(&self, count: u32) -> Result<()> {
        let mut properties = Properties::new();
        properties.insert(
            quota::COUNT.to_string(),
            PropertyValue::Number(Some(f64::from(count))),
        );
        properties.insert(
            quota::LAST_SENT.to_string(),
            PropertyValue::Date(Some(self.today().format("%Y-%m-%d").to_string())),
        );
        self.store.update(&self.record_id, properties).await
    }
}
