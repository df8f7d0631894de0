//! Shared library for the staff meeting relay Lambda functions.
//!
//! This crate provides the staff code registration flow, the daily meeting
//! lookup, the monthly push quota, and the clients they talk through.

use std::sync::Arc;

pub mod config;
pub mod digest;
pub mod dispatch;
pub mod error;
pub mod meetings;
pub mod messaging;
pub mod models;
pub mod quota;
pub mod registration;
pub mod replies;
pub mod schema;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use digest::{DigestSummary, MeetingDigest};
pub use dispatch::{Command, Dispatcher};
pub use error::{Error, Result};
pub use meetings::{
    format_report, AttendeeMatcher, LookupError, MeetingLookupService, ScheduledMeeting,
    SubstringMatcher,
};
pub use messaging::{LineMessagingClient, Messenger};
pub use models::{IdentityRecord, MeetingRecord, MeetingSummary, QuotaState};
pub use quota::{QuotaGuard, SendDecision};
pub use registration::{RegistrationOutcome, RegistrationResolver};
pub use store::{DirectoryStore, NotionStore};

/// Clock shared by every component that needs "now".
pub type SharedClock = Arc<dyn mockable::Clock + Send + Sync>;
