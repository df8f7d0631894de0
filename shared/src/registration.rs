//! Staff code registration.
//!
//! Binds a LINE user id to a staff code in the identity database. The store
//! offers no conditional writes, so uniqueness is only checked before the
//! write: two concurrent registrations for the same code or user can both pass
//! the checks and both be written.

use std::sync::Arc;

use chrono::{FixedOffset, SecondsFormat};
use tracing::{error, info};

use crate::replies;
use crate::schema::identity;
use crate::store::{DirectoryStore, Filter, Properties, PropertyValue, TextCondition};
use crate::SharedClock;

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new identity record was written
    Registered { staff_code: String },
    /// This user already has a staff code; nothing was written
    AlreadyRegistered,
    /// Another user already claimed the code
    CodeTaken,
    /// Blank staff code
    InvalidFormat,
    LookupFailed,
    WriteFailed,
}

impl RegistrationOutcome {
    pub fn reply_text(&self) -> String {
        match self {
            RegistrationOutcome::Registered { staff_code } => replies::registered(staff_code),
            RegistrationOutcome::AlreadyRegistered => replies::ALREADY_REGISTERED.to_string(),
            RegistrationOutcome::CodeTaken => replies::CODE_TAKEN.to_string(),
            RegistrationOutcome::InvalidFormat => replies::BIND_INSTRUCTIONS.to_string(),
            RegistrationOutcome::LookupFailed => replies::REGISTRATION_LOOKUP_FAILED.to_string(),
            RegistrationOutcome::WriteFailed => replies::REGISTRATION_WRITE_FAILED.to_string(),
        }
    }
}

/// Validates and persists staff code to user id mappings.
pub struct RegistrationResolver {
    store: Arc<dyn DirectoryStore>,
    collection_id: String,
    clock: SharedClock,
    timezone: FixedOffset,
}

impl RegistrationResolver {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        collection_id: impl Into<String>,
        clock: SharedClock,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            store,
            collection_id: collection_id.into(),
            clock,
            timezone,
        }
    }

    /// Register `staff_code` for `user_identifier`.
    ///
    /// Checks the user first, then the code, then writes. Store failures are
    /// reported as outcomes and never retried.
    pub async fn register(&self, staff_code: &str, user_identifier: &str) -> RegistrationOutcome {
        let staff_code = staff_code.trim();
        if staff_code.is_empty() {
            return RegistrationOutcome::InvalidFormat;
        }

        let by_user = Filter::rich_text(
            identity::USER_ID,
            TextCondition::Equals(user_identifier.to_string()),
        );
        match self.store.query(&self.collection_id, &by_user).await {
            Ok(records) if !records.is_empty() => {
                info!(user_id = %user_identifier, "User already registered");
                return RegistrationOutcome::AlreadyRegistered;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Failed to look up user id");
                return RegistrationOutcome::LookupFailed;
            }
        }

        let by_code = Filter::title(
            identity::STAFF_CODE,
            TextCondition::Equals(staff_code.to_string()),
        );
        match self.store.query(&self.collection_id, &by_code).await {
            Ok(records) if !records.is_empty() => {
                info!(staff_code, "Staff code already claimed");
                return RegistrationOutcome::CodeTaken;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Failed to look up staff code");
                return RegistrationOutcome::LookupFailed;
            }
        }

        let registered_at = self
            .clock
            .utc()
            .with_timezone(&self.timezone)
            .to_rfc3339_opts(SecondsFormat::Secs, false);

        let mut properties = Properties::new();
        properties.insert(
            identity::STAFF_CODE.to_string(),
            PropertyValue::Title(staff_code.to_string()),
        );
        properties.insert(
            identity::USER_ID.to_string(),
            PropertyValue::RichText(user_identifier.to_string()),
        );
        properties.insert(
            identity::REGISTERED_AT.to_string(),
            PropertyValue::Date(Some(registered_at)),
        );

        match self.store.create(&self.collection_id, properties).await {
            Ok(record_id) => {
                info!(
                    user_id = %user_identifier,
                    staff_code,
                    record_id = %record_id,
                    "Staff code registered"
                );
                RegistrationOutcome::Registered {
                    staff_code: staff_code.to_string(),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to write identity record");
                RegistrationOutcome::WriteFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed_clock, identity_record, taipei, MemoryStore};

    const IDENTITIES: &str = "identities";

    fn resolver(store: &Arc<MemoryStore>) -> RegistrationResolver {
        RegistrationResolver::new(
            store.clone(),
            IDENTITIES,
            fixed_clock("2024-05-01T02:00:00Z"),
            taipei(),
        )
    }

    #[tokio::test]
    async fn test_register_then_already_registered() {
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(&store);

        assert_eq!(
            resolver.register("A123", "U1").await,
            RegistrationOutcome::Registered {
                staff_code: "A123".to_string()
            }
        );
        assert_eq!(
            resolver.register("A123", "U1").await,
            RegistrationOutcome::AlreadyRegistered
        );
        assert_eq!(store.records(IDENTITIES).len(), 1);
    }

    #[tokio::test]
    async fn test_same_code_other_user_is_taken() {
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(&store);

        assert!(matches!(
            resolver.register("A123", "U1").await,
            RegistrationOutcome::Registered { .. }
        ));
        assert_eq!(
            resolver.register("A123", "U2").await,
            RegistrationOutcome::CodeTaken
        );
        assert_eq!(store.records(IDENTITIES).len(), 1);
    }

    #[tokio::test]
    async fn test_user_check_precedes_code_check() {
        let store = Arc::new(MemoryStore::default());
        store.insert(IDENTITIES, identity_record("r1", "B456", "U1"));
        store.insert(IDENTITIES, identity_record("r2", "A123", "U2"));

        assert_eq!(
            resolver(&store).register("A123", "U1").await,
            RegistrationOutcome::AlreadyRegistered
        );
    }

    #[tokio::test]
    async fn test_written_record_fields() {
        let store = Arc::new(MemoryStore::default());
        resolver(&store).register("  A123 ", "U1").await;

        let records = store.records(IDENTITIES);
        assert_eq!(records[0].text(identity::STAFF_CODE), Some("A123"));
        assert_eq!(records[0].text(identity::USER_ID), Some("U1"));
        assert_eq!(
            records[0].date_start(identity::REGISTERED_AT),
            Some("2024-05-01T10:00:00+08:00")
        );
    }

    #[tokio::test]
    async fn test_blank_code_is_invalid_without_store_calls() {
        let store = Arc::new(MemoryStore::default());
        assert_eq!(
            resolver(&store).register("   ", "U1").await,
            RegistrationOutcome::InvalidFormat
        );
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failures_map_to_outcomes() {
        let store = Arc::new(MemoryStore::default());
        store.fail_queries(true);
        assert_eq!(
            resolver(&store).register("A123", "U1").await,
            RegistrationOutcome::LookupFailed
        );

        store.fail_queries(false);
        store.fail_writes(true);
        assert_eq!(
            resolver(&store).register("A123", "U1").await,
            RegistrationOutcome::WriteFailed
        );
        assert!(store.records(IDENTITIES).is_empty());
    }

    #[test]
    fn test_reply_texts() {
        let outcome = RegistrationOutcome::Registered {
            staff_code: "A123".to_string(),
        };
        assert_eq!(outcome.reply_text(), "✅ 已成功登記員編：A123");
        assert_eq!(
            RegistrationOutcome::CodeTaken.reply_text(),
            replies::CODE_TAKEN
        );
    }
}
