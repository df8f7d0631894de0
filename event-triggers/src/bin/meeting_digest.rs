//! Meeting Digest Lambda - Pushes today's meetings to registered staff.
//!
//! This Lambda runs each morning via EventBridge and:
//! 1. Scans the staff code directory
//! 2. Looks up each staff member's meetings for today
//! 3. Pushes a report over LINE to those who have any, within the monthly quota

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Deserialize;
use shared::{
    Config, DigestSummary, LineMessagingClient, MeetingDigest, MeetingLookupService, NotionStore,
    QuotaGuard, SharedClock,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct ScheduledEvent {
    #[serde(default, rename = "detail-type")]
    detail_type: String,
}

struct AppState {
    digest: MeetingDigest,
}

impl AppState {
    fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let store = Arc::new(NotionStore::new(&config)?);
        let clock: SharedClock = Arc::new(mockable::DefaultClock);

        let meetings = MeetingLookupService::new(
            store.clone(),
            config.meeting_db_id.clone(),
            config.identity_db_id.clone(),
            clock.clone(),
            config.timezone,
        );
        let quota = QuotaGuard::new(
            store,
            config.quota_page_id.clone(),
            config.monthly_quota,
            clock,
            config.timezone,
        );

        Ok(Self {
            digest: MeetingDigest::new(
                meetings,
                quota,
                Arc::new(LineMessagingClient::new(&config)?),
            ),
        })
    }
}

async fn handler(
    state: Arc<AppState>,
    event: LambdaEvent<ScheduledEvent>,
) -> Result<DigestSummary, Error> {
    info!(detail_type = %event.payload.detail_type, "Starting meeting digest");
    Ok(state.digest.run().await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new()?);

    run(service_fn(move |event| {
        let state = state.clone();
        async move { handler(state, event).await }
    }))
    .await
}
