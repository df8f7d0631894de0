//! LINE Webhook Lambda - Handles LINE chat messages.
//!
//! This Lambda receives LINE webhook deliveries through API Gateway, routes
//! each text message to staff code registration or the daily meeting lookup,
//! and answers every message with exactly one reply.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    Config, Dispatcher, LineMessagingClient, MeetingLookupService, Messenger, NotionStore,
    RegistrationResolver, SharedClock,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// LINE webhook delivery
#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

/// LINE webhook event
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    reply_token: Option<String>,
    source: Option<EventSource>,
    message: Option<EventMessage>,
}

/// Event sender
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    #[serde(rename = "type")]
    source_type: String,
    user_id: Option<String>,
}

/// Message content
#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    message_type: String,
    text: Option<String>,
}

/// A text message we can answer.
#[derive(Debug, PartialEq, Eq)]
struct InboundText {
    user_id: String,
    reply_token: String,
    text: String,
}

impl WebhookEvent {
    fn into_inbound_text(self) -> Option<InboundText> {
        if self.event_type != "message" {
            return None;
        }
        let source = self.source.filter(|s| s.source_type == "user")?;
        let message = self.message.filter(|m| m.message_type == "text")?;

        Some(InboundText {
            user_id: source.user_id?,
            reply_token: self.reply_token?,
            text: message.text?,
        })
    }
}

/// API Gateway proxy request (simplified)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGatewayRequest {
    http_method: Option<String>,
    body: Option<String>,
}

/// API Gateway proxy response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGatewayResponse {
    status_code: u16,
    headers: HashMap<String, String>,
    body: String,
    is_base64_encoded: bool,
}

impl ApiGatewayResponse {
    fn text(status_code: u16, body: &str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        Self {
            status_code,
            headers,
            body: body.to_string(),
            is_base64_encoded: false,
        }
    }

    fn into_value(self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Application state
struct AppState {
    dispatcher: Dispatcher,
    messenger: Arc<dyn Messenger>,
}

impl AppState {
    fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let store = Arc::new(NotionStore::new(&config)?);
        let clock: SharedClock = Arc::new(mockable::DefaultClock);

        let dispatcher = Dispatcher::new(
            RegistrationResolver::new(
                store.clone(),
                config.identity_db_id.clone(),
                clock.clone(),
                config.timezone,
            ),
            MeetingLookupService::new(
                store,
                config.meeting_db_id.clone(),
                config.identity_db_id.clone(),
                clock,
                config.timezone,
            ),
        );

        Ok(Self {
            dispatcher,
            messenger: Arc::new(LineMessagingClient::new(&config)?),
        })
    }

    /// Answer one text message.
    async fn handle_text(&self, inbound: &InboundText) -> shared::Result<()> {
        let reply = self
            .dispatcher
            .respond(&inbound.user_id, &inbound.text)
            .await;
        self.messenger.reply(&inbound.reply_token, &reply).await
    }
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (payload, _context) = event.into_parts();
    let request: ApiGatewayRequest = serde_json::from_value(payload)?;

    match request.http_method.as_deref() {
        Some("GET") => {
            return ApiGatewayResponse::text(200, "LINE Webhook Running!").into_value();
        }
        Some("POST") | None => {}
        Some(other) => {
            warn!("Unsupported method {}", other);
            return ApiGatewayResponse::text(405, "Method Not Allowed").into_value();
        }
    }

    let body: WebhookBody = match serde_json::from_str(&request.body.unwrap_or_default()) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to parse webhook body: {}", e);
            return ApiGatewayResponse::text(400, "Invalid request").into_value();
        }
    };

    info!(events = body.events.len(), "Processing LINE webhook");

    for event in body.events {
        let Some(inbound) = event.into_inbound_text() else {
            info!("Ignoring non-text event");
            continue;
        };

        // One event failing must not stop the rest of the delivery.
        if let Err(e) = state.handle_text(&inbound).await {
            error!(user_id = %inbound.user_id, error = %e, "Failed to reply");
        }
    }

    ApiGatewayResponse::text(200, "OK").into_value()
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new()?);

    lambda_runtime::run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
