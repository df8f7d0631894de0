//! LINE Messaging API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::{Config, Error, Result};

/// Outbound text messaging.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Answer an inbound event. Reply tokens are single-use.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;

    /// Send an unsolicited message to a user. Counts against the monthly quota.
    async fn push(&self, to: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    message_type: &'static str,
    text: &'a str,
}

impl<'a> TextMessage<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            message_type: "text",
            text,
        }
    }
}

/// Messenger backed by the LINE Messaging API.
pub struct LineMessagingClient {
    http_client: Client,
    api_base: String,
    access_token: String,
}

impl LineMessagingClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: config.line_api_base.trim_end_matches('/').to_string(),
            access_token: config.line_channel_access_token.clone(),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<()> {
        let url = format!("{}{}", self.api_base, path);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("Failed to call LINE: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("LINE request failed: {} - {}", status, body);
            return Err(Error::Messaging(format!("LINE request failed: {}", status)));
        }

        Ok(())
    }
}

#[async_trait]
impl Messenger for LineMessagingClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let payload = ReplyRequest {
            reply_token,
            messages: [TextMessage::new(text)],
        };
        self.post("/v2/bot/message/reply", &payload).await?;
        info!("Reply message sent");
        Ok(())
    }

    async fn push(&self, to: &str, text: &str) -> Result<()> {
        let payload = PushRequest {
            to,
            messages: [TextMessage::new(text)],
        };
        self.post("/v2/bot/message/push", &payload).await?;
        info!(to, "Push message sent");
        Ok(())
    }
}
