//! Configuration management for Lambda functions.

use std::time::Duration;

use chrono::FixedOffset;
use mockable::{DefaultEnv, Env};

use crate::{Error, Result};

const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com";
const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";
const DEFAULT_MONTHLY_QUOTA: u32 = 180;
/// Asia/Taipei, which has not observed DST since 1979.
const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Notion integration token
    pub notion_token: String,
    /// Notion API base URL
    pub notion_api_base: String,
    /// Notion-Version header value
    pub notion_version: String,
    /// Database holding meeting records
    pub meeting_db_id: String,
    /// Database holding staff code registrations
    pub identity_db_id: String,
    /// Singleton page holding the monthly send counter
    pub quota_page_id: String,
    /// LINE channel access token
    pub line_channel_access_token: String,
    /// LINE API base URL
    pub line_api_base: String,
    /// Maximum push notifications per calendar month
    pub monthly_quota: u32,
    /// Organizational timezone used for every "today" comparison
    pub timezone: FixedOffset,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&DefaultEnv::new())
    }

    /// Load configuration from any environment source.
    pub fn from_source(env: &impl Env) -> Result<Self> {
        let offset_hours = parse_or(env, "ORG_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        let timezone = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!("ORG_UTC_OFFSET_HOURS out of range: {}", offset_hours))
        })?;

        Ok(Self {
            notion_token: required(env, "NOTION_TOKEN")?,
            notion_api_base: env
                .string("NOTION_API_BASE")
                .unwrap_or_else(|| DEFAULT_NOTION_API_BASE.to_string()),
            notion_version: env
                .string("NOTION_VERSION")
                .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            meeting_db_id: required(env, "MEETING_DB_ID")?,
            identity_db_id: required(env, "USERID_DB_ID")?,
            quota_page_id: required(env, "QUOTA_PAGE_ID")?,
            line_channel_access_token: required(env, "LINE_CHANNEL_ACCESS_TOKEN")?,
            line_api_base: env
                .string("LINE_API_BASE")
                .unwrap_or_else(|| DEFAULT_LINE_API_BASE.to_string()),
            monthly_quota: parse_or(env, "MONTHLY_MESSAGE_QUOTA", DEFAULT_MONTHLY_QUOTA)?,
            timezone,
            http_timeout: Duration::from_secs(parse_or(
                env,
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        })
    }
}

fn required(env: &impl Env, key: &str) -> Result<String> {
    env.string(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{} not set", key)))
}

fn parse_or<T: std::str::FromStr>(env: &impl Env, key: &str, default: T) -> Result<T> {
    match env.string(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid value: {}", key, raw))),
        None => Ok(default),
    }
}
