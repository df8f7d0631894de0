//! Notion-backed directory store.
//!
//! Owns transport details only: filter and property serialisation, cursor
//! pagination, and HTTP error mapping.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use super::{
    DateCondition, DirectoryStore, Filter, Person, Properties, PropertyValue, Record,
    TextCondition, TextKind,
};
use crate::{Config, Error, Result};

const PAGE_SIZE: u32 = 100;

/// Directory store talking to the Notion REST API.
pub struct NotionStore {
    client: Client,
    api_base: String,
    token: String,
    version: String,
}

impl NotionStore {
    /// Build a store using the configured token, API base and request timeout.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.notion_api_base.trim_end_matches('/').to_string(),
            token: config.notion_token.clone(),
            version: config.notion_version.clone(),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        failure: fn(String) -> Error,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", self.version.as_str())
            .send()
            .await
            .map_err(|e| failure(format!("Notion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Notion request rejected");
            if status == StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!("Notion returned {}", status)));
            }
            return Err(failure(format!("Notion returned {}", status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| failure(format!("Invalid Notion response: {}", e)))
    }
}

#[async_trait]
impl DirectoryStore for NotionStore {
    async fn query(&self, collection_id: &str, filter: &Filter) -> Result<Vec<Record>> {
        let url = format!("{}/v1/databases/{}/query", self.api_base, collection_id);
        let filter = filter_json(filter);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "filter": filter, "page_size": PAGE_SIZE });
            if let Some(start) = &cursor {
                body["start_cursor"] = json!(start);
            }

            let page: QueryResponse = self
                .execute(self.client.post(&url).json(&body), Error::StoreQuery)
                .await?;
            records.extend(page.results.into_iter().map(PageDto::into_record));

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        debug!(collection_id, count = records.len(), "Notion query complete");
        Ok(records)
    }

    async fn create(&self, collection_id: &str, properties: Properties) -> Result<String> {
        let body = json!({
            "parent": { "database_id": collection_id },
            "properties": properties_json(&properties).map_err(to_write_error)?,
        });

        let page: PageDto = self
            .execute(
                self.client
                    .post(format!("{}/v1/pages", self.api_base))
                    .json(&body),
                Error::StoreWrite,
            )
            .await?;
        Ok(page.id)
    }

    async fn update(&self, record_id: &str, properties: Properties) -> Result<()> {
        let body = json!({ "properties": properties_json(&properties).map_err(to_write_error)? });

        let _: PageDto = self
            .execute(
                self.client
                    .patch(format!("{}/v1/pages/{}", self.api_base, record_id))
                    .json(&body),
                Error::StoreWrite,
            )
            .await?;
        Ok(())
    }

    async fn retrieve(&self, record_id: &str) -> Result<Record> {
        let page: PageDto = self
            .execute(
                self.client
                    .get(format!("{}/v1/pages/{}", self.api_base, record_id)),
                Error::StoreQuery,
            )
            .await?;
        Ok(page.into_record())
    }
}

fn to_write_error(e: Error) -> Error {
    Error::StoreWrite(e.to_string())
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<PageDto>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageDto {
    id: String,
    #[serde(default)]
    properties: BTreeMap<String, PropertyDto>,
}

impl PageDto {
    fn into_record(self) -> Record {
        Record {
            id: self.id,
            properties: self
                .properties
                .into_iter()
                .map(|(name, property)| (name, property.into_value()))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PropertyDto {
    Title {
        #[serde(default)]
        title: Vec<RichTextDto>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichTextDto>,
    },
    Date {
        #[serde(default)]
        date: Option<DateDto>,
    },
    Select {
        #[serde(default)]
        select: Option<SelectDto>,
    },
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    People {
        #[serde(default)]
        people: Vec<PersonDto>,
    },
    #[serde(other)]
    Unsupported,
}

impl PropertyDto {
    fn into_value(self) -> PropertyValue {
        match self {
            PropertyDto::Title { title } => PropertyValue::Title(plain_text(&title)),
            PropertyDto::RichText { rich_text } => PropertyValue::RichText(plain_text(&rich_text)),
            PropertyDto::Date { date } => PropertyValue::Date(date.map(|d| d.start)),
            PropertyDto::Select { select } => PropertyValue::Select(select.map(|s| s.name)),
            PropertyDto::Number { number } => PropertyValue::Number(number),
            PropertyDto::People { people } => PropertyValue::People(
                people
                    .into_iter()
                    .map(|p| Person {
                        id: p.id,
                        name: p.name.unwrap_or_default(),
                    })
                    .collect(),
            ),
            PropertyDto::Unsupported => PropertyValue::Unsupported,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RichTextDto {
    #[serde(default)]
    plain_text: String,
}

#[derive(Debug, Deserialize)]
struct DateDto {
    start: String,
}

#[derive(Debug, Deserialize)]
struct SelectDto {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PersonDto {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: Option<String>,
}

fn plain_text(segments: &[RichTextDto]) -> String {
    segments.iter().map(|s| s.plain_text.as_str()).collect()
}

/// Translate a filter into Notion's filter object.
fn filter_json(filter: &Filter) -> Value {
    match filter {
        Filter::And(filters) => json!({ "and": filters.iter().map(filter_json).collect::<Vec<_>>() }),
        Filter::Text {
            property,
            kind,
            condition,
        } => {
            let key = match kind {
                TextKind::Title => "title",
                TextKind::RichText => "rich_text",
            };
            let condition = match condition {
                TextCondition::Equals(value) => json!({ "equals": value }),
                TextCondition::Contains(value) => json!({ "contains": value }),
                TextCondition::IsNotEmpty => json!({ "is_not_empty": true }),
            };
            json!({ "property": property, key: condition })
        }
        Filter::Date {
            property,
            condition,
        } => {
            let condition = match condition {
                DateCondition::OnOrAfter(date) => json!({ "on_or_after": date.to_string() }),
                DateCondition::OnOrBefore(date) => json!({ "on_or_before": date.to_string() }),
            };
            json!({ "property": property, "date": condition })
        }
        Filter::Select { property, equals } => {
            json!({ "property": property, "select": { "equals": equals } })
        }
    }
}

/// Translate properties into Notion's page property values.
fn properties_json(properties: &Properties) -> Result<Value> {
    let mut out = Map::new();
    for (name, value) in properties {
        let value = match value {
            PropertyValue::Title(text) => json!({ "title": [{ "text": { "content": text } }] }),
            PropertyValue::RichText(text) => {
                json!({ "rich_text": [{ "text": { "content": text } }] })
            }
            PropertyValue::Date(Some(start)) => json!({ "date": { "start": start } }),
            PropertyValue::Date(None) => json!({ "date": null }),
            PropertyValue::Select(Some(option)) => json!({ "select": { "name": option } }),
            PropertyValue::Select(None) => json!({ "select": null }),
            PropertyValue::Number(number) => json!({ "number": number }),
            PropertyValue::People(_) | PropertyValue::Unsupported => {
                return Err(Error::Validation(format!(
                    "property '{}' cannot be written",
                    name
                )))
            }
        };
        out.insert(name.clone(), value);
    }
    Ok(Value::Object(out))
}
