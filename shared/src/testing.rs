//! In-memory doubles for the directory store, LINE and the clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use mockable::Clock;

use crate::messaging::Messenger;
use crate::schema;
use crate::store::{
    DateCondition, DirectoryStore, Filter, Person, Properties, PropertyValue, Record,
    TextCondition,
};
use crate::{Error, Result};

pub fn taipei() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

/// Clock pinned to a settable instant.
pub struct FixtureClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixtureClock {
    pub fn set(&self, rfc3339: &str) {
        *self.now.lock().unwrap() = parse_utc(rfc3339);
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn fixed_clock(rfc3339: &str) -> Arc<FixtureClock> {
    Arc::new(FixtureClock {
        now: Mutex::new(parse_utc(rfc3339)),
    })
}

fn parse_utc(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

/// Directory store holding records in memory and evaluating filters locally.
///
/// Date filters compare the calendar date written in the stored value, the
/// way the hosted store does, without converting to the organizational zone.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Record>>>,
    pages: Mutex<Vec<Record>>,
    calls: AtomicUsize,
    next_id: AtomicUsize,
    failing_queries: AtomicBool,
    failing_writes: AtomicBool,
}

impl MemoryStore {
    pub fn insert(&self, collection_id: &str, record: Record) {
        self.collections
            .lock()
            .unwrap()
            .entry(collection_id.to_string())
            .or_default()
            .push(record);
    }

    /// Add a record that lives outside any collection.
    pub fn insert_page(&self, record: Record) {
        self.pages.lock().unwrap().push(record);
    }

    pub fn records(&self, collection_id: &str) -> Vec<Record> {
        self.collections
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of store operations attempted.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_queries(&self, fail: bool) {
        self.failing_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.failing_writes.store(fail, Ordering::SeqCst);
    }

    fn with_record<T>(&self, record_id: &str, f: impl FnOnce(&mut Record) -> T) -> Option<T> {
        let mut collections = self.collections.lock().unwrap();
        if let Some(record) = collections
            .values_mut()
            .flat_map(|records| records.iter_mut())
            .find(|r| r.id == record_id)
        {
            return Some(f(record));
        }
        drop(collections);

        let mut pages = self.pages.lock().unwrap();
        pages.iter_mut().find(|r| r.id == record_id).map(f)
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn query(&self, collection_id: &str, filter: &Filter) -> Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.load(Ordering::SeqCst) {
            return Err(Error::StoreQuery("connection reset".to_string()));
        }
        Ok(self
            .records(collection_id)
            .into_iter()
            .filter(|r| matches(filter, r))
            .collect())
    }

    async fn create(&self, collection_id: &str, properties: Properties) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(Error::StoreWrite("connection reset".to_string()));
        }
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.insert(
            collection_id,
            Record {
                id: id.clone(),
                properties,
            },
        );
        Ok(id)
    }

    async fn update(&self, record_id: &str, properties: Properties) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(Error::StoreWrite("connection reset".to_string()));
        }
        self.with_record(record_id, |record| record.properties.extend(properties))
            .ok_or_else(|| Error::NotFound(record_id.to_string()))
    }

    async fn retrieve(&self, record_id: &str) -> Result<Record> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.load(Ordering::SeqCst) {
            return Err(Error::StoreQuery("connection reset".to_string()));
        }
        self.with_record(record_id, |record| record.clone())
            .ok_or_else(|| Error::NotFound(record_id.to_string()))
    }
}

fn matches(filter: &Filter, record: &Record) -> bool {
    match filter {
        Filter::And(filters) => filters.iter().all(|f| matches(f, record)),
        Filter::Text {
            property,
            condition,
            ..
        } => {
            let value = record.text(property).unwrap_or_default();
            match condition {
                TextCondition::Equals(expected) => value == expected.as_str(),
                TextCondition::Contains(needle) => value.contains(needle.as_str()),
                TextCondition::IsNotEmpty => !value.is_empty(),
            }
        }
        Filter::Date {
            property,
            condition,
        } => {
            let Some(date) = record
                .date_start(property)
                .and_then(|raw| raw.get(..10))
                .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
            else {
                return false;
            };
            match condition {
                DateCondition::OnOrAfter(bound) => date >= *bound,
                DateCondition::OnOrBefore(bound) => date <= *bound,
            }
        }
        Filter::Select { property, equals } => record.select(property) == Some(equals.as_str()),
    }
}

pub fn identity_record(id: &str, staff_code: &str, user_identifier: &str) -> Record {
    let mut properties = Properties::new();
    properties.insert(
        schema::identity::STAFF_CODE.to_string(),
        PropertyValue::Title(staff_code.to_string()),
    );
    properties.insert(
        schema::identity::USER_ID.to_string(),
        PropertyValue::RichText(user_identifier.to_string()),
    );
    Record {
        id: id.to_string(),
        properties,
    }
}

pub fn meeting_record(
    id: &str,
    title: &str,
    category: &str,
    scheduled_at: &str,
    location: Option<&str>,
    attendees: &[&str],
) -> Record {
    let mut properties = Properties::new();
    properties.insert(
        schema::meeting::TITLE.to_string(),
        PropertyValue::Title(title.to_string()),
    );
    properties.insert(
        schema::meeting::CATEGORY.to_string(),
        PropertyValue::Select(Some(category.to_string())),
    );
    properties.insert(
        schema::meeting::SCHEDULED_AT.to_string(),
        PropertyValue::Date(Some(scheduled_at.to_string())),
    );
    properties.insert(
        schema::meeting::LOCATION.to_string(),
        PropertyValue::Select(location.map(String::from)),
    );
    properties.insert(
        schema::meeting::ATTENDEES.to_string(),
        PropertyValue::People(
            attendees
                .iter()
                .enumerate()
                .map(|(idx, name)| Person {
                    id: format!("{}-p{}", id, idx),
                    name: name.to_string(),
                })
                .collect(),
        ),
    );
    Record {
        id: id.to_string(),
        properties,
    }
}

pub fn quota_record(id: &str, count: u32, last_sent: Option<&str>) -> Record {
    let mut properties = Properties::new();
    properties.insert(
        schema::quota::COUNT.to_string(),
        PropertyValue::Number(Some(f64::from(count))),
    );
    properties.insert(
        schema::quota::LAST_SENT.to_string(),
        PropertyValue::Date(last_sent.map(String::from)),
    );
    Record {
        id: id.to_string(),
        properties,
    }
}

/// A message captured by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply { token: String, text: String },
    Push { to: String, text: String },
}

/// Messenger that records every call.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Messaging("LINE request failed: 500".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Reply {
            token: reply_token.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn push(&self, to: &str, text: &str) -> Result<()> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Push {
            to: to.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}
