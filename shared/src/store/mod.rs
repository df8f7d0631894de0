//! Directory store port.
//!
//! The staff directory, the meeting calendar and the quota counter all live in a
//! hosted document database. Components only see this trait, so the Notion
//! adapter can be swapped for an in-memory double in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::Result;

pub mod notion;

pub use notion::NotionStore;

/// Named, typed fields of one record.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A record returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub properties: Properties,
}

impl Record {
    /// Text of a title or rich-text property, if present.
    pub fn text(&self, property: &str) -> Option<&str> {
        match self.properties.get(property)? {
            PropertyValue::Title(text) | PropertyValue::RichText(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Start of a date property, if set.
    pub fn date_start(&self, property: &str) -> Option<&str> {
        match self.properties.get(property)? {
            PropertyValue::Date(start) => start.as_deref(),
            _ => None,
        }
    }

    /// Selected option name; text properties are accepted too.
    pub fn select(&self, property: &str) -> Option<&str> {
        match self.properties.get(property)? {
            PropertyValue::Select(name) => name.as_deref(),
            PropertyValue::RichText(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, property: &str) -> Option<f64> {
        match self.properties.get(property)? {
            PropertyValue::Number(value) => *value,
            _ => None,
        }
    }

    pub fn people(&self, property: &str) -> &[Person] {
        match self.properties.get(property) {
            Some(PropertyValue::People(people)) => people,
            _ => &[],
        }
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    /// ISO-8601 start of the date, either a date or a date-time.
    Date(Option<String>),
    Select(Option<String>),
    Number(Option<f64>),
    /// Read-only: people can't be written by name.
    People(Vec<Person>),
    Unsupported,
}

/// A person reference on a people property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    pub name: String,
}

/// Which text-like property type a text filter targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Title,
    RichText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCondition {
    Equals(String),
    Contains(String),
    IsNotEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCondition {
    OnOrAfter(NaiveDate),
    OnOrBefore(NaiveDate),
}

/// Filter expression understood by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Text {
        property: String,
        kind: TextKind,
        condition: TextCondition,
    },
    Date {
        property: String,
        condition: DateCondition,
    },
    Select {
        property: String,
        equals: String,
    },
}

impl Filter {
    pub fn title(property: &str, condition: TextCondition) -> Self {
        Filter::Text {
            property: property.to_string(),
            kind: TextKind::Title,
            condition,
        }
    }

    pub fn rich_text(property: &str, condition: TextCondition) -> Self {
        Filter::Text {
            property: property.to_string(),
            kind: TextKind::RichText,
            condition,
        }
    }

    pub fn date(property: &str, condition: DateCondition) -> Self {
        Filter::Date {
            property: property.to_string(),
            condition,
        }
    }

    pub fn select(property: &str, equals: &str) -> Self {
        Filter::Select {
            property: property.to_string(),
            equals: equals.to_string(),
        }
    }

    /// Date range on one property, both ends inclusive.
    pub fn date_between(property: &str, from: NaiveDate, to: NaiveDate) -> Vec<Self> {
        vec![
            Self::date(property, DateCondition::OnOrAfter(from)),
            Self::date(property, DateCondition::OnOrBefore(to)),
        ]
    }
}

/// Client capability over the hosted document database.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Return every record in `collection_id` matching `filter`, in store order.
    async fn query(&self, collection_id: &str, filter: &Filter) -> Result<Vec<Record>>;

    /// Create a record and return its id.
    async fn create(&self, collection_id: &str, properties: Properties) -> Result<String>;

    /// Overwrite the given properties of an existing record.
    async fn update(&self, record_id: &str, properties: Properties) -> Result<()>;

    /// Fetch one record by id.
    async fn retrieve(&self, record_id: &str) -> Result<Record>;
}
