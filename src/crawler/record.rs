//! App records
//!
//! A record is a loosely-typed mapping of field name to JSON value that
//! always carries a string `app_id`. Later partial records for the same id
//! are merged into the existing one, never replacing it wholesale.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Field holding the unique app identifier
pub const APP_ID_FIELD: &str = "app_id";

/// One discovered app
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates a record holding only its id
    pub fn new(app_id: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(APP_ID_FIELD.to_string(), Value::String(app_id.into()));
        Self(map)
    }

    /// Wraps a field map; `None` if it lacks a non-empty string `app_id`
    pub fn from_map(map: Map<String, Value>) -> Option<Self> {
        match map.get(APP_ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style field insertion
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn app_id(&self) -> &str {
        self.0
            .get(APP_ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets a field; `app_id` cannot be rewritten
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        if field == APP_ID_FIELD {
            return;
        }
        self.0.insert(field.to_string(), value.into());
    }

    /// True when the field is present and not null
    pub fn has_field(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges another record for the same app into this one
    ///
    /// Incoming fields overwrite existing ones, except that an incoming
    /// null never clobbers a value already present.
    pub fn merge(&mut self, other: Record) {
        for (field, value) in other.0 {
            if field == APP_ID_FIELD {
                continue;
            }
            if value.is_null() && self.has_field(&field) {
                continue;
            }
            self.0.insert(field, value);
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::deserialize(deserializer)?;
        Record::from_map(map).ok_or_else(|| D::Error::custom("record is missing a string app_id"))
    }
}
