//! Item store contract: due-item queries and priority write-back.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::properties::{self, DATE_FORMAT, KEY_A, KEY_B, KEY_DUE, KEY_SAMPLE, Properties};

/// An item as the store holds it: identity, raw properties, reference tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredItemRecord {
    pub id: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub refs: Vec<String>,
}

impl StoredItemRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set a raw property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Add a reference tag.
    pub fn with_ref(mut self, tag: impl Into<String>) -> Self {
        self.refs.push(tag.into());
        self
    }

    /// Stored due date, if present and parsable.
    pub fn due(&self) -> Option<NaiveDate> {
        properties::date(&self.properties, KEY_DUE)
    }

    /// Merge an update into the raw properties.
    ///
    /// Camel-case aliases of the written keys are dropped so the dashed value
    /// is the one read back.
    pub fn apply(&mut self, update: &PriorityUpdate) {
        for (key, value) in update.to_properties() {
            self.properties.remove(&properties::alias(&key));
            self.properties.insert(key, value);
        }
    }
}

/// Parameters of a due-items query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueQuery {
    /// Reference day.
    pub as_of: NaiveDate,
    /// Reference-tag filter; empty means no filtering.
    pub refs: BTreeSet<String>,
    /// `true`: due on or before `as_of`. `false`: due exactly on `as_of`.
    pub include_outdated: bool,
}

impl DueQuery {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            refs: BTreeSet::new(),
            include_outdated: true,
        }
    }

    pub fn with_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refs = refs.into_iter().map(Into::into).collect();
        self
    }

    pub fn include_outdated(mut self, include: bool) -> Self {
        self.include_outdated = include;
        self
    }

    /// Check if a stored record satisfies this query.
    ///
    /// Records without a parsable due date never match. With a non-empty
    /// filter a record matches when it carries at least one of the tags.
    pub fn matches(&self, record: &StoredItemRecord) -> bool {
        let Some(due) = record.due() else {
            return false;
        };
        let due_ok = if self.include_outdated {
            due <= self.as_of
        } else {
            due == self.as_of
        };
        due_ok && (self.refs.is_empty() || record.refs.iter().any(|r| self.refs.contains(r)))
    }
}

/// Source of due items. This is the only suspension point of the scheduler.
#[async_trait]
pub trait DueItemSource: Send + Sync {
    /// Return every stored item matching the query, with raw properties.
    async fn query_due_items(&self, query: &DueQuery) -> Result<Vec<StoredItemRecord>>;
}

/// Fields to write back after sampling or rescheduling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityUpdate {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub sample: Option<f64>,
    pub due: Option<NaiveDate>,
}

impl PriorityUpdate {
    pub fn sample(sample: f64) -> Self {
        Self {
            sample: Some(sample),
            ..Default::default()
        }
    }

    pub fn due(due: NaiveDate) -> Self {
        Self {
            due: Some(due),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_none() && self.b.is_none() && self.sample.is_none() && self.due.is_none()
    }

    /// Render as stored properties under the dashed keys.
    pub fn to_properties(&self) -> Properties {
        let mut props = Properties::new();
        let numbers = [(KEY_A, self.a), (KEY_B, self.b), (KEY_SAMPLE, self.sample)];
        for (key, value) in numbers {
            if let Some(n) = value.and_then(serde_json::Number::from_f64) {
                props.insert(key.to_string(), Value::Number(n));
            }
        }
        if let Some(due) = self.due {
            props.insert(KEY_DUE.to_string(), Value::String(due.format(DATE_FORMAT).to_string()));
        }
        props
    }
}

/// Write-back collaborator invoked by the application, never by the queue.
pub trait PriorityWriter: Send + Sync {
    /// Persist updated priority fields for an item.
    fn persist_priority(&self, id: &str, update: &PriorityUpdate) -> Result<()>;
}
