//! Schedulable items and the shared handle the queue holds.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use crate::error::Result;
use crate::priority::{PriorityDistribution, SampleMode, StoredPriority, is_valid_sample};
use crate::properties::{self, KEY_A, KEY_B};
use crate::storage::{PriorityUpdate, StoredItemRecord};

/// An item eligible for scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulableItem {
    /// Stable identity, as the store knows it
    pub id: String,
    /// Priority parameters; `None` means priority not configured
    pub beta: Option<PriorityDistribution>,
    /// Last drawn priority sample
    pub sample: Option<f64>,
    /// Calendar due date
    pub due: Option<NaiveDate>,
    /// Reference tags
    pub refs: Vec<String>,
}

impl SchedulableItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            beta: None,
            sample: None,
            due: None,
            refs: Vec::new(),
        }
    }

    /// Materialize from a stored record. Malformed fields become `None`.
    pub fn from_record(record: &StoredItemRecord) -> Self {
        let stored = StoredPriority::from_properties(&record.properties);
        Self {
            id: record.id.clone(),
            beta: stored.beta,
            sample: stored.sample,
            due: record.due(),
            refs: record.refs.clone(),
        }
    }

    pub fn with_priority(mut self, a: f64, b: f64) -> Result<Self> {
        self.beta = Some(PriorityDistribution::new(a, b)?);
        Ok(self)
    }

    pub fn with_sample(mut self, sample: f64) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.beta.is_some()
    }

    /// Cached sample if it is valid.
    pub fn valid_sample(&self) -> Option<f64> {
        self.sample.filter(|s| is_valid_sample(*s))
    }
}

/// Shared, externally mutable handle to a [`SchedulableItem`].
///
/// The queue holds these rather than owned items: whoever presents an item
/// may edit its due date or priority parameters while it is still queued,
/// and the queue must observe those edits when it next looks at the item.
#[derive(Debug, Clone)]
pub struct SharedItem(Arc<RwLock<SchedulableItem>>);

impl SharedItem {
    pub fn new(item: SchedulableItem) -> Self {
        Self(Arc::new(RwLock::new(item)))
    }

    // Writers never leave an item half-updated, so a poisoned lock still
    // guards a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, SchedulableItem> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SchedulableItem> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    pub fn sample(&self) -> Option<f64> {
        self.read().sample
    }

    pub fn due(&self) -> Option<NaiveDate> {
        self.read().due
    }

    pub fn beta(&self) -> Option<PriorityDistribution> {
        self.read().beta
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.read().id == id
    }

    /// Copy of the current item state.
    pub fn snapshot(&self) -> SchedulableItem {
        self.read().clone()
    }

    pub fn set_due(&self, due: Option<NaiveDate>) {
        self.write().due = due;
    }

    pub fn set_priority(&self, beta: Option<PriorityDistribution>) {
        self.write().beta = beta;
    }

    pub fn set_sample(&self, sample: Option<f64>) {
        self.write().sample = sample;
    }

    /// Whether both handles point at the same item.
    pub fn same_item(&self, other: &SharedItem) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<SchedulableItem> for SharedItem {
    fn from(item: SchedulableItem) -> Self {
        Self::new(item)
    }
}

/// Parameters applied when turning a stored record into an incremental item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityDefaults {
    pub a: f64,
    pub b: f64,
}

impl Default for PriorityDefaults {
    fn default() -> Self {
        Self { a: 1.0, b: 1.0 }
    }
}

/// Compute the fields that make a stored record an incremental item.
///
/// Missing or unusable `a`/`b` fall back to the defaults; an existing valid
/// sample is kept, otherwise one is drawn. `due` overrides the stored due
/// date when given. The record itself is not touched.
pub fn initialize_item(
    record: &StoredItemRecord,
    defaults: PriorityDefaults,
    due: Option<NaiveDate>,
) -> Result<PriorityUpdate> {
    let stored = StoredPriority::from_properties(&record.properties);
    let beta = match stored.beta {
        Some(beta) => beta,
        None => {
            let a = properties::number(&record.properties, KEY_A)
                .filter(|a| *a > 0.0)
                .unwrap_or(defaults.a);
            let b = properties::number(&record.properties, KEY_B)
                .filter(|b| *b > 0.0)
                .unwrap_or(defaults.b);
            PriorityDistribution::new(a, b)?
        }
    };
    let sample = stored
        .sample
        .unwrap_or_else(|| beta.sample(SampleMode::Stochastic));

    Ok(PriorityUpdate {
        a: Some(beta.a()),
        b: Some(beta.b()),
        sample: Some(sample),
        due: due.or_else(|| record.due()),
    })
}
