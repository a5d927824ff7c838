//! In-memory item store for tests and embedding.

use std::sync::RwLock;

use async_trait::async_trait;

use super::traits::{DueItemSource, DueQuery, PriorityUpdate, PriorityWriter, StoredItemRecord};
use crate::error::{IbqError, Result};

/// Item store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    records: RwLock<Vec<StoredItemRecord>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = StoredItemRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Insert a record, replacing any record with the same id.
    pub fn upsert(&self, record: StoredItemRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|e| IbqError::Storage(e.to_string()))?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredItemRecord>> {
        let records = self.records.read().map_err(|e| IbqError::Storage(e.to_string()))?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let mut records = self.records.write().map_err(|e| IbqError::Storage(e.to_string()))?;
        records.retain(|r| r.id != id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DueItemSource for MemoryItemStore {
    async fn query_due_items(&self, query: &DueQuery) -> Result<Vec<StoredItemRecord>> {
        let records = self.records.read().map_err(|e| IbqError::Storage(e.to_string()))?;
        Ok(records.iter().filter(|r| query.matches(r)).cloned().collect())
    }
}

impl PriorityWriter for MemoryItemStore {
    fn persist_priority(&self, id: &str, update: &PriorityUpdate) -> Result<()> {
        let mut records = self.records.write().map_err(|e| IbqError::Storage(e.to_string()))?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| IbqError::ItemNotFound(id.to_string()))?;
        record.apply(update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{KEY_DUE, KEY_SAMPLE};
    use chrono::NaiveDate;

    #[test]
    fn test_upsert_and_remove() {
        let store = MemoryItemStore::new();
        assert!(store.is_empty());

        store.upsert(StoredItemRecord::new("a")).unwrap();
        store.upsert(StoredItemRecord::new("a").with_ref("x")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().refs, vec!["x".to_string()]);

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_persist_priority() {
        let store = MemoryItemStore::with_records([StoredItemRecord::new("a")]);
        store.persist_priority("a", &PriorityUpdate::sample(0.4)).unwrap();
        let rec = store.get("a").unwrap().unwrap();
        assert_eq!(rec.properties.get(KEY_SAMPLE), Some(&serde_json::json!(0.4)));

        assert!(store.persist_priority("b", &PriorityUpdate::sample(0.4)).is_err());
    }

    #[tokio::test]
    async fn test_query_due_items_filters() {
        let store = MemoryItemStore::with_records([
            StoredItemRecord::new("a").with_property(KEY_DUE, "2025-05-01").with_ref("rust"),
            StoredItemRecord::new("b").with_property(KEY_DUE, "2025-05-01").with_ref("go"),
            StoredItemRecord::new("c").with_property(KEY_DUE, "2025-05-02").with_ref("rust"),
        ]);
        let day = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        let due = store.query_due_items(&DueQuery::new(day).with_refs(["rust"])).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "a");
    }
}
