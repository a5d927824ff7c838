//! JSONL-file item store with in-memory caching.
//!
//! One record per line. The file is the source of truth: queries reload it,
//! inserts append, and updates and deletes replace the whole file. The cache
//! only ever holds what has been written successfully.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use async_trait::async_trait;

use super::traits::{DueItemSource, DueQuery, PriorityUpdate, PriorityWriter, StoredItemRecord};
use crate::error::{IbqError, Result};

type Cache = Option<Vec<StoredItemRecord>>;

/// JSONL-backed item store.
pub struct JsonlItemStore {
    path: PathBuf,
    cache: RwLock<Cache>,
}

impl JsonlItemStore {
    /// Open the store at the given file path, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            cache: RwLock::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_cache(&self) -> Result<RwLockWriteGuard<'_, Cache>> {
        self.cache.write().map_err(|e| IbqError::Storage(e.to_string()))
    }

    /// Read every record from the file.
    ///
    /// Lines that are not UTF-8 or fail to parse are skipped with a warning
    /// rather than failing the whole store.
    fn read_file(&self) -> Result<Vec<StoredItemRecord>> {
        let mut records = Vec::new();
        if !self.path.exists() {
            return Ok(records);
        }

        let reader = BufReader::new(File::open(&self.path)?);
        for (lineno, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let text = match std::str::from_utf8(&line) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Skipping malformed line {} in {}: {}", lineno + 1, self.path.display(), e);
                    continue;
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredItemRecord>(text) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping malformed line {} in {}: {}", lineno + 1, self.path.display(), e),
            }
        }

        log::debug!("Loaded {} items from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Load the file into cache if not already loaded.
    fn ensure_loaded(&self) -> Result<()> {
        {
            let cache = self.cache.read().map_err(|e| IbqError::Storage(e.to_string()))?;
            if cache.is_some() {
                return Ok(());
            }
        }

        let mut cache = self.write_cache()?;
        if cache.is_none() {
            *cache = Some(self.read_file()?);
        }
        Ok(())
    }

    /// Drop the cache and read the file again.
    pub fn reload(&self) -> Result<()> {
        let mut cache = self.write_cache()?;
        *cache = Some(self.read_file()?);
        Ok(())
    }

    fn append_to_file(&self, record: &StoredItemRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Replace the file contents via a sibling temp file and rename.
    fn rewrite_file(&self, records: &[StoredItemRecord]) -> Result<()> {
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let written = write_records(&tmp, records).and_then(|()| fs::rename(&tmp, &self.path).map_err(IbqError::from));
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }

    /// Insert a record, replacing any record with the same id.
    pub fn upsert(&self, record: StoredItemRecord) -> Result<()> {
        self.ensure_loaded()?;

        let mut cache = self.write_cache()?;
        let records = cache.get_or_insert_with(Vec::new);

        match records.iter().position(|r| r.id == record.id) {
            Some(index) => {
                let mut updated = records.clone();
                updated[index] = record;
                self.rewrite_file(&updated)?;
                *records = updated;
            }
            None => {
                self.append_to_file(&record)?;
                records.push(record);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredItemRecord>> {
        self.ensure_loaded()?;

        let cache = self.cache.read().map_err(|e| IbqError::Storage(e.to_string()))?;
        Ok(cache.as_ref().and_then(|records| records.iter().find(|r| r.id == id).cloned()))
    }

    pub fn list(&self) -> Result<Vec<StoredItemRecord>> {
        self.ensure_loaded()?;

        let cache = self.cache.read().map_err(|e| IbqError::Storage(e.to_string()))?;
        Ok(cache.clone().unwrap_or_default())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.ensure_loaded()?;

        let mut cache = self.write_cache()?;
        let records = cache.get_or_insert_with(Vec::new);

        let updated: Vec<StoredItemRecord> = records.iter().filter(|r| r.id != id).cloned().collect();
        if updated.len() == records.len() {
            return Err(IbqError::ItemNotFound(id.to_string()));
        }

        self.rewrite_file(&updated)?;
        *records = updated;
        Ok(())
    }
}

#[async_trait]
impl DueItemSource for JsonlItemStore {
    /// Always reads the file, so edits made by other processes are seen.
    async fn query_due_items(&self, query: &DueQuery) -> Result<Vec<StoredItemRecord>> {
        let mut cache = self.write_cache()?;
        let records = self.read_file()?;
        let due = records.iter().filter(|r| query.matches(r)).cloned().collect();
        *cache = Some(records);
        Ok(due)
    }
}

impl PriorityWriter for JsonlItemStore {
    fn persist_priority(&self, id: &str, update: &PriorityUpdate) -> Result<()> {
        self.ensure_loaded()?;

        let mut cache = self.write_cache()?;
        let records = cache.get_or_insert_with(Vec::new);

        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| IbqError::ItemNotFound(id.to_string()))?;
        let mut updated = records.clone();
        updated[index].apply(update);

        self.rewrite_file(&updated)?;
        *records = updated;
        Ok(())
    }
}

fn write_records(path: &Path, records: &[StoredItemRecord]) -> Result<()> {
    let mut file = File::create(path)?;
    for record in records {
        writeln!(file, "{}", serde_json::to_string(record)?)?;
    }
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{KEY_A, KEY_B, KEY_DUE, KEY_SAMPLE};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonlItemStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlItemStore::open(temp_dir.path().join("items.jsonl")).unwrap();
        (store, temp_dir)
    }

    fn item(id: &str, due: &str) -> StoredItemRecord {
        StoredItemRecord::new(id)
            .with_property(KEY_A, 1.0)
            .with_property(KEY_B, 1.0)
            .with_property(KEY_DUE, due)
    }

    #[test]
    fn test_upsert_and_get() {
        let (store, _temp) = create_test_store();
        let record = item("1", "2025-01-01");

        store.upsert(record.clone()).unwrap();
        assert_eq!(store.get("1").unwrap(), Some(record));
    }

    #[test]
    fn test_get_not_found() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.get("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_upsert_replaces() {
        let (store, _temp) = create_test_store();
        store.upsert(item("1", "2025-01-01")).unwrap();
        store.upsert(item("1", "2025-02-01")).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].due(), NaiveDate::from_ymd_opt(2025, 2, 1));
    }

    #[test]
    fn test_delete() {
        let (store, _temp) = create_test_store();
        store.upsert(item("1", "2025-01-01")).unwrap();

        store.delete("1").unwrap();
        assert_eq!(store.get("1").unwrap(), None);
        assert!(matches!(store.delete("1"), Err(IbqError::ItemNotFound(_))));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("items.jsonl");

        {
            let store = JsonlItemStore::open(&path).unwrap();
            store.upsert(item("1", "2025-01-01")).unwrap();
            store.upsert(item("2", "2025-01-05")).unwrap();
            store.persist_priority("2", &PriorityUpdate::sample(0.75)).unwrap();
        }

        let store = JsonlItemStore::open(&path).unwrap();
        let reloaded = store.get("2").unwrap().unwrap();
        assert_eq!(reloaded.properties.get(KEY_SAMPLE), Some(&serde_json::json!(0.75)));
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_line_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.jsonl");
        let good = serde_json::to_string(&item("ok", "2025-01-01")).unwrap();
        fs::write(&path, format!("{{not json\n{}\n\n", good)).unwrap();

        let store = JsonlItemStore::open(&path).unwrap();
        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "ok");
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.jsonl");
        let good = serde_json::to_string(&item("ok", "2025-01-01")).unwrap();
        let mut bytes = b"{\"id\":\"bad\xff\"}\n".to_vec();
        bytes.extend_from_slice(good.as_bytes());
        bytes.push(b'\n');
        fs::write(&path, bytes).unwrap();

        let store = JsonlItemStore::open(&path).unwrap();
        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "ok");
    }

    #[tokio::test]
    async fn test_query_skips_invalid_utf8_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.jsonl");
        let good = serde_json::to_string(&item("ok", "2025-01-01")).unwrap();
        let mut bytes = vec![0xff, 0xfe, b'\n'];
        bytes.extend_from_slice(good.as_bytes());
        fs::write(&path, bytes).unwrap();

        let store = JsonlItemStore::open(&path).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let due = store.query_due_items(&DueQuery::new(today)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "ok");
    }

    /// Put a directory where the file was so the final rename fails.
    fn block_writes(store: &JsonlItemStore) {
        fs::remove_file(store.path()).unwrap();
        fs::create_dir(store.path()).unwrap();
    }

    #[test]
    fn test_failed_persist_leaves_cache_unchanged() {
        let (store, _temp) = create_test_store();
        store.upsert(item("a", "2025-01-01")).unwrap();
        block_writes(&store);

        let result = store.persist_priority("a", &PriorityUpdate::sample(0.9));
        assert!(result.is_err());

        let cached = store.get("a").unwrap().unwrap();
        assert_eq!(cached.properties.get(KEY_SAMPLE), None);
    }

    #[test]
    fn test_failed_upsert_and_delete_leave_cache_unchanged() {
        let (store, _temp) = create_test_store();
        store.upsert(item("a", "2025-01-01")).unwrap();
        store.upsert(item("b", "2025-01-01")).unwrap();
        block_writes(&store);

        assert!(store.upsert(item("a", "2025-03-03")).is_err());
        assert_eq!(store.get("a").unwrap().unwrap().due(), NaiveDate::from_ymd_opt(2025, 1, 1));

        assert!(store.delete("b").is_err());
        assert!(store.get("b").unwrap().is_some());
    }

    #[test]
    fn test_rewrite_leaves_no_temp_file() {
        let (store, temp) = create_test_store();
        store.upsert(item("a", "2025-01-01")).unwrap();
        store.persist_priority("a", &PriorityUpdate::sample(0.4)).unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["items.jsonl"]);
    }

    #[tokio::test]
    async fn test_query_sees_external_edits() {
        let (store, _temp) = create_test_store();
        store.upsert(item("a", "2025-01-01")).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(store.query_due_items(&DueQuery::new(today)).await.unwrap().len(), 1);

        // Another process appends a record behind this store's back.
        let other = JsonlItemStore::open(store.path()).unwrap();
        other.upsert(item("b", "2025-01-02")).unwrap();

        let due = store.query_due_items(&DueQuery::new(today)).await.unwrap();
        assert_eq!(due.len(), 2);
        assert!(store.get("b").unwrap().is_some());
    }

    #[test]
    fn test_reload_picks_up_external_edits() {
        let (store, _temp) = create_test_store();
        store.upsert(item("a", "2025-01-01")).unwrap();

        let other = JsonlItemStore::open(store.path()).unwrap();
        other.delete("a").unwrap();
        assert!(store.get("a").unwrap().is_some());

        store.reload().unwrap();
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_persist_priority_not_found() {
        let (store, _temp) = create_test_store();
        let result = store.persist_priority("missing", &PriorityUpdate::sample(0.5));
        assert!(matches!(result, Err(IbqError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_query_due_items() {
        let (store, _temp) = create_test_store();
        store.upsert(item("past", "2025-01-01")).unwrap();
        store.upsert(item("today", "2025-01-10")).unwrap();
        store.upsert(item("future", "2025-01-11")).unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let due = store.query_due_items(&DueQuery::new(today)).await.unwrap();
        let mut ids: Vec<_> = due.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["past", "today"]);

        let exact = store
            .query_due_items(&DueQuery::new(today).include_outdated(false))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, "today");
    }
}
