//! Record store collaborator: persistence for file entities and
//! analytics records, keyed by opaque identifier.
//!
//! The pipeline only sees the trait; `MemoryStore` is the bundled
//! implementation and what the tests run against.

use crate::schema::{AnalyticsRecord, SpreadsheetFile};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_file(&self, file: SpreadsheetFile) -> Result<()>;
    async fn get_file(&self, id: &str) -> Result<Option<SpreadsheetFile>>;
    async fn update_file(&self, file: SpreadsheetFile) -> Result<()>;
    /// Returns true if the file existed.
    async fn delete_file(&self, id: &str) -> Result<bool>;
    /// List files, newest first. `owner` filters to one identity.
    async fn list_files(&self, owner: Option<&str>) -> Result<Vec<SpreadsheetFile>>;

    async fn insert_record(&self, record: AnalyticsRecord) -> Result<()>;
    async fn get_record(&self, id: &str) -> Result<Option<AnalyticsRecord>>;
    async fn update_record(&self, record: AnalyticsRecord) -> Result<()>;
    async fn delete_record(&self, id: &str) -> Result<bool>;
    async fn list_records(&self, owner: Option<&str>) -> Result<Vec<AnalyticsRecord>>;
}

/// In-memory store backed by `RwLock`-guarded maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<RwLock<HashMap<String, SpreadsheetFile>>>,
    records: Arc<RwLock<HashMap<String, AnalyticsRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_file(&self, file: SpreadsheetFile) -> Result<()> {
        self.files.write().unwrap().insert(file.id.clone(), file);
        Ok(())
    }

    async fn get_file(&self, id: &str) -> Result<Option<SpreadsheetFile>> {
        Ok(self.files.read().unwrap().get(id).cloned())
    }

    async fn update_file(&self, file: SpreadsheetFile) -> Result<()> {
        self.files.write().unwrap().insert(file.id.clone(), file);
        Ok(())
    }

    async fn delete_file(&self, id: &str) -> Result<bool> {
        Ok(self.files.write().unwrap().remove(id).is_some())
    }

    async fn list_files(&self, owner: Option<&str>) -> Result<Vec<SpreadsheetFile>> {
        let mut files: Vec<SpreadsheetFile> = self
            .files
            .read()
            .unwrap()
            .values()
            .filter(|f| owner.map(|o| f.owner_id == o).unwrap_or(true))
            .cloned()
            .collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    async fn insert_record(&self, record: AnalyticsRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<AnalyticsRecord>> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }

    async fn update_record(&self, record: AnalyticsRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().unwrap().remove(id).is_some())
    }

    async fn list_records(&self, owner: Option<&str>) -> Result<Vec<AnalyticsRecord>> {
        let mut records: Vec<AnalyticsRecord> = self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| owner.map(|o| r.owner_id == o).unwrap_or(true))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SpreadsheetKind;

    fn sample_file(owner: &str) -> SpreadsheetFile {
        SpreadsheetFile::new(
            "report.xlsx".into(),
            "uploads/report.xlsx".into(),
            128,
            SpreadsheetKind::Xlsx,
            "abc123".into(),
            owner.into(),
        )
    }

    #[tokio::test]
    async fn file_crud_and_owner_filter() {
        let store = MemoryStore::new();
        let mine = sample_file("alice");
        let theirs = sample_file("bob");
        let mine_id = mine.id.clone();

        store.insert_file(mine).await.unwrap();
        store.insert_file(theirs).await.unwrap();

        assert!(store.get_file(&mine_id).await.unwrap().is_some());
        assert_eq!(store.list_files(Some("alice")).await.unwrap().len(), 1);
        assert_eq!(store.list_files(None).await.unwrap().len(), 2);

        assert!(store.delete_file(&mine_id).await.unwrap());
        assert!(!store.delete_file(&mine_id).await.unwrap());
    }
}
