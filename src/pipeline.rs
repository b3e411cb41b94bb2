//! Ingestion orchestrator: sequences parsing into persisted file
//! metadata, and coordinates the transformer and insight generator when
//! a chart is requested.
//!
//! Collaborator handles (record store, blob storage) are constructor
//! parameters; nothing here reaches for ambient state.

use crate::auth::UserIdentity;
use crate::chart;
use crate::error::PipelineError;
use crate::insights;
use crate::records::worksheet_records;
use crate::schema::{
    AnalyticsRecord, ChartSpec, ProcessingStatus, Record, ShareSettings, SpreadsheetFile,
    SpreadsheetKind, WorkbookMetadata,
};
use crate::storage::BlobStore;
use crate::store::RecordStore;
use crate::workbook;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Owner-editable fields of a file entity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileUpdate {
    pub tags: Option<Vec<String>>,
    pub public: Option<bool>,
}

/// Owner-editable fields of an analytics record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartUpdate {
    pub title: Option<String>,
    pub colors: Option<Vec<String>>,
    pub bookmarked: Option<bool>,
    pub share: Option<ShareSettings>,
}

pub struct Pipeline {
    store: Arc<dyn RecordStore>,
    blobs: BlobStore,
}

impl Pipeline {
    pub fn new(store: Arc<dyn RecordStore>, blobs: BlobStore) -> Self {
        Self { store, blobs }
    }

    /// Ingest uploaded bytes: persist the binary, parse it, and record
    /// the outcome. A parse failure leaves the file in terminal `Error`
    /// state rather than rejecting the request; there is no retry path.
    pub async fn ingest(
        &self,
        bytes: Vec<u8>,
        original_name: &str,
        owner: &UserIdentity,
    ) -> Result<SpreadsheetFile, PipelineError> {
        let kind = SpreadsheetKind::from_filename(original_name).ok_or_else(|| {
            PipelineError::InvalidRequest(format!(
                "unsupported file type: {} (supported: .xlsx, .xls)",
                original_name
            ))
        })?;

        let checksum = format!("{:x}", Sha256::digest(&bytes));
        let storage_path = format!("uploads/{}.{}", Uuid::new_v4().simple(), kind.extension());

        let mut file = SpreadsheetFile::new(
            original_name.to_string(),
            storage_path,
            bytes.len(),
            kind,
            checksum,
            owner.id.clone(),
        );

        // The binary lands on durable storage first so completed files
        // can be re-read at chart time.
        self.blobs.save(&file.storage_path, &bytes).await?;

        match workbook::parse_workbook(&bytes, kind) {
            Ok(worksheets) => {
                file.metadata = Some(WorkbookMetadata::from_worksheets(&worksheets));
                file.worksheets = worksheets;
                file.status = ProcessingStatus::Completed;
                info!(
                    "Ingested {} ({} bytes, {} sheets) for {}",
                    file.original_name,
                    file.byte_size,
                    file.worksheets.len(),
                    owner.id
                );
            }
            Err(PipelineError::MalformedWorkbook(message)) => {
                warn!("Ingestion failed for {}: {}", file.original_name, message);
                file.status = ProcessingStatus::Error;
                file.error = Some(message);
            }
            Err(other) => return Err(other),
        }

        self.store.insert_file(file.clone()).await?;
        Ok(file)
    }

    pub async fn file(
        &self,
        file_id: &str,
        caller: &UserIdentity,
    ) -> Result<SpreadsheetFile, PipelineError> {
        let file = self
            .store
            .get_file(file_id)
            .await?
            .ok_or(PipelineError::FileNotFound)?;
        if !can_view_file(&file, caller) {
            return Err(PipelineError::AccessDenied);
        }
        Ok(file)
    }

    pub async fn list_files(
        &self,
        caller: &UserIdentity,
    ) -> Result<Vec<SpreadsheetFile>, PipelineError> {
        let owner = (!caller.is_admin()).then_some(caller.id.as_str());
        Ok(self.store.list_files(owner).await?)
    }

    pub async fn update_file(
        &self,
        file_id: &str,
        update: FileUpdate,
        caller: &UserIdentity,
    ) -> Result<SpreadsheetFile, PipelineError> {
        let mut file = self
            .store
            .get_file(file_id)
            .await?
            .ok_or(PipelineError::FileNotFound)?;
        if !can_modify(&file.owner_id, caller) {
            return Err(PipelineError::AccessDenied);
        }

        if let Some(tags) = update.tags {
            file.tags = tags;
        }
        if let Some(public) = update.public {
            file.public = public;
        }
        self.store.update_file(file.clone()).await?;
        Ok(file)
    }

    /// Delete a file entity and its stored binary.
    pub async fn delete_file(
        &self,
        file_id: &str,
        caller: &UserIdentity,
    ) -> Result<(), PipelineError> {
        let file = self
            .store
            .get_file(file_id)
            .await?
            .ok_or(PipelineError::FileNotFound)?;
        if !can_modify(&file.owner_id, caller) {
            return Err(PipelineError::AccessDenied);
        }

        if let Err(e) = self.blobs.delete(&file.storage_path).await {
            warn!("Stored binary removal failed for {}: {:#}", file_id, e);
        }
        self.store.delete_file(file_id).await?;
        info!("Deleted file {} ({})", file_id, file.original_name);
        Ok(())
    }

    /// Re-read a worksheet's rows fresh from durable storage.
    pub async fn read_worksheet(
        &self,
        file_id: &str,
        worksheet: &str,
        caller: &UserIdentity,
    ) -> Result<(Vec<Record>, Vec<String>), PipelineError> {
        let file = self.file(file_id, caller).await?;
        if file.status != ProcessingStatus::Completed {
            return Err(PipelineError::FileNotReady(file.status));
        }

        let bytes = self.blobs.read(&file.storage_path).await?;
        let range = workbook::sheet_range(&bytes, file.kind, worksheet)?;
        Ok(worksheet_records(&range))
    }

    /// Create a chart: re-read the worksheet, validate the axis columns
    /// against the fresh column set, then transform, derive insights,
    /// and persist the analytics record.
    pub async fn create_chart(
        &self,
        spec: &ChartSpec,
        caller: &UserIdentity,
    ) -> Result<AnalyticsRecord, PipelineError> {
        let (records, columns) = self
            .read_worksheet(&spec.file_id, &spec.worksheet, caller)
            .await?;
        if records.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let mut axes = vec![&spec.x_axis, &spec.y_axis];
        axes.extend(spec.z_axis.as_ref());
        for axis in axes {
            if !columns.contains(&axis.column) {
                return Err(PipelineError::ColumnNotFound(axis.column.clone()));
            }
        }

        let chart_data = chart::build_chart_data(&records, spec);
        let insights = insights::generate_insights(&records, &spec.x_axis, &spec.y_axis);
        let record = AnalyticsRecord::new(spec, chart_data, insights, caller.id.clone());

        self.store.insert_record(record.clone()).await?;
        info!(
            "Created chart {} ({:?} over {} rows) for {}",
            record.id,
            record.chart_type,
            records.len(),
            caller.id
        );
        Ok(record)
    }

    /// Fetch a record and bump its view counter. The increment is
    /// last-write-wins under concurrent readers.
    pub async fn read_record(
        &self,
        record_id: &str,
        caller: &UserIdentity,
    ) -> Result<AnalyticsRecord, PipelineError> {
        let mut record = self
            .store
            .get_record(record_id)
            .await?
            .ok_or(PipelineError::RecordNotFound)?;
        if !can_view_record(&record, caller) {
            return Err(PipelineError::AccessDenied);
        }

        record.view_count += 1;
        self.store.update_record(record.clone()).await?;
        Ok(record)
    }

    pub async fn list_records(
        &self,
        caller: &UserIdentity,
    ) -> Result<Vec<AnalyticsRecord>, PipelineError> {
        let owner = (!caller.is_admin()).then_some(caller.id.as_str());
        Ok(self.store.list_records(owner).await?)
    }

    pub async fn update_record(
        &self,
        record_id: &str,
        update: ChartUpdate,
        caller: &UserIdentity,
    ) -> Result<AnalyticsRecord, PipelineError> {
        let mut record = self
            .store
            .get_record(record_id)
            .await?
            .ok_or(PipelineError::RecordNotFound)?;
        if !can_modify(&record.owner_id, caller) {
            return Err(PipelineError::AccessDenied);
        }

        if let Some(title) = update.title {
            record.title = title;
        }
        if let Some(colors) = update.colors {
            record.colors = colors;
        }
        if let Some(bookmarked) = update.bookmarked {
            record.bookmarked = bookmarked;
        }
        if let Some(share) = update.share {
            record.share = share;
        }
        record.updated_at = Utc::now();
        self.store.update_record(record.clone()).await?;
        Ok(record)
    }

    pub async fn delete_record(
        &self,
        record_id: &str,
        caller: &UserIdentity,
    ) -> Result<(), PipelineError> {
        let record = self
            .store
            .get_record(record_id)
            .await?
            .ok_or(PipelineError::RecordNotFound)?;
        if !can_modify(&record.owner_id, caller) {
            return Err(PipelineError::AccessDenied);
        }
        self.store.delete_record(record_id).await?;
        Ok(())
    }
}

fn can_view_file(file: &SpreadsheetFile, caller: &UserIdentity) -> bool {
    file.owner_id == caller.id || file.public || caller.is_admin()
}

fn can_view_record(record: &AnalyticsRecord, caller: &UserIdentity) -> bool {
    record.owner_id == caller.id
        || record.share.public
        || record.share.granted_to.iter().any(|u| *u == caller.id)
        || caller.is_admin()
}

fn can_modify(owner_id: &str, caller: &UserIdentity) -> bool {
    owner_id == caller.id || caller.is_admin()
}
