//! Domain types for uploaded spreadsheets, derived charts, and insights.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One worksheet row, keyed by column header.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Processing state of an uploaded file. Transitions exactly once out of
/// `Processing`, synchronously during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Processing,
    Completed,
    Error,
}

/// The two spreadsheet formats accepted at upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadsheetKind {
    Xlsx,
    Xls,
}

impl SpreadsheetKind {
    /// Determine the kind from a filename extension. `None` for anything
    /// that is not one of the two supported formats.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }
}

/// An uploaded spreadsheet file and its derived worksheet metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetFile {
    pub id: String,
    pub original_name: String,
    pub storage_path: String,
    pub byte_size: usize,
    pub kind: SpreadsheetKind,
    pub checksum: String,
    pub owner_id: String,
    pub status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worksheets: Vec<WorksheetSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WorkbookMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub public: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl SpreadsheetFile {
    pub fn new(
        original_name: String,
        storage_path: String,
        byte_size: usize,
        kind: SpreadsheetKind,
        checksum: String,
        owner_id: String,
    ) -> Self {
        Self {
            id: format!("file_{}", Uuid::new_v4().simple()),
            original_name,
            storage_path,
            byte_size,
            kind,
            checksum,
            owner_id,
            status: ProcessingStatus::Processing,
            error: None,
            worksheets: Vec::new(),
            metadata: None,
            tags: Vec::new(),
            public: false,
            uploaded_at: Utc::now(),
        }
    }
}

/// Shape summary for a single worksheet. Counts come from the occupied
/// range bounds, not from scanning non-empty cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetSummary {
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
}

/// Aggregate metadata across all worksheets of a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookMetadata {
    pub total_rows: usize,
    pub total_columns: usize,
    pub worksheet_count: usize,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl WorkbookMetadata {
    /// Roll up worksheet summaries. Timestamps default to ingestion time.
    pub fn from_worksheets(worksheets: &[WorksheetSummary]) -> Self {
        let now = Utc::now();
        Self {
            total_rows: worksheets.iter().map(|w| w.row_count).sum(),
            total_columns: worksheets.iter().map(|w| w.column_count).max().unwrap_or(0),
            worksheet_count: worksheets.len(),
            created_at: now,
            modified_at: now,
        }
    }
}

/// Supported chart types. Anything outside the proportional pair renders
/// as a plain labeled series unless a Z axis is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Area,
    Scatter,
    Radar,
    Pie,
    Doughnut,
}

/// A user-chosen axis: the source column plus a display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSelection {
    pub column: String,
    pub label: String,
}

/// Chart request: which file/worksheet to read and how to map columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub file_id: String,
    pub worksheet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub chart_type: ChartType,
    pub x_axis: AxisSelection,
    pub y_axis: AxisSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_axis: Option<AxisSelection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

/// Chart-library-agnostic output: a label sequence plus one or more series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<DataSet>,
}

/// One labeled series within a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub label: String,
    pub data: SeriesData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub background_color: Vec<String>,
}

/// Series payload: scalar values, or per-record points for 3D charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesData {
    Values(Vec<f64>),
    Points(Vec<PointXYZ>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointXYZ {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Descriptive statistics derived alongside a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outliers: Vec<String>,
    /// Reserved for future use; always empty today.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correlations: Vec<String>,
    pub ai_generated: bool,
}

/// Sharing controls on an analytics record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareSettings {
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub granted_to: Vec<String>,
}

/// A persisted chart: the spec that produced it plus the derived data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub id: String,
    pub title: String,
    pub file_id: String,
    pub worksheet: String,
    pub chart_type: ChartType,
    pub x_axis: AxisSelection,
    pub y_axis: AxisSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_axis: Option<AxisSelection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    pub chart_data: ChartData,
    pub insights: Insights,
    pub owner_id: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub share: ShareSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalyticsRecord {
    pub fn new(
        spec: &ChartSpec,
        chart_data: ChartData,
        insights: Insights,
        owner_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("chart_{}", Uuid::new_v4().simple()),
            title: spec
                .title
                .clone()
                .unwrap_or_else(|| format!("{} vs {}", spec.y_axis.label, spec.x_axis.label)),
            file_id: spec.file_id.clone(),
            worksheet: spec.worksheet.clone(),
            chart_type: spec.chart_type,
            x_axis: spec.x_axis.clone(),
            y_axis: spec.y_axis.clone(),
            z_axis: spec.z_axis.clone(),
            colors: spec.colors.clone(),
            chart_data,
            insights,
            owner_id,
            view_count: 0,
            bookmarked: false,
            share: ShareSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
