//! Sheet Insights - Spreadsheet upload, worksheet reading, and chart
//! analytics server.

mod auth;
mod chart;
mod config;
mod error;
#[cfg(test)]
mod fixtures;
mod insights;
mod pipeline;
mod records;
mod schema;
mod storage;
mod store;
mod workbook;

use auth::{IdentityRegistry, UserIdentity};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap},
    response::Json,
    routing::{get, post},
    Router,
};
use config::Settings;
use error::PipelineError;
use pipeline::{ChartUpdate, FileUpdate, Pipeline};
use schema::{AnalyticsRecord, ChartSpec, Record, SpreadsheetFile};
use std::sync::Arc;
use storage::BlobStore;
use store::MemoryStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    identities: IdentityRegistry,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "sheet_insights=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let identities = IdentityRegistry::from_env()?;

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(
            Arc::new(MemoryStore::new()),
            BlobStore::new(&settings.data_dir),
        )),
        identities,
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/files", post(upload_file).get(list_files))
        .route(
            "/files/:id",
            get(get_file).patch(update_file).delete(delete_file),
        )
        .route("/files/:id/worksheets/:name", get(read_worksheet))
        .route("/charts", post(create_chart).get(list_charts))
        .route(
            "/charts/:id",
            get(get_chart).patch(update_chart).delete(delete_chart),
        )
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Run server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolve the caller from the `Authorization: Bearer <token>` header.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserIdentity, PipelineError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.identities.resolve(token))
        .ok_or(PipelineError::Unauthorized)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Upload a spreadsheet and ingest it.
async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<SpreadsheetFile>, PipelineError> {
    let caller = authenticate(&state, &headers)?;

    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::InvalidRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("upload").to_string();
            file_data = field
                .bytes()
                .await
                .map_err(|e| PipelineError::InvalidRequest(format!("Failed to read file: {}", e)))?
                .to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err(PipelineError::InvalidRequest("No file uploaded".to_string()));
    }

    let file = state.pipeline.ingest(file_data, &filename, &caller).await?;
    Ok(Json(file))
}

/// List files visible to the caller.
async fn list_files(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SpreadsheetFile>>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    Ok(Json(state.pipeline.list_files(&caller).await?))
}

/// Get a file entity by ID.
async fn get_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SpreadsheetFile>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    Ok(Json(state.pipeline.file(&id, &caller).await?))
}

/// Update a file's tags or public flag.
async fn update_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<FileUpdate>,
) -> Result<Json<SpreadsheetFile>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    Ok(Json(state.pipeline.update_file(&id, update, &caller).await?))
}

/// Delete a file and its stored binary.
async fn delete_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    state.pipeline.delete_file(&id, &caller).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

#[derive(serde::Deserialize)]
struct PageQuery {
    offset: Option<usize>,
    limit: Option<usize>,
}

#[derive(serde::Serialize)]
struct WorksheetPage {
    worksheet: String,
    columns: Vec<String>,
    total_rows: usize,
    offset: usize,
    limit: usize,
    records: Vec<Record>,
}

/// Read a worksheet's rows as keyed records, with pagination.
async fn read_worksheet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, name)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<WorksheetPage>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    let (records, columns) = state.pipeline.read_worksheet(&id, &name, &caller).await?;

    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);
    let total_rows = records.len();
    let page = records.into_iter().skip(offset).take(limit).collect();

    Ok(Json(WorksheetPage {
        worksheet: name,
        columns,
        total_rows,
        offset,
        limit,
        records: page,
    }))
}

/// Create a chart from a completed file's worksheet.
async fn create_chart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(spec): Json<ChartSpec>,
) -> Result<Json<AnalyticsRecord>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    Ok(Json(state.pipeline.create_chart(&spec, &caller).await?))
}

/// List analytics records visible to the caller.
async fn list_charts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<AnalyticsRecord>>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    Ok(Json(state.pipeline.list_records(&caller).await?))
}

/// Get an analytics record, bumping its view counter.
async fn get_chart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AnalyticsRecord>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    Ok(Json(state.pipeline.read_record(&id, &caller).await?))
}

/// Update an analytics record's presentation or sharing fields.
async fn update_chart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<ChartUpdate>,
) -> Result<Json<AnalyticsRecord>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    Ok(Json(state.pipeline.update_record(&id, update, &caller).await?))
}

/// Delete an analytics record.
async fn delete_chart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, PipelineError> {
    let caller = authenticate(&state, &headers)?;
    state.pipeline.delete_record(&id, &caller).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
