//! Error taxonomy for the ingestion and chart pipeline.
//!
//! Every condition the pipeline can reject a request with is a named
//! variant here; handlers surface them as JSON error bodies. Internal
//! store/IO faults travel through the transparent `Storage` wrapper.

use crate::schema::ProcessingStatus;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The uploaded bytes could not be parsed as a workbook. Terminal:
    /// recorded on the file entity, never retried.
    #[error("malformed workbook: {0}")]
    MalformedWorkbook(String),

    #[error("file is not ready (status: {0:?})")]
    FileNotReady(ProcessingStatus),

    #[error("worksheet '{0}' not found")]
    WorksheetNotFound(String),

    #[error("column '{0}' not found in worksheet")]
    ColumnNotFound(String),

    #[error("worksheet contains no data rows")]
    EmptyDataset,

    #[error("access denied")]
    AccessDenied,

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("file not found")]
    FileNotFound,

    #[error("analytics record not found")]
    RecordNotFound,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedWorkbook(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::FileNotReady(_) => StatusCode::CONFLICT,
            Self::WorksheetNotFound(_) | Self::FileNotFound | Self::RecordNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::ColumnNotFound(_) | Self::EmptyDataset | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {:#}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            PipelineError::AccessDenied.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PipelineError::WorksheetNotFound("Sales".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PipelineError::FileNotReady(ProcessingStatus::Processing).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PipelineError::EmptyDataset.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn column_error_names_the_column() {
        let err = PipelineError::ColumnNotFound("Revenue".into());
        assert!(err.to_string().contains("Revenue"));
    }
}
