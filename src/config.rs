//! Runtime settings loaded from the environment.

use anyhow::{Context, Result};

/// Server settings. `.env` is honored when present (see `main`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    /// Root directory for stored spreadsheet binaries.
    pub data_dir: String,
    /// Upper bound on the multipart upload body.
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
        let max_upload_bytes = match std::env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .parse()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            Err(_) => 25 * 1024 * 1024,
        };

        Ok(Self {
            bind_addr,
            data_dir,
            max_upload_bytes,
        })
    }
}
