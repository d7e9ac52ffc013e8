//! Attachment storage for ticket screenshots and tester log files.

use std::{fmt, path::PathBuf, str::FromStr};

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

/// Largest attachment accepted by the upload route.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const FALLBACK_FILENAME: &str = "upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCategory {
    Tickets,
    Logs,
}

impl UploadCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadCategory::Tickets => "tickets",
            UploadCategory::Logs => "logs",
        }
    }
}

impl fmt::Display for UploadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadCategory {
    type Err = BlobStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tickets" => Ok(UploadCategory::Tickets),
            "logs" => Ok(UploadCategory::Logs),
            other => Err(BlobStoreError::UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("unknown upload category: {0}")]
    UnknownCategory(String),
    #[error("file is empty")]
    Empty,
    #[error("file exceeds {0} bytes")]
    TooLarge(usize),
    #[error("blob write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` and returns the public URL of the new object.
    async fn upload(
        &self,
        category: UploadCategory,
        user_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, BlobStoreError>;
}

/// Reduces a client filename to `[A-Za-z0-9._-]`, dropping any directory part.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// `{category}/{user_id}/{unix_millis}_{filename}`
pub fn object_path(
    category: UploadCategory,
    user_id: Uuid,
    filename: &str,
    now: OffsetDateTime,
) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!(
        "{}/{}/{}_{}",
        category,
        user_id,
        millis,
        sanitize_filename(filename)
    )
}

/// Writes objects below a local directory that is served at `public_base_url`.
pub struct LocalBlobStore {
    pub root: PathBuf,
    pub public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        category: UploadCategory,
        user_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, BlobStoreError> {
        if bytes.is_empty() {
            return Err(BlobStoreError::Empty);
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(BlobStoreError::TooLarge(MAX_UPLOAD_BYTES));
        }

        let path = object_path(category, user_id, filename, OffsetDateTime::now_utc());
        let target = self.root.join(&path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        info!(%user_id, %category, size = bytes.len(), %path, "stored upload");
        Ok(format!("{}/{}", self.public_base_url, path))
    }
}
