use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::files::models::{FileChanges, FileRecord};

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for OpenAPI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Display name, defaults to the uploaded filename
    #[schema(example = "Morning standup")]
    pub name: Option<String>,
    /// Capture time in `YYYY-MM-DDTHH:MM`; defaults to now when absent or unparsable
    #[schema(example = "2024-03-01T10:00")]
    pub recorded_at: Option<String>,
}

/// Archive import request DTO for OpenAPI documentation
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ImportArchiveDto {
    /// ZIP archive; every regular entry except `manifest.json` becomes a file
    #[schema(format = Binary, content_media_type = "application/zip")]
    pub file: String,
}

/// Response DTO for file operations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    /// Unique identifier for the file
    pub id: i64,
    /// Display name
    pub name: String,
    /// Storage location of the file's bytes
    pub path: String,
    /// URL serving the bytes, when the path lies inside the storage area
    pub url: Option<String>,
    /// Size of the file in bytes at creation time
    pub size: i64,
    /// When the content was captured
    pub recorded_at: DateTime<Utc>,
    /// External identifier, empty unless imported with a manifest
    pub uuid: String,
    /// Media duration in seconds
    pub duration: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileResponseDto {
    pub fn from_record(record: FileRecord, url: Option<String>) -> Self {
        Self {
            id: record.id,
            name: record.name,
            path: record.path,
            url,
            size: record.size,
            recorded_at: record.recorded_at,
            uuid: record.uuid,
            duration: record.duration,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Request DTO for updating a file's metadata.
///
/// Fields present in the body replace the stored values; absent fields keep them.
/// Read-only fields such as `id` or `created_at` are ignored if present.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFileDto {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "path must not be empty"))]
    pub path: Option<String>,
    #[validate(range(min = 0, message = "size must not be negative"))]
    pub size: Option<i64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub uuid: Option<String>,
    #[validate(range(min = 0, message = "duration must not be negative"))]
    pub duration: Option<i64>,
}

impl UpdateFileDto {
    /// Merge the supplied fields over a stored record
    pub fn merge_into(self, record: &FileRecord) -> FileChanges {
        FileChanges {
            name: self.name.unwrap_or_else(|| record.name.clone()),
            path: self.path.unwrap_or_else(|| record.path.clone()),
            size: self.size.unwrap_or(record.size),
            recorded_at: self.recorded_at.unwrap_or(record.recorded_at),
            uuid: self.uuid.unwrap_or_else(|| record.uuid.clone()),
            duration: self.duration.unwrap_or(record.duration),
        }
    }
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    /// Confirmation that the file was deleted
    pub deleted: bool,
}

/// One archive entry that could not be imported
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportFailureDto {
    /// Entry name inside the archive
    pub entry: String,
    pub reason: String,
}

/// Outcome of an archive import
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ImportReportDto {
    /// Number of records created
    pub imported: usize,
    /// Directory entries and the manifest
    pub skipped: usize,
    /// Entries that failed extraction or record creation
    pub failed: usize,
    /// Ids of the created records, in archive order
    pub record_ids: Vec<i64>,
    pub failures: Vec<ImportFailureDto>,
}

impl ImportReportDto {
    pub fn record_failure(&mut self, entry: impl Into<String>, reason: impl Into<String>) {
        self.failed += 1;
        self.failures.push(ImportFailureDto {
            entry: entry.into(),
            reason: reason.into(),
        });
    }
}
