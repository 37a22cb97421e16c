use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for a managed file
#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub recorded_at: DateTime<Utc>,
    pub uuid: String,
    pub duration: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Values for a record about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewFile {
    pub name: String,
    pub path: String,
    pub size: i64,
    pub recorded_at: DateTime<Utc>,
    pub uuid: String,
    pub duration: i64,
}

/// Replacement values for every mutable column of a record
#[derive(Debug, Clone, PartialEq)]
pub struct FileChanges {
    pub name: String,
    pub path: String,
    pub size: i64,
    pub recorded_at: DateTime<Utc>,
    pub uuid: String,
    pub duration: i64,
}

impl NewFile {
    /// A record with no external id and no known duration
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        size: i64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            recorded_at,
            uuid: String::new(),
            duration: 0,
        }
    }
}
