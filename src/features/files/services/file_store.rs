use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::core::error::{AppError, Result};
use crate::features::files::models::{FileChanges, FileRecord, NewFile};

const CREATE_FILES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        path TEXT NOT NULL,
        size INTEGER NOT NULL,
        recorded_at TEXT NOT NULL,
        uuid TEXT NOT NULL DEFAULT '',
        duration INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )
"#;

const CREATE_DELETED_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_files_deleted_at ON files (deleted_at)";

const SELECT_COLUMNS: &str =
    "id, name, path, size, recorded_at, uuid, duration, created_at, updated_at, deleted_at";

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("File with id={} not found", id))
}

/// Record store for the `files` table.
///
/// Deleted rows stay in the table with `deleted_at` set and are invisible to every
/// read and write below.
#[derive(Clone)]
pub struct FileStore {
    pool: SqlitePool,
}

impl FileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Ensure the table exists; safe to call on every startup
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(CREATE_FILES_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_DELETED_AT_INDEX)
            .execute(&self.pool)
            .await?;

        debug!("files table ready");
        Ok(())
    }

    /// Insert a record and return its id
    pub async fn create(&self, file: &NewFile) -> Result<i64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO files (name, path, size, recorded_at, uuid, duration, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.name)
        .bind(&file.path)
        .bind(file.size)
        .bind(file.recorded_at)
        .bind(&file.uuid)
        .bind(file.duration)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert file {}: {:?}", file.path, e);
            AppError::Database(e)
        })?;

        let id = result.last_insert_rowid();
        info!("File record created: id={}, path={}, size={}", id, file.path, file.size);

        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<FileRecord> {
        let sql = format!(
            "SELECT {} FROM files WHERE id = ? AND deleted_at IS NULL",
            SELECT_COLUMNS
        );

        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// All active records in id order
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files WHERE deleted_at IS NULL ORDER BY id",
            SELECT_COLUMNS
        );

        sqlx::query_as::<_, FileRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list files: {:?}", e);
                AppError::Database(e)
            })
    }

    /// Replace every mutable field of an active record
    pub async fn update(&self, id: i64, changes: &FileChanges) -> Result<FileRecord> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET name = ?, path = ?, size = ?, recorded_at = ?, uuid = ?, duration = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.path)
        .bind(changes.size)
        .bind(changes.recorded_at)
        .bind(&changes.uuid)
        .bind(changes.duration)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        info!("File record updated: id={}", id);
        self.get(id).await
    }

    /// Soft delete: mark the record so it disappears from reads
    pub async fn delete(&self, id: i64) -> Result<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE files
            SET deleted_at = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        info!("File record soft deleted: id={}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::create_memory_pool;
    use chrono::{Duration, TimeZone};

    async fn store() -> FileStore {
        let store = FileStore::new(create_memory_pool().await);
        store.initialize().await.unwrap();
        store
    }

    fn sample(name: &str) -> NewFile {
        let recorded_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        NewFile::new(name, format!("uploads/{}", name), 42, recorded_at)
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = store().await;
        store.initialize().await.unwrap();
        store.create(&sample("a.mp4")).await.unwrap();
        store.initialize().await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = store().await;
        let new_file = sample("clip.mp4");
        let id = store.create(&new_file).await.unwrap();

        let record = store.get(id).await.unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.name, new_file.name);
        assert_eq!(record.path, new_file.path);
        assert_eq!(record.size, new_file.size);
        assert_eq!(record.recorded_at, new_file.recorded_at);
        assert_eq!(record.uuid, "");
        assert_eq!(record.duration, 0);
        assert!(record.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let store = store().await;
        let a = store.create(&sample("a.mp4")).await.unwrap();
        let b = store.create(&sample("b.mp4")).await.unwrap();
        let c = store.create(&sample("c.mp4")).await.unwrap();

        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_update_replaces_all_mutable_fields() {
        let store = store().await;
        let id = store.create(&sample("clip.mp4")).await.unwrap();
        let before = store.get(id).await.unwrap();

        let changes = FileChanges {
            name: "Renamed".to_string(),
            path: "uploads/other.mp4".to_string(),
            size: 7,
            recorded_at: before.recorded_at + Duration::days(1),
            uuid: "ext-1".to_string(),
            duration: 90,
        };
        let updated = store.update(id, &changes).await.unwrap();

        assert_eq!(updated.name, changes.name);
        assert_eq!(updated.path, changes.path);
        assert_eq!(updated.size, changes.size);
        assert_eq!(updated.recorded_at, changes.recorded_at);
        assert_eq!(updated.uuid, changes.uuid);
        assert_eq!(updated.duration, changes.duration);
        assert_eq!(updated.created_at, before.created_at);
        assert!(updated.updated_at >= before.updated_at);

        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.name, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_hides_record() {
        let store = store().await;
        let keep = store.create(&sample("keep.mp4")).await.unwrap();
        let gone = store.create(&sample("gone.mp4")).await.unwrap();

        store.delete(gone).await.unwrap();

        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![keep]);
        assert!(matches!(store.get(gone).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.delete(gone).await, Err(AppError::NotFound(_))));

        let changes = FileChanges {
            name: "x".to_string(),
            path: "uploads/x".to_string(),
            size: 1,
            recorded_at: Utc::now(),
            uuid: String::new(),
            duration: 0,
        };
        assert!(matches!(
            store.update(gone, &changes).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = store().await;
        let first = store.create(&sample("a.mp4")).await.unwrap();
        store.delete(first).await.unwrap();
        let second = store.create(&sample("b.mp4")).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let store = store().await;
        assert!(matches!(store.get(999).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.delete(999).await, Err(AppError::NotFound(_))));
    }
}
