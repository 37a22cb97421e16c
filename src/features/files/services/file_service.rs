use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::{FileResponseDto, UpdateFileDto};
use crate::features::files::models::{FileRecord, NewFile};
use crate::features::files::services::FileStore;
use crate::modules::storage::{upload_file_name, LocalStorage};
use crate::shared::constants::RECORDED_AT_FORMAT;

/// Parse a `recorded_at` form value, falling back to `now`.
///
/// Missing, blank and unparsable values are all treated as absent.
pub fn resolve_recorded_at(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };

    match NaiveDateTime::parse_from_str(raw, RECORDED_AT_FORMAT) {
        Ok(naive) => Utc.from_utc_datetime(&naive),
        Err(e) => {
            debug!("Ignoring unparsable recorded_at '{}': {}", raw, e);
            now
        }
    }
}

/// Service for single-file uploads and record queries
pub struct FileService {
    store: FileStore,
    storage: Arc<LocalStorage>,
}

impl FileService {
    pub fn new(store: FileStore, storage: Arc<LocalStorage>) -> Self {
        Self { store, storage }
    }

    fn to_dto(&self, record: FileRecord) -> FileResponseDto {
        let url = self.storage.public_url(&record.path);
        FileResponseDto::from_record(record, url)
    }

    /// Store an uploaded file and create its record
    ///
    /// # Arguments
    /// * `data` - The file content as bytes
    /// * `original_filename` - The filename reported by the client
    /// * `name` - Optional display name, defaults to the filename
    /// * `recorded_at` - Optional capture time in `YYYY-MM-DDTHH:MM`
    pub async fn upload_file(
        &self,
        data: Vec<u8>,
        original_filename: &str,
        name: Option<String>,
        recorded_at: Option<String>,
    ) -> Result<FileResponseDto> {
        let file_name = upload_file_name(original_filename)
            .ok_or_else(|| {
                AppError::BadRequest(format!("Invalid file name: '{}'", original_filename))
            })?
            .to_string();
        let size = data.len() as i64;

        let storage = Arc::clone(&self.storage);
        let relative = PathBuf::from(&file_name);
        let stored_path = tokio::task::spawn_blocking(move || storage.write(&relative, &data))
            .await
            .map_err(|e| AppError::Internal(format!("Upload task failed: {}", e)))??;

        debug!("File written to storage: {}", stored_path.display());

        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| file_name.clone());
        let recorded_at = resolve_recorded_at(recorded_at.as_deref(), Utc::now());

        let new_file = NewFile::new(
            name,
            stored_path.to_string_lossy(),
            size,
            recorded_at,
        );
        let id = self.store.create(&new_file).await?;

        info!("File uploaded: id={}, name={}, size={}", id, new_file.name, size);

        let record = self.store.get(id).await?;
        Ok(self.to_dto(record))
    }

    pub async fn list(&self) -> Result<Vec<FileResponseDto>> {
        let records = self.store.list().await?;
        Ok(records.into_iter().map(|r| self.to_dto(r)).collect())
    }

    pub async fn get(&self, id: i64) -> Result<FileResponseDto> {
        let record = self.store.get(id).await?;
        Ok(self.to_dto(record))
    }

    /// Apply the fields present in `dto`; the rest keep their stored values
    pub async fn update(&self, id: i64, dto: UpdateFileDto) -> Result<FileResponseDto> {
        let current = self.store.get(id).await?;
        let changes = dto.merge_into(&current);

        let record = self.store.update(id, &changes).await?;
        Ok(self.to_dto(record))
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store.get(id).await?;
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::create_memory_pool;
    use crate::modules::storage::CollisionPolicy;
    use tempfile::TempDir;

    async fn service(policy: CollisionPolicy) -> (TempDir, FileService) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"), policy);
        storage.ensure_root().unwrap();

        let store = FileStore::new(create_memory_pool().await);
        store.initialize().await.unwrap();

        (dir, FileService::new(store, Arc::new(storage)))
    }

    #[test]
    fn test_resolve_recorded_at() {
        let now = Utc::now();
        let parsed = resolve_recorded_at(Some("2024-03-01T10:00"), now);
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());

        assert_eq!(resolve_recorded_at(None, now), now);
        assert_eq!(resolve_recorded_at(Some(""), now), now);
        assert_eq!(resolve_recorded_at(Some("yesterday"), now), now);
        assert_eq!(resolve_recorded_at(Some("2024-03-01 10:00"), now), now);
    }

    #[tokio::test]
    async fn test_upload_defaults_name_to_filename() {
        let (_dir, service) = service(CollisionPolicy::Overwrite).await;
        let file = service
            .upload_file(b"hello".to_vec(), "clip.mp4", None, None)
            .await
            .unwrap();

        assert_eq!(file.name, "clip.mp4");
        assert_eq!(file.size, 5);
        assert!(file.path.ends_with("clip.mp4"));
        assert_eq!(file.url.as_deref(), Some("/uploads/clip.mp4"));
        assert_eq!(std::fs::read(&file.path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_upload_uses_supplied_name_and_recorded_at() {
        let (_dir, service) = service(CollisionPolicy::Overwrite).await;
        let file = service
            .upload_file(
                b"hello".to_vec(),
                "clip.mp4",
                Some("Standup".to_string()),
                Some("2024-03-01T10:00".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(file.name, "Standup");
        assert_eq!(
            file.recorded_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_upload_with_unparsable_recorded_at_uses_now() {
        let (_dir, service) = service(CollisionPolicy::Overwrite).await;
        let before = Utc::now();
        let file = service
            .upload_file(b"x".to_vec(), "a.txt", None, Some("not a date".to_string()))
            .await
            .unwrap();
        let after = Utc::now();

        assert!(file.recorded_at >= before && file.recorded_at <= after);
    }

    #[tokio::test]
    async fn test_upload_same_name_overwrites_bytes() {
        let (_dir, service) = service(CollisionPolicy::Overwrite).await;
        let first = service
            .upload_file(b"first".to_vec(), "a.txt", None, None)
            .await
            .unwrap();
        let second = service
            .upload_file(b"second!".to_vec(), "a.txt", None, None)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.path, second.path);
        assert_eq!(std::fs::read(&second.path).unwrap(), b"second!");
    }

    #[tokio::test]
    async fn test_upload_rejected_on_collision_creates_no_record() {
        let (_dir, service) = service(CollisionPolicy::Reject).await;
        service
            .upload_file(b"first".to_vec(), "a.txt", None, None)
            .await
            .unwrap();
        let result = service
            .upload_file(b"second".to_vec(), "a.txt", None, None)
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_invalid_filename() {
        let (_dir, service) = service(CollisionPolicy::Overwrite).await;
        let result = service.upload_file(b"x".to_vec(), "../", None, None).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_id() {
        let (_dir, service) = service(CollisionPolicy::Overwrite).await;
        let dto = UpdateFileDto {
            name: Some("x".to_string()),
            ..Default::default()
        };

        assert!(matches!(service.get(7).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.update(7, dto).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete(7).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_fields_missing_from_body() {
        let (_dir, service) = service(CollisionPolicy::Overwrite).await;

        let mut imported = NewFile::new("a.mp4", "uploads/a.mp4", 10, Utc::now());
        imported.uuid = "ext-1".to_string();
        imported.duration = 30;
        let id = service.store.create(&imported).await.unwrap();
        let before = service.get(id).await.unwrap();

        let dto = UpdateFileDto {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = service.update(id, dto).await.unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.uuid, "ext-1");
        assert_eq!(updated.duration, 30);
        assert_eq!(updated.path, before.path);
        assert_eq!(updated.size, before.size);
        assert_eq!(updated.recorded_at, before.recorded_at);
    }

    #[tokio::test]
    async fn test_update_replaces_supplied_fields() {
        let (_dir, service) = service(CollisionPolicy::Overwrite).await;
        let file = service
            .upload_file(b"abc".to_vec(), "a.txt", None, None)
            .await
            .unwrap();

        let recorded_at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let dto = UpdateFileDto {
            name: Some("Clip".to_string()),
            path: Some("uploads/b.txt".to_string()),
            size: Some(9),
            recorded_at: Some(recorded_at),
            uuid: Some("ext-2".to_string()),
            duration: Some(12),
        };
        let updated = service.update(file.id, dto).await.unwrap();

        assert_eq!(updated.name, "Clip");
        assert_eq!(updated.path, "uploads/b.txt");
        assert_eq!(updated.size, 9);
        assert_eq!(updated.recorded_at, recorded_at);
        assert_eq!(updated.uuid, "ext-2");
        assert_eq!(updated.duration, 12);
    }
}
