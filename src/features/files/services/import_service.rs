use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::ImportReportDto;
use crate::features::files::enrichers::{Manifest, ManifestEnricher, MetadataEnricher};
use crate::features::files::models::NewFile;
use crate::features::files::services::FileStore;
use crate::modules::storage::LocalStorage;
use crate::shared::constants::MANIFEST_FILE_NAME;

/// An archive entry that made it to disk
#[derive(Debug)]
struct ExtractedEntry {
    name: String,
    path: PathBuf,
    size: u64,
    extracted_at: DateTime<Utc>,
}

/// Result of the blocking half of an import
#[derive(Debug, Default)]
struct Extraction {
    entries: Vec<ExtractedEntry>,
    manifest: Option<Manifest>,
    report: ImportReportDto,
}

/// Service for bulk imports from ZIP archives.
///
/// Imports are best-effort: an entry that cannot be extracted or recorded is reported
/// in the [`ImportReportDto`] and the remaining entries are still processed.
pub struct ImportService {
    store: FileStore,
    storage: Arc<LocalStorage>,
    use_manifest: bool,
    temp_dir: PathBuf,
}

impl ImportService {
    pub fn new(store: FileStore, storage: Arc<LocalStorage>, use_manifest: bool) -> Self {
        Self {
            store,
            storage,
            use_manifest,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Directory for the temporary copy of uploaded archives
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Import every regular entry of a ZIP archive
    ///
    /// # Errors
    /// `BadRequest` when the bytes are not a readable archive; `Internal` when the
    /// temporary copy cannot be written. Per-entry problems never fail the call.
    pub async fn import_archive(&self, data: Vec<u8>) -> Result<ImportReportDto> {
        let storage = Arc::clone(&self.storage);
        let use_manifest = self.use_manifest;
        let temp_dir = self.temp_dir.clone();

        let extraction = tokio::task::spawn_blocking(move || {
            extract_archive(&storage, &temp_dir, &data, use_manifest)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Import task failed: {}", e)))??;

        let Extraction {
            entries,
            manifest,
            mut report,
        } = extraction;

        let enricher = manifest.map(ManifestEnricher::new);

        for entry in entries {
            let mut new_file = NewFile::new(
                entry.name.clone(),
                entry.path.to_string_lossy(),
                entry.size as i64,
                entry.extracted_at,
            );

            if let Some(enricher) = &enricher {
                enricher.enrich(&entry.name, &mut new_file);
            }

            match self.store.create(&new_file).await {
                Ok(id) => {
                    report.imported += 1;
                    report.record_ids.push(id);
                }
                Err(e) => {
                    warn!("Failed to record imported entry {}: {}", entry.name, e);
                    report.record_failure(entry.name, e.to_string());
                }
            }
        }

        info!(
            "Archive import finished: imported={}, skipped={}, failed={}",
            report.imported, report.skipped, report.failed
        );

        Ok(report)
    }
}

/// Copy the upload to a temp file, open it as an archive and extract its entries.
///
/// The temp file is removed when this function returns, on every path.
fn extract_archive(
    storage: &LocalStorage,
    temp_dir: &Path,
    data: &[u8],
    use_manifest: bool,
) -> Result<Extraction> {
    let mut temp = tempfile::Builder::new()
        .prefix("import_")
        .suffix(".zip")
        .tempfile_in(temp_dir)
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;
    temp.write_all(data)
        .and_then(|_| temp.flush())
        .map_err(|e| AppError::Internal(format!("Failed to write temp file: {}", e)))?;

    let file = temp
        .reopen()
        .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {}", e)))?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        debug!("Rejecting archive: {}", e);
        AppError::BadRequest("Invalid ZIP file".to_string())
    })?;

    let mut extraction = Extraction::default();
    if use_manifest {
        extraction.manifest = read_manifest(&mut archive);
    }

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                extraction
                    .report
                    .record_failure(format!("#{}", index), e.to_string());
                continue;
            }
        };

        let name = entry.name().to_string();
        if entry.is_dir() || name == MANIFEST_FILE_NAME {
            extraction.report.skipped += 1;
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping archive entry outside the storage root: {}", name);
            extraction
                .report
                .record_failure(name, "entry path escapes the storage root");
            continue;
        };

        let written = storage
            .create(&relative)
            .map_err(|e| e.to_string())
            .and_then(|(mut out, path)| {
                io::copy(&mut entry, &mut out)
                    .and_then(|_| out.flush())
                    .map(|_| path)
                    .map_err(|e| e.to_string())
            });

        match written {
            Ok(path) => {
                debug!("Extracted {} to {}", name, path.display());
                extraction.entries.push(ExtractedEntry {
                    name,
                    path,
                    size: entry.size(),
                    extracted_at: Utc::now(),
                });
            }
            Err(reason) => {
                warn!("Failed to extract archive entry {}: {}", name, reason);
                extraction.report.record_failure(name, reason);
            }
        }
    }

    Ok(extraction)
}

fn read_manifest(archive: &mut ZipArchive<File>) -> Option<Manifest> {
    let mut entry = archive.by_name(MANIFEST_FILE_NAME).ok()?;

    let mut bytes = Vec::new();
    if let Err(e) = entry.read_to_end(&mut bytes) {
        warn!("Failed to read {}: {}", MANIFEST_FILE_NAME, e);
        return None;
    }

    match Manifest::from_slice(&bytes) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!("Ignoring malformed {}: {}", MANIFEST_FILE_NAME, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::create_memory_pool;
    use crate::features::files::models::FileRecord;
    use crate::modules::storage::CollisionPolicy;
    use std::io::Cursor;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        store: FileStore,
        service: ImportService,
    }

    async fn fixture(use_manifest: bool) -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("uploads");
        let storage = LocalStorage::new(&root, CollisionPolicy::Overwrite);
        storage.ensure_root().unwrap();

        let store = FileStore::new(create_memory_pool().await);
        store.initialize().await.unwrap();
        let service = ImportService::new(store.clone(), Arc::new(storage), use_manifest);

        Fixture {
            _dir: dir,
            root,
            store,
            service,
        }
    }

    fn build_zip(files: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for dir in dirs {
            writer.add_directory(*dir, options).unwrap();
        }
        for (name, data) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    async fn names(store: &FileStore) -> Vec<String> {
        let mut names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r: FileRecord| r.name)
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_import_skips_manifest_and_directories() {
        let fx = fixture(false).await;
        let archive = build_zip(
            &[
                ("a.mp4", b"aaaa"),
                ("clips/b.mp4", b"bb"),
                ("c.txt", b"c"),
                ("manifest.json", b"{}"),
            ],
            &["clips/"],
        );

        let report = fx.service.import_archive(archive).await.unwrap();

        assert_eq!(report.imported, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(names(&fx.store).await, vec!["a.mp4", "c.txt", "clips/b.mp4"]);
        assert!(!fx.root.join("manifest.json").exists());
    }

    #[tokio::test]
    async fn test_imported_records_describe_extracted_files() {
        let fx = fixture(false).await;
        let before = Utc::now();
        let report = fx
            .service
            .import_archive(build_zip(&[("clips/b.mp4", b"hello world")], &[]))
            .await
            .unwrap();

        let record = fx.store.get(report.record_ids[0]).await.unwrap();
        let on_disk = fx.root.join("clips").join("b.mp4");
        assert_eq!(record.name, "clips/b.mp4");
        assert_eq!(PathBuf::from(&record.path), on_disk);
        assert_eq!(record.size, 11);
        assert_eq!(record.duration, 0);
        assert_eq!(record.uuid, "");
        assert!(record.recorded_at >= before);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_failed_entry_does_not_stop_the_batch() {
        let fx = fixture(false).await;
        // A regular file where a directory is needed makes extraction fail
        std::fs::write(fx.root.join("blocked"), b"not a dir").unwrap();

        let archive = build_zip(
            &[
                ("first.txt", b"1"),
                ("blocked/inner.txt", b"2"),
                ("last.txt", b"3"),
            ],
            &[],
        );
        let report = fx.service.import_archive(archive).await.unwrap();

        assert_eq!(report.imported, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].entry, "blocked/inner.txt");
        assert_eq!(names(&fx.store).await, vec!["first.txt", "last.txt"]);
    }

    #[tokio::test]
    async fn test_entries_escaping_root_are_refused() {
        let fx = fixture(false).await;
        let archive = build_zip(&[("../escape.txt", b"x"), ("ok.txt", b"y")], &[]);

        let report = fx.service.import_archive(archive).await.unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.failed, 1);
        assert!(!fx.root.parent().unwrap().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_invalid_archive_is_bad_request() {
        let fx = fixture(false).await;
        let result = fx.service.import_archive(b"definitely not a zip".to_vec()).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(names(&fx.store).await.is_empty());
    }

    #[tokio::test]
    async fn test_manifest_metadata_applied_when_enabled() {
        let fx = fixture(true).await;
        let manifest = br#"{"a.mp4": {"uuid": "u-1", "recorded_at": "2024-03-01T10:00:00Z", "duration": 30}}"#;
        let archive = build_zip(&[("manifest.json", manifest), ("a.mp4", b"a")], &[]);

        let report = fx.service.import_archive(archive).await.unwrap();
        let record = fx.store.get(report.record_ids[0]).await.unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(record.uuid, "u-1");
        assert_eq!(record.duration, 30);
        assert_eq!(record.recorded_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[tokio::test]
    async fn test_manifest_ignored_when_disabled() {
        let fx = fixture(false).await;
        let manifest = br#"{"a.mp4": {"uuid": "u-1", "duration": 30}}"#;
        let archive = build_zip(&[("manifest.json", manifest), ("a.mp4", b"a")], &[]);

        let report = fx.service.import_archive(archive).await.unwrap();
        let record = fx.store.get(report.record_ids[0]).await.unwrap();

        assert_eq!(record.uuid, "");
        assert_eq!(record.duration, 0);
    }

    #[test]
    fn test_temp_file_removed_after_extraction() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"), CollisionPolicy::Overwrite);
        storage.ensure_root().unwrap();
        let temp_dir = dir.path().join("tmp");
        std::fs::create_dir(&temp_dir).unwrap();

        let archive = build_zip(&[("a.txt", b"a")], &[]);
        extract_archive(&storage, &temp_dir, &archive, false).unwrap();
        assert!(extract_archive(&storage, &temp_dir, b"garbage", false).is_err());

        assert_eq!(std::fs::read_dir(&temp_dir).unwrap().count(), 0);
    }
}
