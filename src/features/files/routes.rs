use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::path::Path;
use tower_http::services::ServeDir;

use crate::features::files::handlers::{
    create_file, create_import, delete_file, get_file, import_form, list_files, new_file_form,
    update_file, FilesState,
};
use crate::shared::constants::UPLOADS_URL_PREFIX;

/// Create routes for the files feature
///
/// `body_limit` caps multipart uploads and archive imports; the stored bytes are
/// served read-only under `/uploads`.
pub fn routes(state: FilesState, storage_root: &Path, body_limit: usize) -> Router {
    Router::new()
        .route("/files", get(list_files).post(create_file))
        .route("/files/new", get(new_file_form))
        .route("/files/import", get(import_form).post(create_import))
        .route(
            "/files/{id}",
            get(get_file).put(update_file).delete(delete_file),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(storage_root))
}
