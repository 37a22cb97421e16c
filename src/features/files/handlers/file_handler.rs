use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use minijinja::context;
use std::sync::Arc;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{ResponseFormat, ValidatedJson};
use crate::features::files::dtos::{
    DeleteFileResponseDto, FileResponseDto, ImportArchiveDto, ImportReportDto, UpdateFileDto,
    UploadFileDto,
};
use crate::features::files::services::{FileService, ImportService};
use crate::shared::constants::FILES_PAGE;
use crate::shared::types::ApiResponse;
use crate::shared::views::Views;

/// State for file handlers
#[derive(Clone)]
pub struct FilesState {
    pub file_service: Arc<FileService>,
    pub import_service: Arc<ImportService>,
    pub views: Arc<Views>,
}

/// Fields collected from a multipart form
#[derive(Debug, Default)]
struct UploadForm {
    file_data: Option<Vec<u8>>,
    file_name: Option<String>,
    name: Option<String>,
    recorded_at: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            debug!("Failed to read multipart field: {}", e);
            AppError::BadRequest(format!("Failed to read multipart data: {}", e))
        })? {
            let field_name = field.name().unwrap_or("").to_string();

            match field_name.as_str() {
                "file" => {
                    let fname = field
                        .file_name()
                        .map(|s| s.to_string())
                        .unwrap_or_default();

                    let data = field.bytes().await.map_err(|e| {
                        debug!("Failed to read file bytes: {}", e);
                        AppError::BadRequest(format!("Failed to read file data: {}", e))
                    })?;

                    form.file_data = Some(data.to_vec());
                    form.file_name = Some(fname);
                }
                "name" | "recorded_at" => {
                    let text = field.text().await.map_err(|e| {
                        AppError::BadRequest(format!("Failed to read {} field: {}", field_name, e))
                    })?;
                    let value = Some(text).filter(|t| !t.trim().is_empty());
                    if field_name == "name" {
                        form.name = value;
                    } else {
                        form.recorded_at = value;
                    }
                }
                _ => {
                    debug!("Ignoring unknown field: {}", field_name);
                }
            }
        }

        Ok(form)
    }

    fn take_file(&mut self) -> Result<(Vec<u8>, String)> {
        let data = self
            .file_data
            .take()
            .ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
        let name = self.file_name.take().unwrap_or_default();
        Ok((data, name))
    }
}

/// Route ids are numeric; anything else cannot name a record
fn parse_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound(format!("File with id={} not found", raw)))
}

/// List files
///
/// Renders the HTML listing for browsers; returns JSON when the caller accepts
/// `application/json` or passes `?format=json`.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    params(
        ("format" = Option<String>, Query, description = "Pass `json` to receive JSON instead of HTML")
    ),
    responses(
        (status = 200, description = "List of files", body = ApiResponse<Vec<FileResponseDto>>),
    )
)]
pub async fn list_files(
    State(state): State<FilesState>,
    format: ResponseFormat,
) -> Result<Response> {
    let files = state.file_service.list().await?;

    match format {
        ResponseFormat::Json => Ok(Json(ApiResponse::list(files)).into_response()),
        ResponseFormat::Html => {
            let html = state.views.render("files.html", context! { files => files })?;
            Ok(Html(html).into_response())
        }
    }
}

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `name`: Display name (optional, defaults to the filename)
/// - `recorded_at`: Capture time as `YYYY-MM-DDTHH:MM` (optional, defaults to now)
///
/// Browsers are redirected to `/files`; JSON callers receive the created record.
#[utoipa::path(
    post,
    path = "/files",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form with optional name and recorded_at fields",
    ),
    responses(
        (status = 201, description = "File uploaded (JSON callers)", body = ApiResponse<FileResponseDto>),
        (status = 303, description = "File uploaded, redirect to /files"),
        (status = 400, description = "Missing or invalid file"),
        (status = 409, description = "File exists and the collision policy is reject"),
        (status = 500, description = "Storage or database failure")
    )
)]
pub async fn create_file(
    State(state): State<FilesState>,
    format: ResponseFormat,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = UploadForm::read(multipart).await?;
    let (data, file_name) = form.take_file()?;

    let file = state
        .file_service
        .upload_file(data, &file_name, form.name, form.recorded_at)
        .await?;

    match format {
        ResponseFormat::Json => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(file), None, None)),
        )
            .into_response()),
        ResponseFormat::Html => Ok(Redirect::to(FILES_PAGE).into_response()),
    }
}

/// Import a ZIP archive
///
/// Every regular entry except `manifest.json` is extracted into the storage area and
/// recorded. Entries that fail are skipped; browsers are redirected to `/files`
/// regardless, JSON callers receive the import report.
#[utoipa::path(
    post,
    path = "/files/import",
    tag = "files",
    request_body(
        content = ImportArchiveDto,
        content_type = "multipart/form-data",
        description = "ZIP archive to import",
    ),
    responses(
        (status = 200, description = "Import finished (JSON callers)", body = ApiResponse<ImportReportDto>),
        (status = 303, description = "Import finished, redirect to /files"),
        (status = 400, description = "Missing file or invalid ZIP archive")
    )
)]
pub async fn create_import(
    State(state): State<FilesState>,
    format: ResponseFormat,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = UploadForm::read(multipart).await?;
    let (data, _) = form.take_file()?;

    let report = state.import_service.import_archive(data).await?;

    match format {
        ResponseFormat::Json => {
            Ok(Json(ApiResponse::success(Some(report), None, None)).into_response())
        }
        ResponseFormat::Html => Ok(Redirect::to(FILES_PAGE).into_response()),
    }
}

/// Get a file by id
#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File found", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file(
    State(state): State<FilesState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    let id = parse_id(&id)?;
    let file = state.file_service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(file), None, None)))
}

/// Update a file's metadata
///
/// Fields present in the body replace the stored values; absent fields are kept.
#[utoipa::path(
    put,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    request_body = UpdateFileDto,
    responses(
        (status = 200, description = "File updated", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Malformed body or empty name/path"),
        (status = 404, description = "File not found")
    )
)]
pub async fn update_file(
    State(state): State<FilesState>,
    Path(id): Path<String>,
    body: std::result::Result<ValidatedJson<UpdateFileDto>, AppError>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    // A non-numeric id is not found, whatever the body holds
    let id = parse_id(&id)?;
    let ValidatedJson(dto) = body?;
    let file = state.file_service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(file), None, None)))
}

/// Soft delete a file
#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted", body = ApiResponse<DeleteFileResponseDto>),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_file(
    State(state): State<FilesState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>> {
    let id = parse_id(&id)?;
    state.file_service.delete(id).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted: true }),
        Some("File deleted".to_string()),
        None,
    )))
}

/// Upload form page
pub async fn new_file_form(State(state): State<FilesState>) -> Result<Html<String>> {
    Ok(Html(state.views.render("new.html", context! {})?))
}

/// Import form page
pub async fn import_form(State(state): State<FilesState>) -> Result<Html<String>> {
    Ok(Html(state.views.render("import.html", context! {})?))
}
