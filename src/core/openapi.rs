use axum::{routing::get, Json, Router};
use utoipa::{Modify, OpenApi};

use crate::core::config::OpenApiConfig;
use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::{ApiResponse, Meta};

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    paths(
        files_handlers::list_files,
        files_handlers::create_file,
        files_handlers::create_import,
        files_handlers::get_file,
        files_handlers::update_file,
        files_handlers::delete_file,
    ),
    components(
        schemas(
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<Vec<files_dtos::FileResponseDto>>,
            ApiResponse<files_dtos::DeleteFileResponseDto>,
            ApiResponse<files_dtos::ImportReportDto>,
            Meta,
            files_dtos::UploadFileDto,
            files_dtos::ImportArchiveDto,
            files_dtos::FileResponseDto,
            files_dtos::UpdateFileDto,
            files_dtos::DeleteFileResponseDto,
            files_dtos::ImportFailureDto,
            files_dtos::ImportReportDto,
        )
    ),
    tags(
        (name = "files", description = "File upload, archive import and metadata management"),
    ),
    info(
        title = "File Manager API",
        version = "0.1.0",
        description = "API documentation for File Manager",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct ApiInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl From<&OpenApiConfig> for ApiInfoModifier {
    fn from(config: &OpenApiConfig) -> Self {
        Self {
            title: config.title.clone(),
            version: config.version.clone(),
            description: config.description.clone(),
        }
    }
}

impl Modify for ApiInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

/// Serve the generated document at [`OPENAPI_JSON_PATH`]
pub fn routes(config: &OpenApiConfig) -> Router {
    let mut openapi = ApiDoc::openapi();
    ApiInfoModifier::from(config).modify(&mut openapi);

    Router::new().route(
        OPENAPI_JSON_PATH,
        get(move || {
            let openapi = openapi.clone();
            async move { Json(openapi) }
        }),
    )
}
