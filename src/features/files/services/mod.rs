mod file_service;
mod file_store;
mod import_service;

pub use file_service::{resolve_recorded_at, FileService};
pub use file_store::FileStore;
pub use import_service::ImportService;
