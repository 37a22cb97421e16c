//! File management feature.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/files` | List files (HTML, or JSON with `Accept: application/json`) |
//! | POST | `/files` | Upload a single file (multipart) |
//! | GET | `/files/new` | Upload form |
//! | GET | `/files/import` | Import form |
//! | POST | `/files/import` | Import a ZIP archive (multipart) |
//! | GET | `/files/{id}` | Get one file |
//! | PUT | `/files/{id}` | Replace a file's metadata |
//! | DELETE | `/files/{id}` | Soft delete a file |
//! | GET | `/uploads/{path}` | Raw bytes from the storage area |

pub mod dtos;
pub mod enrichers;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use handlers::FilesState;
pub use routes::routes;
pub use services::{FileService, FileStore, ImportService};
