//! Standalone HTML pages: the welcome page at `/` and the media player at `/player`.

pub mod handlers;
pub mod routes;

pub use routes::routes;
