use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::pages::handlers;
use crate::shared::views::Views;

/// Create routes for the standalone HTML pages
pub fn routes(views: Arc<Views>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/player", get(handlers::player))
        .with_state(views)
}
