use axum::{extract::State, response::Html};
use minijinja::context;
use std::sync::Arc;

use crate::core::error::Result;
use crate::shared::views::Views;

/// Welcome page
pub async fn index(State(views): State<Arc<Views>>) -> Result<Html<String>> {
    Ok(Html(views.render("index.html", context! {})?))
}

/// Media player; the playlist is loaded client-side from `/files?format=json`
pub async fn player(State(views): State<Arc<Views>>) -> Result<Html<String>> {
    Ok(Html(views.render("player.html", context! {})?))
}
