//! HTTP and WebSocket surface.
//!
//! - `GET /` - query the current view, optionally changing window and sort key
//! - `GET /ws` - receive a `{"tokens": [...]}` frame after every sweep

mod error;
mod handlers;

use axum::{routing::get, Router};

use crate::app::AppState;

pub use error::ApiError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::query_view))
        .route("/ws", get(handlers::observe))
        .with_state(state)
}
