mod dto;
pub mod handlers;
pub mod images;
pub mod model;
pub mod off;
pub mod repo;
pub mod service;
pub mod validation;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
