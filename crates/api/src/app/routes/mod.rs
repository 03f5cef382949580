use axum::{Router, routing::get};

pub mod procurement;
pub mod rooms;
pub mod system;
pub mod transfers;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .nest("/rooms", rooms::router())
        .nest("/transfers", transfers::router())
        .nest("/procurement", procurement::router())
}
