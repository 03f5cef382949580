use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use labstock_auth::Principal;

use crate::app::dto::RoomQuery;
use crate::app::services::{self, AppServices};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().to_string(),
        "roles": principal.roles().iter().map(|r| r.name()).collect::<Vec<_>>(),
        "rooms": principal.operated_rooms(),
        "admin": principal.is_admin(),
    }))
}

/// Server-sent feed of committed ledger events, optionally for one room.
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<RoomQuery>,
) -> axum::response::Response {
    if let Err(e) = principal.require(&labstock_auth::Capability::ReadLedger) {
        return crate::app::errors::ledger_error_to_response(e.into());
    }
    let room = match query.room() {
        Ok(room) => room,
        Err(resp) => return resp,
    };
    services::realtime_sse_stream(services, room).into_response()
}
