use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use labstock_auth::Principal;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transfers).post(create_transfer))
        .route(
            "/:id",
            get(get_transfer).put(edit_transfer).delete(delete_transfer),
        )
        .route("/:id/approve", post(approve_transfer))
        .route("/:id/reject", post(reject_transfer))
}

pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    errors::JsonBody(body): errors::JsonBody<dto::CreateTransferRequest>,
) -> axum::response::Response {
    let input = match body.into_input() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().create_transfer(&principal, input) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn edit_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    errors::JsonBody(body): errors::JsonBody<dto::EditTransferRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let lines = match dto::requested_lines(body.lines) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().edit_transfer(&principal, id, lines) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().delete_transfer(&principal, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn approve_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    errors::JsonBody(body): errors::JsonBody<dto::ApproveTransferRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let lines = match body.into_lines() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().approve_transfer(&principal, id, lines) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn reject_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().reject_transfer(&principal, id) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().get_transfer(&principal, id) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<dto::RoomQuery>,
) -> axum::response::Response {
    let room = match query.room() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().list_transfers(&principal, room.as_ref()) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
