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
        .route("/", get(list_requests).post(create_request))
        .route(
            "/:id",
            get(get_request).put(edit_request).delete(delete_request),
        )
        .route("/:id/dispatch", post(dispatch_request))
        .route("/:id/acknowledge", post(acknowledge_request))
}

pub async fn create_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    errors::JsonBody(body): errors::JsonBody<dto::CreateProcurementRequest>,
) -> axum::response::Response {
    let input = match body.into_input() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().create_procurement_request(&principal, input) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn edit_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    errors::JsonBody(body): errors::JsonBody<dto::EditProcurementRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let lines = match dto::requested_items(body.lines) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().edit_procurement_request(&principal, id, lines) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().delete_procurement_request(&principal, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn dispatch_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    errors::JsonBody(body): errors::JsonBody<dto::QuantityLinesRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let lines = match body.into_lines() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().dispatch_procurement_request(&principal, id, lines) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn acknowledge_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    errors::JsonBody(body): errors::JsonBody<dto::QuantityLinesRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let lines = match body.into_lines() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .acknowledge_procurement_request(&principal, id, lines)
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().get_procurement_request(&principal, id) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<dto::RoomQuery>,
) -> axum::response::Response {
    let room = match query.room() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .list_procurement_requests(&principal, room.as_ref())
    {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
