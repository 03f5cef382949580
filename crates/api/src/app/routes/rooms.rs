//! Per-room endpoints: stock, movements, opname, consumption, receipts.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use labstock_auth::Principal;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/:room/stock/:item", get(get_stock))
        .route("/:room/stock-events", get(list_stock_events))
        .route("/:room/opname", get(list_opname_records).post(submit_opname))
        .route("/:room/consumption", post(record_consumption))
        .route("/:room/receipts", get(list_receipts))
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path((room, item)): Path<(String, String)>,
) -> axum::response::Response {
    let room = match errors::parse_room(&room) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let item = match errors::parse_item(&item) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().compute_stock(&principal, &room, &item) {
        Ok(level) => (StatusCode::OK, Json(level)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_stock_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(room): Path<String>,
) -> axum::response::Response {
    let room = match errors::parse_room(&room) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().list_stock_events(&principal, &room) {
        Ok(facts) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "room": room,
                "count": facts.len(),
                "events": facts,
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn submit_opname(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(room): Path<String>,
    errors::JsonBody(body): errors::JsonBody<dto::SubmitOpnameRequest>,
) -> axum::response::Response {
    let room = match errors::parse_room(&room) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let input = match body.into_input() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().submit_opname(&principal, &room, input) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_opname_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(room): Path<String>,
) -> axum::response::Response {
    let room = match errors::parse_room(&room) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().list_opname_records(&principal, &room) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn record_consumption(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(room): Path<String>,
    errors::JsonBody(body): errors::JsonBody<dto::RecordConsumptionRequest>,
) -> axum::response::Response {
    let room = match errors::parse_room(&room) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let input = match body.into_input() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().record_consumption(&principal, &room, input) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_receipts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(room): Path<String>,
) -> axum::response::Response {
    let room = match errors::parse_room(&room) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().list_receipts(&principal, &room) {
        Ok(receipts) => (StatusCode::OK, Json(receipts)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
