use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::json;

use labstock_core::{AggregateId, ItemCode, RoomCode};
use labstock_infra::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let status = match &err {
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::Authorization(_) => StatusCode::FORBIDDEN,
        LedgerError::StateConflict(_) => StatusCode::CONFLICT,
        LedgerError::NotFound => StatusCode::NOT_FOUND,
        LedgerError::Referential(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::Storage(msg) => {
            tracing::error!(error = %msg, "ledger storage failure");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.code(),
                "internal storage error",
            );
        }
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// `axum::Json` whose rejections use the `{"error","message"}` body.
///
/// Every body problem (syntax, shape, content type) is a 400 `invalid_body`,
/// keeping 422 for unresolved master data.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_error(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                rejection.body_text(),
            )),
        }
    }
}

pub fn parse_room(s: &str) -> Result<RoomCode, axum::response::Response> {
    RoomCode::new(s).map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_room", e.to_string()))
}

pub fn parse_item(s: &str) -> Result<ItemCode, axum::response::Response> {
    ItemCode::new(s).map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_item", e.to_string()))
}

pub fn parse_id(s: &str) -> Result<AggregateId, axum::response::Response> {
    s.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid record id"))
}

/// Calendar dates travel as `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, axum::response::Response> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_date",
            "date must be formatted as YYYY-MM-DD",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_ledger_error_to_a_status() {
        let cases = [
            (LedgerError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (LedgerError::StateConflict("x".into()), StatusCode::CONFLICT),
            (LedgerError::NotFound, StatusCode::NOT_FOUND),
            (LedgerError::Referential("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ledger_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn parses_path_values() {
        assert!(parse_room("LAB-A").is_ok());
        assert!(parse_room(" ").is_err());
        assert!(parse_date("2024-03-01").is_ok());
        assert!(parse_date("01/03/2024").is_err());
        assert!(parse_id("not-a-uuid").is_err());
    }
}
