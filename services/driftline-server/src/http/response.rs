use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use driftline_protocol::{error_codes, HttpErrorEnvelope};
use std::fmt::Display;

pub type HttpResponse = Response;
pub type HttpResult<T = ()> = Result<T, HttpResponse>;

pub(crate) fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> HttpResponse {
    (
        status,
        Json(HttpErrorEnvelope {
            code: code.into(),
            message: message.into(),
            details: None,
        }),
    )
        .into_response()
}

pub fn internal_error(err: impl Display) -> HttpResponse {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        error_codes::INTERNAL_ERROR,
        err.to_string(),
    )
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR, message)
}

pub fn unauthorized(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::UNAUTHORIZED, error_codes::UNAUTHORIZED, message)
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn assert_error_response(
        response: Response,
        expected_status: StatusCode,
        expected_code: &str,
    ) {
        assert_eq!(response.status(), expected_status);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: HttpErrorEnvelope = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.code, expected_code);
    }

    #[tokio::test]
    async fn bad_request_sets_validation_error_contract() {
        assert_error_response(
            bad_request("missing field"),
            StatusCode::BAD_REQUEST,
            error_codes::VALIDATION_ERROR,
        )
        .await;
    }

    #[tokio::test]
    async fn unauthorized_sets_unauthorized_contract() {
        assert_error_response(
            unauthorized("bad token"),
            StatusCode::UNAUTHORIZED,
            error_codes::UNAUTHORIZED,
        )
        .await;
    }

    #[tokio::test]
    async fn not_found_sets_not_found_contract() {
        assert_error_response(
            not_found("no match yet"),
            StatusCode::NOT_FOUND,
            error_codes::NOT_FOUND,
        )
        .await;
    }
}
