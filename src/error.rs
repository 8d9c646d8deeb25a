// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error responses.
//!
//! Maps the service error taxonomy onto status codes and a JSON body with a
//! machine-readable `error_code`. Nonce and signature failures on the SIWE
//! endpoint are NOT represented here — that endpoint reports them in its
//! own `{status, isValid, message}` envelope with a 200 status, matching
//! what existing clients expect. Remote-store failures are recovered by the
//! repository and never reach this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Malformed request body or a value outside its documented range.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    /// Missing or invalid session cookie on a protected endpoint.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_code() {
        let v = ApiError::validation("score out of range");
        assert_eq!(v.status, StatusCode::BAD_REQUEST);
        assert_eq!(v.code, "validation_error");

        let u = ApiError::unauthorized("no session");
        assert_eq!(u.status, StatusCode::UNAUTHORIZED);
        assert_eq!(u.code, "unauthorized");

        let i = ApiError::internal("boom");
        assert_eq!(i.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(i.code, "internal_error");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::validation("Invalid score value").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Invalid score value");
        assert_eq!(body["error_code"], "validation_error");
    }
}
