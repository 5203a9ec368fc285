//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use unimatch_core::ErrorKind;

/// An error returned by an API handler.
///
/// The JSON body carries a `kind` next to the message so that clients can
/// tell "not registered" from "invalid request" from "try again later".
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] unimatch_core::Error),
}

impl ApiError {
  fn status_and_kind(&self) -> (StatusCode, &'static str) {
    match self {
      ApiError::Core(e) => match e.kind() {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
        ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind) = self.status_and_kind();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string(), "kind": kind })))
      .into_response()
  }
}
