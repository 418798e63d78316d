//! Error responses.

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::_prelude::*;

/// Handler error: a bridge [`Error`] rendered as `{ "error": { "code", "message" } }`.
#[derive(Debug)]
pub struct ApiError(pub Error);
impl ApiError {
	/// HTTP status for the wrapped error.
	pub fn status_code(&self) -> StatusCode {
		match &self.0 {
			e if e.is_client_error() => StatusCode::BAD_REQUEST,
			Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		Self(e)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		let code = self.0.code();

		if status.is_server_error() {
			tracing::error!(code, error = ?self.0, "Request failed.");
		} else {
			tracing::debug!(code, error = %self.0, "Request rejected.");
		}

		let body = ErrorBody { error: ErrorDetail { code, message: self.0.to_string() } };

		(status, Json(body)).into_response()
	}
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
	/// Error detail.
	pub error: ErrorDetail,
}

/// Error detail for API responses.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
	/// Stable machine-readable code.
	pub code: &'static str,
	/// User-facing message; never carries upstream bodies.
	pub message: String,
}
