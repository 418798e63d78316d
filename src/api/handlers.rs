//! Route handlers. Each one parses its input, delegates to the linker or the relay, and maps
//! the outcome to a status code.

// crates.io
use axum::{
	Json,
	extract::{Path, Query, State, rejection::JsonRejection},
	http::{StatusCode, header::LOCATION},
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*,
	api::{ApiError, AppState},
	flows::LinkStatus,
	relay::{DeliveryReceipt, RelayRequest, TargetKind},
};

/// `GET /link` query.
#[derive(Debug, Default, Deserialize)]
pub struct InitiateQuery {
	/// Correlation token to link.
	pub correlation: Option<String>,
}

/// `GET /link/callback` query as sent by the authorization page.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
	/// Authorization code.
	pub code: Option<String>,
	/// Correlation token embedded at initiation.
	pub correlation: Option<String>,
	/// OAuth error, set when the user declined.
	pub error: Option<String>,
	/// OAuth error description.
	pub error_description: Option<String>,
}

/// `GET /health`.
pub async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /link`: 302 to the authorization page.
pub async fn initiate(
	State(state): State<AppState>,
	Query(query): Query<InitiateQuery>,
) -> Result<Response, ApiError> {
	let redirect = state.linker.initiate(query.correlation.as_deref())?;

	Ok((StatusCode::FOUND, [(LOCATION, redirect.authorize_url.to_string())]).into_response())
}

/// `GET /link/callback`: completes the link and answers with a plain-text confirmation.
pub async fn callback(
	State(state): State<AppState>,
	Query(query): Query<CallbackQuery>,
) -> Result<String, ApiError> {
	if let Some(reason) = query.error {
		tracing::info!(
			correlation = query.correlation.as_deref().unwrap_or_default(),
			reason = %reason,
			description = query.error_description.as_deref().unwrap_or_default(),
			"Authorization declined."
		);

		return Err(Error::AuthorizationDenied { reason }.into());
	}

	let confirmation = tokio::time::timeout(
		state.upstream_timeout,
		state.linker.callback(query.code.as_deref(), query.correlation.as_deref()),
	)
	.await
	.map_err(|_| Error::Timeout { operation: "link callback" })??;

	Ok(confirmation.message)
}

/// `GET /link/status/{token}`.
pub async fn status(
	State(state): State<AppState>,
	Path(token): Path<String>,
) -> Result<Json<LinkStatus>, ApiError> {
	Ok(Json(state.linker.status(&token).await?))
}

/// `POST /relay`: JSON receipt on delivery.
pub async fn relay(
	State(state): State<AppState>,
	payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<DeliveryReceipt>, ApiError> {
	Ok(Json(dispatch(&state, payload).await?))
}

/// `POST /send`: older clients post `{ userId, message }` and expect a plain-text answer.
///
/// `userId` is always a raw chat identity here; the store is never consulted.
pub async fn send(
	State(state): State<AppState>,
	payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
	let payload = payload.map(|Json(request)| Json(request.via(TargetKind::Identity)));

	dispatch(&state, payload).await?;

	Ok("Message sent successfully!")
}

async fn dispatch(
	state: &AppState,
	payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<DeliveryReceipt> {
	let Json(request) =
		payload.map_err(|rejection| Error::InvalidRequest { reason: rejection.body_text() })?;

	tokio::time::timeout(state.upstream_timeout, state.relay.relay(request))
		.await
		.map_err(|_| Error::Timeout { operation: "relay" })?
}
