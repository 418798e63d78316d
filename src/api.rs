//! HTTP surface: the axum router, shared state, and the server entry point.
//!
//! | Route | Handler |
//! | --- | --- |
//! | `GET /link?correlation=` | [`handlers::initiate`] |
//! | `GET /link/callback?code=&correlation=` | [`handlers::callback`] |
//! | `GET /link/status/{token}` | [`handlers::status`] |
//! | `POST /relay` | [`handlers::relay`] |
//! | `POST /send` | [`handlers::send`] |
//! | `GET /health` | [`handlers::health`] |

pub mod handlers;
pub mod response;

pub use response::ApiError;

// crates.io
use axum::{
	Router,
	routing::{get, post},
};
// self
use crate::{flows::Linker, relay::Relay};
#[cfg(feature = "reqwest")]
use crate::{
	_prelude::*,
	config::AppConfig,
	error::ConfigError,
	http::ReqwestHttpClient,
	oauth::OAuth2ExchangeClient,
	session::DiscordSession,
	store::{LinkStore, MemoryStore},
};

/// State shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Linking flow controller.
	pub linker: Linker,
	/// Relay dispatcher.
	pub relay: Relay,
	/// Deadline applied to callback and relay requests.
	pub upstream_timeout: std::time::Duration,
}

/// Builds the bridge router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(handlers::health))
		.route("/link", get(handlers::initiate))
		.route("/link/callback", get(handlers::callback))
		.route("/link/status/{token}", get(handlers::status))
		.route("/relay", post(handlers::relay))
		.route("/send", post(handlers::send))
		.with_state(state)
}

/// Wires the Discord-backed components from `config` and serves until Ctrl-C.
#[cfg(feature = "reqwest")]
pub async fn serve(config: AppConfig) -> Result<(), ConfigError> {
	let descriptor = config.descriptor()?;
	let http_client = ReqwestHttpClient::with_timeout(config.upstream_timeout)?;
	let store: Arc<dyn LinkStore> = Arc::new(MemoryStore::default());
	let exchange = OAuth2ExchangeClient::reqwest(
		&descriptor,
		&config.client_id,
		&config.client_secret,
		http_client.clone(),
	)?;
	let session = DiscordSession::new(
		&http_client,
		descriptor.endpoints.api_base.clone(),
		config.bot_token.clone(),
	);
	let state = AppState {
		linker: Linker::new(
			descriptor,
			config.client_id.clone(),
			config.callback_uri.clone(),
			store.clone(),
			Arc::new(exchange),
		),
		relay: Relay::new(store, Arc::new(session)),
		upstream_timeout: config.upstream_timeout,
	};
	let addr = config.listen;
	let listener = tokio::net::TcpListener::bind(addr)
		.await
		.map_err(|source| ConfigError::Serve { addr, source })?;

	tracing::info!(%addr, callback_uri = %config.callback_uri, "Bridge listening.");

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(|source| ConfigError::Serve { addr, source })?;

	tracing::info!("Bridge stopped.");

	Ok(())
}

#[cfg(feature = "reqwest")]
async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("Shutdown signal received."),
		Err(e) => {
			tracing::error!(error = %e, "Cannot listen for Ctrl-C; running until killed.");

			std::future::pending::<()>().await;
		},
	}
}
