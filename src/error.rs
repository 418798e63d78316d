//! Bridge-level error types shared across linking, relaying, and the HTTP surface.

// self
use crate::{_prelude::*, auth::IdentifierError};

/// Bridge-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Canonical bridge error exposed by public APIs.
///
/// Every variant is request-scoped; none of them leave the link store in a partially written
/// state. `Display` output is safe to show to end users: upstream bodies only travel in the
/// source chain.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Flow initiation without a correlation token.
	#[error("Missing correlation token.")]
	MissingCorrelationToken,
	/// Correlation token is present but cannot be used as a lookup key.
	#[error("Correlation token is invalid: {0}")]
	InvalidCorrelationToken(#[source] IdentifierError),
	/// Callback arrived without `code` and/or `correlation`.
	#[error("Missing required parameter(s): {missing}.")]
	MissingParameters {
		/// Comma-separated parameter names.
		missing: String,
	},
	/// The user declined consent on the authorization page.
	#[error("Authorization was denied: {reason}.")]
	AuthorizationDenied {
		/// OAuth `error` value relayed by the platform.
		reason: String,
	},
	/// The code-for-identity exchange failed; nothing was written to the store.
	#[error("Linking failed: the chat platform rejected the identity exchange.")]
	LinkFailed(#[from] ExchangeError),
	/// Relay input is malformed.
	#[error("Invalid relay request: {reason}.")]
	InvalidRequest {
		/// Human-readable validation failure.
		reason: String,
	},
	/// The relay target resolved to no chat identity.
	#[error("Unknown recipient `{target}`.")]
	UnknownRecipient {
		/// Target string supplied by the caller.
		target: String,
	},
	/// The chat session refused or failed to deliver the message.
	#[error("Failed to deliver the message.")]
	DeliveryFailed(#[from] SessionError),
	/// A caller-side deadline elapsed while waiting for the chat platform.
	#[error("Timed out while waiting for the chat platform during {operation}.")]
	Timeout {
		/// Operation that exceeded its deadline.
		operation: &'static str,
	},
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A detached link task panicked or was aborted.
	#[error("Link task did not complete.")]
	Task(#[from] tokio::task::JoinError),
}
impl Error {
	/// Returns `true` for failures caused by caller input rather than upstream or local faults.
	pub fn is_client_error(&self) -> bool {
		matches!(
			self,
			Self::MissingCorrelationToken
				| Self::InvalidCorrelationToken(_)
				| Self::MissingParameters { .. }
				| Self::AuthorizationDenied { .. }
				| Self::InvalidRequest { .. }
		)
	}

	/// Stable machine-readable label for API bodies and metrics.
	pub fn code(&self) -> &'static str {
		match self {
			Self::MissingCorrelationToken => "MISSING_CORRELATION_TOKEN",
			Self::InvalidCorrelationToken(_) => "INVALID_CORRELATION_TOKEN",
			Self::MissingParameters { .. } => "MISSING_PARAMETERS",
			Self::AuthorizationDenied { .. } => "AUTHORIZATION_DENIED",
			Self::LinkFailed(_) => "LINK_FAILED",
			Self::InvalidRequest { .. } => "INVALID_REQUEST",
			Self::UnknownRecipient { .. } => "UNKNOWN_RECIPIENT",
			Self::DeliveryFailed(_) => "DELIVERY_FAILED",
			Self::Timeout { .. } => "UPSTREAM_TIMEOUT",
			Self::Storage(_) => "STORAGE_ERROR",
			Self::Config(_) => "CONFIG_ERROR",
			Self::Task(_) => "INTERNAL_ERROR",
		}
	}
}

/// Configuration and validation failures raised while wiring the bridge.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Platform descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Platform descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::platform::PlatformDescriptorError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// A `.env` file exists but could not be read or parsed.
	#[error("The .env file is unreadable.")]
	EnvFile(#[from] dotenvy::Error),
	/// A required environment variable is absent or empty.
	#[error("Environment variable `{name}` is required.")]
	MissingVar {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable holds an unusable value.
	#[error("Environment variable `{name}` is invalid: {reason}.")]
	InvalidVar {
		/// Variable name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// The listener could not bind or the server loop failed.
	#[error("Server failed on {addr}.")]
	Serve {
		/// Listen address.
		addr: std::net::SocketAddr,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure of the authorization-code or identity call against the chat platform.
///
/// Carries the upstream status and a bounded body preview for diagnostics. Never retried:
/// authorization codes are single-use.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Token endpoint answered with an OAuth error document.
	#[error("Token endpoint returned OAuth error `{error}`.")]
	Rejected {
		/// OAuth `error` field.
		error: String,
		/// OAuth `error_description` field, when present.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Endpoint answered with a non-2xx status outside the OAuth error format.
	#[error("Chat platform responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Response body could not be parsed.
	#[error("Chat platform returned a malformed response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Truncated response body.
		body: String,
	},
	/// Identity endpoint returned an id the bridge cannot store.
	#[error("Chat platform returned an unusable identity.")]
	InvalidIdentity(#[source] IdentifierError),
	/// HTTP client reported something the bridge has no dedicated variant for.
	#[error("HTTP client error while calling the chat platform: {message}.")]
	Unexpected {
		/// Transport-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Network, TLS, or IO failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request could not be built locally.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl ExchangeError {
	/// Upstream HTTP status, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. }
			| Self::MalformedResponse { status, .. }
			| Self::Unexpected { status, .. } => *status,
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Upstream body preview, when one was captured.
	pub fn body(&self) -> Option<&str> {
		match self {
			Self::Status { body, .. } | Self::MalformedResponse { body, .. } => Some(body),
			Self::Rejected { description, .. } => description.as_deref(),
			_ => None,
		}
	}
}

/// Failure reported by the chat-session send capability.
#[derive(Debug, ThisError)]
pub enum SessionError {
	/// Platform refused the request.
	#[error("Chat platform rejected the request with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Platform answered with a body the session cannot parse.
	#[error("Chat platform returned a malformed response.")]
	MalformedResponse(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Endpoint URL could not be derived from the configured API base.
	#[error("Cannot derive the `{endpoint}` endpoint from the API base.")]
	InvalidEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Network, TLS, or IO failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the chat platform.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the chat platform.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for SessionError {
	fn from(e: ReqwestError) -> Self {
		TransportError::from(e).into()
	}
}

/// Truncates an upstream body to a log-safe preview.
pub(crate) fn body_preview(bytes: &[u8]) -> String {
	let text = String::from_utf8_lossy(bytes);

	match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((idx, _)) => format!("{}…", &text[..idx]),
		None => text.into_owned(),
	}
}
