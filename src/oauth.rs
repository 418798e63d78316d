//! OAuth 2.0 exchange client: authorization code for access token, access token for identity.
//!
//! Both calls are single-shot. Authorization codes are single-use and short-lived, so a failed
//! exchange is surfaced to the caller instead of being retried with the same code.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ChatIdentity, Secret},
	error::{ConfigError, ExchangeError, TransportError, body_preview},
	http::{PlatformHttpClient, ResponseMetadata, ResponseMetadataSlot},
	platform::{ClientAuthMethod, PlatformDescriptor},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Boxed future returned by [`IdentityExchange`] operations.
pub type ExchangeFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ExchangeError>> + 'a + Send>>;

#[cfg(feature = "reqwest")]
/// Exchange client specialized for the crate's reqwest transport.
pub type ReqwestExchangeClient =
	OAuth2ExchangeClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Code-for-token and token-for-identity calls against the chat platform.
pub trait IdentityExchange
where
	Self: Send + Sync,
{
	/// Exchanges an authorization code. `redirect_uri` must be byte-identical to the one shown
	/// on the authorization page or the platform rejects the exchange.
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
	) -> ExchangeFuture<'a, AccessToken>;

	/// Resolves the chat identity that owns `access_token`.
	fn fetch_identity<'a>(
		&'a self,
		access_token: &'a AccessToken,
	) -> ExchangeFuture<'a, ChatIdentity>;
}

/// Maps transport failures into [`ExchangeError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> ExchangeError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> ExchangeError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) =>
				ExchangeError::Unexpected { message, status: meta_status(meta) },
			_ => ExchangeError::Unexpected {
				message: "unclassified transport failure".into(),
				status: meta_status(meta),
			},
		}
	}
}

/// [`IdentityExchange`] backed by the `oauth2` crate and a pluggable transport.
pub struct OAuth2ExchangeClient<C, M>
where
	C: ?Sized + PlatformHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	identity_endpoint: Url,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> OAuth2ExchangeClient<C, M>
where
	C: ?Sized + PlatformHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds a client for the descriptor's token and identity endpoints.
	pub fn from_descriptor(
		descriptor: &PlatformDescriptor,
		client_id: &str,
		client_secret: &Secret,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		if matches!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			identity_endpoint: descriptor.endpoints.identity.clone(),
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2ExchangeClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds a reqwest-backed client sharing `http_client`.
	pub fn reqwest(
		descriptor: &PlatformDescriptor,
		client_id: &str,
		client_secret: &Secret,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		Self::from_descriptor(
			descriptor,
			client_id,
			client_secret,
			http_client,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> IdentityExchange for OAuth2ExchangeClient<C, M>
where
	C: ?Sized + PlatformHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
	) -> ExchangeFuture<'a, AccessToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.with_metadata(meta.clone());
			let redirect_url = RedirectUrl::new(redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;
			let response = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_redirect_uri(Cow::Owned(redirect_url))
				.request_async(&handle)
				.await
				.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

			Ok(AccessToken::new(response.access_token().secret().to_owned()))
		})
	}

	fn fetch_identity<'a>(
		&'a self,
		access_token: &'a AccessToken,
	) -> ExchangeFuture<'a, ChatIdentity> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.with_metadata(meta.clone());
			let request = Request::builder()
				.method(Method::GET)
				.uri(self.identity_endpoint.as_str())
				.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()))
				.header(ACCEPT, "application/json")
				.body(Vec::new())
				.map_err(ConfigError::from)?;
			let response = handle.call(request).await.map_err(|err| {
				self.error_mapper.map_transport_error(meta.take().as_ref(), err)
			})?;
			let status = response.status().as_u16();

			if !response.status().is_success() {
				return Err(ExchangeError::Status { status, body: body_preview(response.body()) });
			}

			let payload: IdentityPayload = serde_path_to_error::deserialize(
				&mut serde_json::Deserializer::from_slice(response.body()),
			)
			.map_err(|source| ExchangeError::MalformedResponse {
				source,
				status: Some(status),
				body: body_preview(response.body()),
			})?;

			ChatIdentity::new(payload.id).map_err(ExchangeError::InvalidIdentity)
		})
	}
}
impl<C, M> Debug for OAuth2ExchangeClient<C, M>
where
	C: ?Sized + PlatformHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2ExchangeClient")
			.field("client_id", self.oauth_client.client_id())
			.field("identity_endpoint", &self.identity_endpoint.as_str())
			.finish()
	}
}

#[derive(Deserialize)]
struct IdentityPayload {
	id: String,
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> ExchangeError
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(response, meta_ref),
		RequestTokenError::Request(error) => mapper.map_transport_error(meta_ref, error),
		RequestTokenError::Parse(source, body) => ExchangeError::MalformedResponse {
			source,
			status: meta_status(meta_ref),
			body: body_preview(&body),
		},
		RequestTokenError::Other(message) =>
			ExchangeError::Unexpected { message, status: meta_status(meta_ref) },
	}
}

fn map_server_response(
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> ExchangeError {
	ExchangeError::Rejected {
		error: response.error().as_ref().to_owned(),
		description: response.error_description().cloned(),
		status: meta_status(meta),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> ExchangeError {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return ExchangeError::Unexpected {
			message: "request timed out".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		};
	}

	TransportError::from(err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::basic::BasicErrorResponseType;
	// self
	use super::*;

	struct IoMapper;
	impl TransportErrorMapper<std::io::Error> for IoMapper {
		fn map_transport_error(
			&self,
			_metadata: Option<&ResponseMetadata>,
			error: HttpClientError<std::io::Error>,
		) -> ExchangeError {
			ExchangeError::Unexpected { message: error.to_string(), status: None }
		}
	}

	#[test]
	fn server_response_maps_to_rejected_with_status() {
		let response = BasicErrorResponse::new(
			BasicErrorResponseType::InvalidGrant,
			Some("Invalid \"code\" in request.".into()),
			None,
		);
		let err = map_request_error::<std::io::Error, _>(
			Some(ResponseMetadata { status: Some(400) }),
			RequestTokenError::ServerResponse(response),
			&IoMapper,
		);

		match err {
			ExchangeError::Rejected { error, description, status } => {
				assert_eq!(error, "invalid_grant");
				assert_eq!(description.as_deref(), Some("Invalid \"code\" in request."));
				assert_eq!(status, Some(400));
			},
			other => panic!("Expected a rejected exchange, got {other:?}."),
		}
	}

	#[test]
	fn other_errors_keep_observed_status() {
		let err = map_request_error::<std::io::Error, _>(
			Some(ResponseMetadata { status: Some(503) }),
			RequestTokenError::Other("unexpected content type".into()),
			&IoMapper,
		);

		assert_eq!(err.status(), Some(503));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn builds_client_for_both_auth_methods() {
		let secret = Secret::new("secret");
		let descriptor = PlatformDescriptor::discord().expect("Discord preset should build.");

		ReqwestExchangeClient::reqwest(
			&descriptor,
			"client-id",
			&secret,
			ReqwestHttpClient::default(),
		)
		.expect("Post-auth client should build.");

		let mut basic = descriptor.clone();

		basic.client_auth_method = ClientAuthMethod::ClientSecretBasic;

		let client = ReqwestExchangeClient::reqwest(
			&basic,
			"client-id",
			&secret,
			ReqwestHttpClient::default(),
		)
		.expect("Basic-auth client should build.");

		assert!(format!("{client:?}").contains("/api/users/@me"));
	}
}
