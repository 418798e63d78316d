//! Platform descriptor data structures.

/// Builder API for assembling platform descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

const DISCORD_AUTHORIZE: &str = "https://discord.com/oauth2/authorize";
const DISCORD_TOKEN: &str = "https://discord.com/api/oauth2/token";
const DISCORD_IDENTITY: &str = "https://discord.com/api/users/@me";
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a platform descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEndpoints {
	/// User-facing authorization page.
	pub authorization: Url,
	/// Token endpoint for the authorization-code exchange.
	pub token: Url,
	/// Endpoint returning the authenticated user for a bearer token.
	pub identity: Url,
	/// REST base for bot calls (user lookup, DM channels, messages).
	pub api_base: Url,
}

/// Immutable platform descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
	/// Endpoint definitions exposed by the platform.
	pub endpoints: PlatformEndpoints,
	/// Scopes requested on the authorization page.
	pub scopes: Vec<String>,
	/// Client authentication mechanism for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}
impl PlatformDescriptor {
	/// Creates a new builder.
	pub fn builder() -> PlatformDescriptorBuilder {
		PlatformDescriptorBuilder::new()
	}

	/// Descriptor for Discord's public endpoints with the `identify` scope.
	pub fn discord() -> Result<Self, PlatformDescriptorError> {
		Self::builder()
			.authorization_endpoint(parse_static(DISCORD_AUTHORIZE)?)
			.token_endpoint(parse_static(DISCORD_TOKEN)?)
			.identity_endpoint(parse_static(DISCORD_IDENTITY)?)
			.api_base(parse_static(DISCORD_API_BASE)?)
			.scope("identify")
			.build()
	}

	/// Space-delimited scope parameter.
	pub fn scope_param(&self) -> String {
		self.scopes.join(" ")
	}
}

fn parse_static(raw: &str) -> Result<Url, PlatformDescriptorError> {
	Url::parse(raw).map_err(|e| PlatformDescriptorError::InvalidUrl { reason: e.to_string() })
}
