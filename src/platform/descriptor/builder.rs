// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	platform::{ClientAuthMethod, PlatformDescriptor, PlatformEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum PlatformDescriptorError {
	/// A required endpoint was never set.
	#[error("Missing {endpoint} endpoint.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// At least one scope must be requested.
	#[error("Descriptor must request at least one scope.")]
	NoScopes,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A built-in URL failed to parse.
	#[error("Invalid descriptor URL: {reason}.")]
	InvalidUrl {
		/// Parser message.
		reason: String,
	},
}

/// Builder for [`PlatformDescriptor`] values.
#[derive(Debug, Default)]
pub struct PlatformDescriptorBuilder {
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	identity_endpoint: Option<Url>,
	api_base: Option<Url>,
	scopes: Vec<String>,
	client_auth_method: ClientAuthMethod,
}
impl PlatformDescriptorBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the identity endpoint.
	pub fn identity_endpoint(mut self, url: Url) -> Self {
		self.identity_endpoint = Some(url);

		self
	}

	/// Sets the REST base used for direct messages.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Adds a requested scope; duplicates are ignored.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		let scope = scope.into();

		if !self.scopes.contains(&scope) {
			self.scopes.push(scope);
		}

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<PlatformDescriptor, PlatformDescriptorError> {
		let endpoints = PlatformEndpoints {
			authorization: require("authorization", self.authorization_endpoint)?,
			token: require("token", self.token_endpoint)?,
			identity: require("identity", self.identity_endpoint)?,
			api_base: require("api base", self.api_base)?,
		};

		if self.scopes.is_empty() {
			return Err(PlatformDescriptorError::NoScopes);
		}

		Ok(PlatformDescriptor {
			endpoints,
			scopes: self.scopes,
			client_auth_method: self.client_auth_method,
		})
	}
}

fn require(endpoint: &'static str, url: Option<Url>) -> Result<Url, PlatformDescriptorError> {
	let url = url.ok_or(PlatformDescriptorError::MissingEndpoint { endpoint })?;

	validate_endpoint(endpoint, &url)?;

	Ok(url)
}

fn validate_endpoint(endpoint: &'static str, url: &Url) -> Result<(), PlatformDescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(PlatformDescriptorError::InsecureEndpoint { endpoint, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse descriptor fixture URL.")
	}

	fn complete(base: &str) -> PlatformDescriptorBuilder {
		PlatformDescriptor::builder()
			.authorization_endpoint(url(&format!("{base}/authorize")))
			.token_endpoint(url(&format!("{base}/token")))
			.identity_endpoint(url(&format!("{base}/users/@me")))
			.api_base(url(base))
			.scope("identify")
	}

	#[test]
	fn rejects_plain_http_for_remote_hosts() {
		let err = complete("http://example.com")
			.build()
			.expect_err("Remote plain-HTTP endpoints must be rejected.");

		assert!(matches!(
			err,
			PlatformDescriptorError::InsecureEndpoint { endpoint: "authorization", .. }
		));
	}

	#[test]
	fn allows_plain_http_on_loopback() {
		complete("http://127.0.0.1:8080").build().expect("IPv4 loopback should be accepted.");
		complete("http://localhost:8080").build().expect("localhost should be accepted.");
		complete("http://[::1]:8080").build().expect("IPv6 loopback should be accepted.");
	}

	#[test]
	fn requires_every_endpoint_and_a_scope() {
		let err = PlatformDescriptor::builder()
			.authorization_endpoint(url("https://example.com/authorize"))
			.build()
			.expect_err("Missing token endpoint should fail.");

		assert_eq!(err, PlatformDescriptorError::MissingEndpoint { endpoint: "token" });

		let err = PlatformDescriptor::builder()
			.authorization_endpoint(url("https://example.com/authorize"))
			.token_endpoint(url("https://example.com/token"))
			.identity_endpoint(url("https://example.com/me"))
			.api_base(url("https://example.com/api"))
			.build()
			.expect_err("Descriptors without scopes should fail.");

		assert_eq!(err, PlatformDescriptorError::NoScopes);
	}

	#[test]
	fn scopes_are_deduplicated_in_order() {
		let descriptor = complete("https://example.com")
			.scope("email")
			.scope("identify")
			.build()
			.expect("Descriptor should build.");

		assert_eq!(descriptor.scope_param(), "identify email");
	}
}
