//! Process configuration, read once at startup from the environment (and `.env`, if present).

// std
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::ConfigError,
	platform::PlatformDescriptor,
};

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Immutable bridge configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
	/// OAuth client id (`DISCORD_CLIENT_ID`).
	pub client_id: String,
	/// OAuth client secret (`DISCORD_CLIENT_SECRET`).
	pub client_secret: Secret,
	/// Bot token used for direct messages (`DISCORD_BOT_TOKEN`, falling back to `TOKEN`).
	pub bot_token: Secret,
	/// Public callback URI of `/link/callback` (`CALLBACK_URI`).
	pub callback_uri: Url,
	/// REST base for bot calls (`DISCORD_API_BASE`).
	pub api_base: Url,
	/// Listen address (`HOST`, `PORT`).
	pub listen: SocketAddr,
	/// Caller-side deadline for exchange and relay calls (`UPSTREAM_TIMEOUT_SECS`).
	pub upstream_timeout: std::time::Duration,
	/// Emit JSON logs (`LOG_FORMAT=json`).
	pub log_json: bool,
}
impl AppConfig {
	/// Loads `.env` when present, then reads the process environment.
	///
	/// A missing `.env` is fine; one that exists but cannot be parsed is an error.
	pub fn from_env() -> Result<Self, ConfigError> {
		accept_env_file(dotenvy::dotenv())?;

		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Builds the configuration from an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let required = |name: &'static str| var(name).ok_or(ConfigError::MissingVar { name });
		let client_id = required("DISCORD_CLIENT_ID")?;
		let client_secret = Secret::new(required("DISCORD_CLIENT_SECRET")?);
		let bot_token = var("DISCORD_BOT_TOKEN")
			.or_else(|| var("TOKEN"))
			.map(Secret::new)
			.ok_or(ConfigError::MissingVar { name: "DISCORD_BOT_TOKEN" })?;
		let callback_uri = parse_callback(&required("CALLBACK_URI")?)?;
		let api_base = match parse_var::<Url>("DISCORD_API_BASE", var("DISCORD_API_BASE"))? {
			Some(url) => url,
			None => Url::parse(DEFAULT_API_BASE).map_err(|e| ConfigError::InvalidVar {
				name: "DISCORD_API_BASE",
				reason: e.to_string(),
			})?,
		};
		let host = parse_var::<IpAddr>("HOST", var("HOST"))?
			.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
		let port = parse_var::<u16>("PORT", var("PORT"))?.unwrap_or(DEFAULT_PORT);
		let timeout_secs = parse_var::<u64>("UPSTREAM_TIMEOUT_SECS", var("UPSTREAM_TIMEOUT_SECS"))?
			.unwrap_or(DEFAULT_TIMEOUT_SECS);

		if timeout_secs == 0 {
			return Err(ConfigError::InvalidVar {
				name: "UPSTREAM_TIMEOUT_SECS",
				reason: "must be at least 1".into(),
			});
		}

		let log_json = match var("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
			None | Some("pretty") | Some("text") => false,
			Some("json") => true,
			Some(other) =>
				return Err(ConfigError::InvalidVar {
					name: "LOG_FORMAT",
					reason: format!("expected `json` or `pretty`, got `{other}`"),
				}),
		};

		Ok(Self {
			client_id,
			client_secret,
			bot_token,
			callback_uri,
			api_base,
			listen: SocketAddr::new(host, port),
			upstream_timeout: std::time::Duration::from_secs(timeout_secs),
			log_json,
		})
	}

	/// Discord descriptor with the configured REST base.
	pub fn descriptor(&self) -> Result<PlatformDescriptor, ConfigError> {
		let preset = PlatformDescriptor::discord()?;
		let descriptor = PlatformDescriptor::builder()
			.authorization_endpoint(preset.endpoints.authorization)
			.token_endpoint(preset.endpoints.token)
			.identity_endpoint(preset.endpoints.identity)
			.api_base(self.api_base.clone())
			.scope("identify")
			.client_auth_method(preset.client_auth_method)
			.build()?;

		Ok(descriptor)
	}
}

fn accept_env_file<T>(loaded: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
	match loaded {
		Ok(_) => Ok(()),
		Err(e) if e.not_found() => Ok(()),
		Err(e) => Err(ConfigError::EnvFile(e)),
	}
}

fn parse_var<T>(name: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
	T: FromStr,
	T::Err: Display,
{
	raw.map(|raw| {
		raw.trim()
			.parse::<T>()
			.map_err(|e| ConfigError::InvalidVar { name, reason: e.to_string() })
	})
	.transpose()
}

fn parse_callback(raw: &str) -> Result<Url, ConfigError> {
	let invalid =
		|reason: &str| ConfigError::InvalidVar { name: "CALLBACK_URI", reason: reason.into() };
	let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(invalid("scheme must be http or https"));
	}
	if url.fragment().is_some() {
		return Err(invalid("fragments are not allowed"));
	}
	if url.query_pairs().any(|(key, _)| key == "correlation") {
		return Err(invalid("the `correlation` parameter is added per link"));
	}

	Ok(url)
}
