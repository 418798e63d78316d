//! REST-backed [`ChatSession`] authenticated with a bot token.

// crates.io
use reqwest::{
	Response, StatusCode,
	header::{AUTHORIZATION, HeaderValue},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{ChatIdentity, Secret},
	error::{SessionError, body_preview},
	http::ReqwestHttpClient,
	session::{ChatSession, ChatUser, SessionFuture},
};

/// Direct-message session over the platform's REST API.
///
/// Delivery opens (or reuses) the DM channel with `POST users/@me/channels`, then posts the
/// message into it.
#[derive(Clone)]
pub struct DiscordSession {
	client: ReqwestClient,
	api_base: Url,
	bot_token: Secret,
}
impl DiscordSession {
	/// Creates a session sharing the transport's connection pool and timeout.
	pub fn new(http_client: &ReqwestHttpClient, api_base: Url, bot_token: Secret) -> Self {
		Self { client: http_client.client().clone(), api_base, bot_token }
	}

	fn endpoint(&self, label: &'static str, segments: &[&str]) -> Result<Url, SessionError> {
		let mut url = self.api_base.clone();

		url.path_segments_mut()
			.map_err(|_| SessionError::InvalidEndpoint { endpoint: label })?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	fn authorization(&self) -> Result<HeaderValue, SessionError> {
		let mut value = HeaderValue::from_str(&format!("Bot {}", self.bot_token.expose()))
			.map_err(|_| SessionError::InvalidEndpoint { endpoint: "authorization header" })?;

		value.set_sensitive(true);

		Ok(value)
	}

	async fn fetch_user(&self, identity: &ChatIdentity) -> Result<Option<ChatUser>, SessionError> {
		let url = self.endpoint("user", &["users", identity.as_str()])?;
		let response =
			self.client.get(url).header(AUTHORIZATION, self.authorization()?).send().await?;

		// 400 covers ids that are not snowflakes at all.
		if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) {
			tracing::debug!(
				recipient = %identity,
				status = response.status().as_u16(),
				"Chat user not found."
			);

			return Ok(None);
		}

		let payload: UserPayload = read_json(response).await?;

		Ok(Some(ChatUser { id: identity.clone(), username: payload.username }))
	}

	async fn deliver(&self, user: &ChatUser, body: &str) -> Result<(), SessionError> {
		let url = self.endpoint("dm channel", &["users", "@me", "channels"])?;
		let response = self
			.client
			.post(url)
			.header(AUTHORIZATION, self.authorization()?)
			.json(&OpenChannel { recipient_id: user.id.as_str() })
			.send()
			.await?;
		let channel: ChannelPayload = read_json(response).await?;
		let url = self.endpoint("message", &["channels", &channel.id, "messages"])?;
		let response = self
			.client
			.post(url)
			.header(AUTHORIZATION, self.authorization()?)
			.json(&CreateMessage { content: body })
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(rejected(response).await);
		}

		Ok(())
	}
}
impl ChatSession for DiscordSession {
	fn lookup_user<'a>(
		&'a self,
		identity: &'a ChatIdentity,
	) -> SessionFuture<'a, Option<ChatUser>> {
		Box::pin(self.fetch_user(identity))
	}

	fn send_direct<'a>(&'a self, user: &'a ChatUser, body: &'a str) -> SessionFuture<'a, ()> {
		Box::pin(self.deliver(user, body))
	}
}
impl Debug for DiscordSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DiscordSession")
			.field("api_base", &self.api_base.as_str())
			.field("bot_token", &self.bot_token)
			.finish()
	}
}

#[derive(Serialize)]
struct OpenChannel<'a> {
	recipient_id: &'a str,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
	content: &'a str,
}

#[derive(Deserialize)]
struct UserPayload {
	#[serde(default)]
	username: Option<String>,
}

#[derive(Deserialize)]
struct ChannelPayload {
	id: String,
}

async fn read_json<T>(response: Response) -> Result<T, SessionError>
where
	T: DeserializeOwned,
{
	if !response.status().is_success() {
		return Err(rejected(response).await);
	}

	let bytes = response.bytes().await?;

	serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&bytes))
		.map_err(SessionError::MalformedResponse)
}

async fn rejected(response: Response) -> SessionError {
	let status = response.status().as_u16();
	let body = response.bytes().await.map(|bytes| body_preview(&bytes)).unwrap_or_default();

	tracing::warn!(status, body = %body, "Chat platform rejected a session call.");

	SessionError::Rejected { status, body }
}
