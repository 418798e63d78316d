//! Relay dispatcher: resolve a target to a chat identity and deliver one direct message.
//!
//! Targets come in two shapes. Early game builds send a raw chat identity; later ones send the
//! correlation token they linked with and let the store resolve it. [`TargetKind::Auto`] accepts
//! both. A target the platform knows as a user is always delivered to that user, so a link
//! keyed by someone else's chat id can never redirect their messages.

// self
use crate::{
	_prelude::*,
	auth::{ChatIdentity, CorrelationToken},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{ChatSession, ChatUser},
	store::LinkStore,
};

/// Longest message body the platform accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// How a relay target should be interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
	/// Raw chat identity when the platform knows it, otherwise a stored link.
	#[default]
	Auto,
	/// Raw chat identity only.
	Identity,
	/// Correlation token resolved through the store only.
	Correlation,
}

/// Relay input as received from the game client.
///
/// Fields are optional so missing values surface as [`Error::InvalidRequest`] rather than as a
/// body-parsing failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RelayRequest {
	/// Chat identity or correlation token. `userId` is accepted for older clients.
	#[serde(default, alias = "userId")]
	pub target: Option<String>,
	/// Message body.
	#[serde(default)]
	pub message: Option<String>,
	/// Target interpretation.
	#[serde(default)]
	pub via: TargetKind,
}
impl RelayRequest {
	/// Creates an [`TargetKind::Auto`] request.
	pub fn new(target: impl Into<String>, message: impl Into<String>) -> Self {
		Self { target: Some(target.into()), message: Some(message.into()), via: TargetKind::Auto }
	}

	/// Overrides the target interpretation.
	pub fn via(mut self, via: TargetKind) -> Self {
		self.via = via;

		self
	}
}

/// Proof of a delivered message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
	/// Identity the message was delivered to.
	pub recipient: ChatIdentity,
	/// Which resolution path produced the recipient.
	pub resolved_via: TargetKind,
	/// Instant the platform accepted the message.
	#[serde(with = "time::serde::rfc3339")]
	pub delivered_at: OffsetDateTime,
}

/// Relay dispatcher. Reads the store; never writes it.
#[derive(Clone)]
pub struct Relay {
	store: Arc<dyn LinkStore>,
	session: Arc<dyn ChatSession>,
}
impl Relay {
	/// Creates a dispatcher over a shared store and session.
	pub fn new(store: Arc<dyn LinkStore>, session: Arc<dyn ChatSession>) -> Self {
		Self { store, session }
	}

	/// Validates, resolves, and delivers `request`. Delivery is attempted at most once.
	pub async fn relay(&self, request: RelayRequest) -> Result<DeliveryReceipt> {
		const KIND: FlowKind = FlowKind::Relay;

		let span = FlowSpan::new(KIND, "relay");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (target, body) = validate(&request)?;
				let (user, resolved_via) = self.resolve(target, request.via).await?;

				self.session.send_direct(&user, body).await.map_err(|e| {
					tracing::error!(
						recipient = %user.id,
						error = ?e,
						"Direct message delivery failed."
					);

					Error::DeliveryFailed(e)
				})?;

				tracing::info!(
					recipient = %user.id,
					username = user.username.as_deref().unwrap_or_default(),
					via = ?resolved_via,
					"Relayed message."
				);

				Ok(DeliveryReceipt {
					recipient: user.id,
					resolved_via,
					delivered_at: OffsetDateTime::now_utc(),
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn resolve(&self, target: &str, via: TargetKind) -> Result<(ChatUser, TargetKind)> {
		let unknown = || Error::UnknownRecipient { target: target.to_owned() };

		if via != TargetKind::Correlation {
			let identity = ChatIdentity::new(target).map_err(|_| unknown())?;

			if let Some(user) = self.lookup(&identity).await? {
				return Ok((user, TargetKind::Identity));
			}
			if via == TargetKind::Identity {
				return Err(unknown());
			}
		}

		let linked = match CorrelationToken::new(target) {
			Ok(token) => self.store.get(&token).await?,
			Err(_) => None,
		};
		let record = linked.ok_or_else(unknown)?;

		self.lookup(&record.chat_identity)
			.await?
			.map(|user| (user, TargetKind::Correlation))
			.ok_or_else(unknown)
	}

	async fn lookup(&self, identity: &ChatIdentity) -> Result<Option<ChatUser>> {
		self.session.lookup_user(identity).await.map_err(|e| {
			tracing::warn!(recipient = %identity, error = ?e, "Recipient lookup failed.");

			Error::DeliveryFailed(e)
		})
	}
}
impl Debug for Relay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Relay(..)")
	}
}

fn validate(request: &RelayRequest) -> Result<(&str, &str)> {
	let target = request.target.as_deref().filter(|v| !v.trim().is_empty());
	let body = request.message.as_deref().filter(|v| !v.trim().is_empty());
	let (target, body) = match (target, body) {
		(Some(target), Some(body)) => (target, body),
		(None, _) => return Err(Error::InvalidRequest { reason: "missing `target`".into() }),
		(_, None) => return Err(Error::InvalidRequest { reason: "missing `message`".into() }),
	};

	if ChatIdentity::new(target).is_err() {
		return Err(Error::InvalidRequest {
			reason: "`target` must be a single identifier without whitespace".into(),
		});
	}

	if body.chars().count() > MAX_MESSAGE_CHARS {
		return Err(Error::InvalidRequest {
			reason: format!("`message` exceeds {MAX_MESSAGE_CHARS} characters"),
		});
	}

	Ok((target, body))
}
