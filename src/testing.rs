//! In-process doubles for the exchange client and the chat session.

// crates.io
use tokio::sync::Notify;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ChatIdentity, CorrelationToken, LinkRecord},
	error::{ExchangeError, SessionError},
	oauth::{ExchangeFuture, IdentityExchange},
	session::{ChatSession, ChatUser, SessionFuture},
};

pub(crate) fn record(token: &str, identity: &str) -> LinkRecord {
	LinkRecord::now(
		CorrelationToken::new(token).expect("Token fixture should be valid."),
		ChatIdentity::new(identity).expect("Identity fixture should be valid."),
	)
}

/// Exchange that returns a fixed identity or a fixed rejection.
pub(crate) struct StaticExchange {
	outcome: std::result::Result<String, u16>,
	gate: Option<Arc<Notify>>,
	calls: RwLock<Vec<(String, String)>>,
}
impl StaticExchange {
	pub(crate) fn linking(identity: &str) -> Self {
		Self { outcome: Ok(identity.to_owned()), gate: None, calls: Default::default() }
	}

	pub(crate) fn rejecting(status: u16) -> Self {
		Self { outcome: Err(status), gate: None, calls: Default::default() }
	}

	/// Holds the token exchange until `gate` is notified.
	pub(crate) fn gated_by(mut self, gate: Arc<Notify>) -> Self {
		self.gate = Some(gate);

		self
	}

	/// `(code, redirect_uri)` pairs seen by the token exchange.
	pub(crate) fn calls(&self) -> Vec<(String, String)> {
		self.calls.read().clone()
	}
}
impl IdentityExchange for StaticExchange {
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
	) -> ExchangeFuture<'a, AccessToken> {
		Box::pin(async move {
			self.calls.write().push((code.to_owned(), redirect_uri.to_string()));

			if let Some(gate) = &self.gate {
				gate.notified().await;
			}

			match &self.outcome {
				Ok(_) => Ok(AccessToken::new(format!("access-{code}"))),
				Err(status) => Err(ExchangeError::Status {
					status: *status,
					body: "{\"error\":\"invalid_grant\"}".into(),
				}),
			}
		})
	}

	fn fetch_identity<'a>(
		&'a self,
		_access_token: &'a AccessToken,
	) -> ExchangeFuture<'a, ChatIdentity> {
		Box::pin(async move {
			let identity = self.outcome.as_ref().map_err(|status| ExchangeError::Status {
				status: *status,
				body: String::new(),
			})?;

			ChatIdentity::new(identity).map_err(ExchangeError::InvalidIdentity)
		})
	}
}

/// Session that knows a fixed set of users and records deliveries.
#[derive(Default)]
pub(crate) struct RecordingSession {
	known: Vec<String>,
	fail_send: bool,
	sent: RwLock<Vec<(String, String)>>,
}
impl RecordingSession {
	pub(crate) fn knowing(ids: &[&str]) -> Self {
		Self { known: ids.iter().map(|id| (*id).to_owned()).collect(), ..Default::default() }
	}

	pub(crate) fn failing_sends(mut self) -> Self {
		self.fail_send = true;

		self
	}

	/// `(recipient, body)` pairs delivered so far.
	pub(crate) fn sent(&self) -> Vec<(String, String)> {
		self.sent.read().clone()
	}
}
impl ChatSession for RecordingSession {
	fn lookup_user<'a>(
		&'a self,
		identity: &'a ChatIdentity,
	) -> SessionFuture<'a, Option<ChatUser>> {
		Box::pin(async move {
			let known = self.known.iter().any(|id| id == identity.as_str());

			Ok(known.then(|| ChatUser::new(identity.clone())))
		})
	}

	fn send_direct<'a>(&'a self, user: &'a ChatUser, body: &'a str) -> SessionFuture<'a, ()> {
		Box::pin(async move {
			if self.fail_send {
				return Err(SessionError::Rejected {
					status: 403,
					body: "Cannot send messages to this user".into(),
				});
			}

			self.sent.write().push((user.id.to_string(), body.to_owned()));

			Ok(())
		})
	}
}
