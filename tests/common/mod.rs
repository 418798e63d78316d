#![allow(dead_code)]

// std
use std::{
	sync::{Arc, Mutex},
	time::Duration,
};
// crates.io
use dm_bridge::{
	api::AppState,
	auth::{AccessToken, ChatIdentity},
	error::{ExchangeError, SessionError},
	flows::Linker,
	oauth::{ExchangeFuture, IdentityExchange},
	platform::PlatformDescriptor,
	relay::Relay,
	session::{ChatSession, ChatUser, SessionFuture},
	store::{LinkStore, MemoryStore},
	url::Url,
};
use tokio::sync::Notify;

pub const CALLBACK_URI: &str = "https://bridge.example.com/link/callback";

/// Exchange double: links every code to one identity, or rejects every code.
pub struct StubExchange {
	identity: Option<&'static str>,
	gate: Option<Arc<Notify>>,
}
impl StubExchange {
	pub fn linking(identity: &'static str) -> Self {
		Self { identity: Some(identity), gate: None }
	}

	pub fn rejecting() -> Self {
		Self { identity: None, gate: None }
	}

	/// Holds every token exchange until the returned gate is notified.
	pub fn gated(identity: &'static str) -> (Self, Arc<Notify>) {
		let gate = Arc::new(Notify::new());

		(Self { identity: Some(identity), gate: Some(gate.clone()) }, gate)
	}
}
impl IdentityExchange for StubExchange {
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		_redirect_uri: &'a Url,
	) -> ExchangeFuture<'a, AccessToken> {
		Box::pin(async move {
			if let Some(gate) = &self.gate {
				gate.notified().await;
			}

			match self.identity {
				Some(_) => Ok(AccessToken::new(format!("access-{code}"))),
				None => Err(ExchangeError::Rejected {
					error: "invalid_grant".into(),
					description: Some("Invalid \"code\" in request.".into()),
					status: Some(400),
				}),
			}
		})
	}

	fn fetch_identity<'a>(
		&'a self,
		_access_token: &'a AccessToken,
	) -> ExchangeFuture<'a, ChatIdentity> {
		Box::pin(async move {
			let identity = self
				.identity
				.ok_or(ExchangeError::Status { status: 401, body: String::new() })?;

			ChatIdentity::new(identity).map_err(ExchangeError::InvalidIdentity)
		})
	}
}

/// Session double: knows a fixed user list and records deliveries.
#[derive(Default)]
pub struct StubSession {
	known: Vec<String>,
	fail_send: bool,
	sent: Mutex<Vec<(String, String)>>,
}
impl StubSession {
	pub fn knowing(ids: &[&str]) -> Self {
		Self { known: ids.iter().map(|id| (*id).to_owned()).collect(), ..Default::default() }
	}

	pub fn failing_sends(mut self) -> Self {
		self.fail_send = true;

		self
	}

	pub fn sent(&self) -> Vec<(String, String)> {
		self.sent.lock().expect("Sent log lock should not be poisoned.").clone()
	}
}
impl ChatSession for StubSession {
	fn lookup_user<'a>(
		&'a self,
		identity: &'a ChatIdentity,
	) -> SessionFuture<'a, Option<ChatUser>> {
		let known = self.known.iter().any(|id| id == identity.as_str());

		Box::pin(async move { Ok(known.then(|| ChatUser::new(identity.clone()))) })
	}

	fn send_direct<'a>(&'a self, user: &'a ChatUser, body: &'a str) -> SessionFuture<'a, ()> {
		Box::pin(async move {
			if self.fail_send {
				return Err(SessionError::Rejected { status: 403, body: String::new() });
			}

			self.sent
				.lock()
				.expect("Sent log lock should not be poisoned.")
				.push((user.id.to_string(), body.to_owned()));

			Ok(())
		})
	}
}

/// Yields until `store` holds `count` links, failing after five seconds.
pub async fn wait_for_links(store: &MemoryStore, count: usize) {
	tokio::time::timeout(Duration::from_secs(5), async {
		while store.len() < count {
			tokio::task::yield_now().await;
		}
	})
	.await
	.expect("Detached link task should finish.");
}

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse test URL.")
}

/// App state over doubles, plus handles on the store and the session.
pub fn app_state(
	exchange: StubExchange,
	session: StubSession,
	upstream_timeout: Duration,
) -> (AppState, MemoryStore, Arc<StubSession>) {
	let store = MemoryStore::default();
	let shared: Arc<dyn LinkStore> = Arc::new(store.clone());
	let session = Arc::new(session);
	let linker = Linker::new(
		PlatformDescriptor::discord().expect("Discord preset should build."),
		"client-it",
		url(CALLBACK_URI),
		shared.clone(),
		Arc::new(exchange),
	);
	let state =
		AppState { linker, relay: Relay::new(shared, session.clone()), upstream_timeout };

	(state, store, session)
}
