//! Two-phase linking flow: redirect out to the authorization page, then complete on callback.
//!
//! The platform's redirect carries no caller context of its own, so the correlation token is
//! embedded in the callback URI's query string at initiation. The callback rebuilds that exact
//! URI from the returned token; the token endpoint compares it byte for byte with the one shown
//! on the authorization page.
//!
//! Pending links are not stored. A token is unlinked until a callback succeeds, and a later
//! successful callback for the same token replaces the earlier record.

// self
use crate::{
	_prelude::*,
	auth::{ChatIdentity, CorrelationToken, LinkRecord},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	oauth::IdentityExchange,
	platform::PlatformDescriptor,
	store::LinkStore,
};

const CORRELATION_PARAM: &str = "correlation";

/// Redirect issued by [`Linker::initiate`].
#[derive(Clone, Debug)]
pub struct LinkRedirect {
	/// Token being linked.
	pub token: CorrelationToken,
	/// Callback URI with the token embedded; reused verbatim by the token exchange.
	pub redirect_uri: Url,
	/// Authorization page the user's browser should be sent to.
	pub authorize_url: Url,
}

/// Result of a successful [`Linker::callback`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkConfirmation {
	/// Token that is now linked.
	pub token: CorrelationToken,
	/// Identity written to the store.
	pub chat_identity: ChatIdentity,
	/// `true` when an earlier record for the token was replaced.
	pub relinked: bool,
	/// Human-readable status line.
	pub message: String,
}

/// Answer to "is this token linked".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatus {
	/// Token exactly as queried.
	pub token: String,
	/// Linked identity, `null` when unlinked.
	pub chat_identity: Option<ChatIdentity>,
	/// Whether a record exists.
	pub linked: bool,
	/// Completion instant of the current link.
	#[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
	pub linked_at: Option<OffsetDateTime>,
}
impl LinkStatus {
	fn new(token: impl Into<String>, record: Option<LinkRecord>) -> Self {
		let token = token.into();

		match record {
			Some(record) => Self {
				token,
				chat_identity: Some(record.chat_identity),
				linked: true,
				linked_at: Some(record.linked_at),
			},
			None => Self { token, chat_identity: None, linked: false, linked_at: None },
		}
	}
}

/// Linking flow controller.
///
/// Cheap to clone; all state lives in the shared store.
#[derive(Clone)]
pub struct Linker {
	descriptor: Arc<PlatformDescriptor>,
	client_id: String,
	callback_uri: Url,
	store: Arc<dyn LinkStore>,
	exchange: Arc<dyn IdentityExchange>,
}
impl Linker {
	/// Creates a controller. `callback_uri` is the public address of the callback route.
	pub fn new(
		descriptor: PlatformDescriptor,
		client_id: impl Into<String>,
		callback_uri: Url,
		store: Arc<dyn LinkStore>,
		exchange: Arc<dyn IdentityExchange>,
	) -> Self {
		Self {
			descriptor: Arc::new(descriptor),
			client_id: client_id.into(),
			callback_uri,
			store,
			exchange,
		}
	}

	/// Shared link store.
	pub fn store(&self) -> &Arc<dyn LinkStore> {
		&self.store
	}

	/// Callback URI carrying `token`. Deterministic: the same token always yields the same bytes.
	pub fn redirect_uri_for(&self, token: &CorrelationToken) -> Url {
		let mut uri = self.callback_uri.clone();

		uri.query_pairs_mut().append_pair(CORRELATION_PARAM, token.as_str());

		uri
	}

	/// Builds the authorization redirect for `correlation`. Performs no state mutation.
	pub fn initiate(&self, correlation: Option<&str>) -> Result<LinkRedirect> {
		const KIND: FlowKind = FlowKind::Initiate;

		let _guard = FlowSpan::new(KIND, "initiate").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = parse_token(correlation).map(|token| {
			let redirect_uri = self.redirect_uri_for(&token);
			let mut authorize_url = self.descriptor.endpoints.authorization.clone();

			authorize_url
				.query_pairs_mut()
				.append_pair("response_type", "code")
				.append_pair("client_id", &self.client_id)
				.append_pair("scope", &self.descriptor.scope_param())
				.append_pair("redirect_uri", redirect_uri.as_str());

			tracing::debug!(token = %token, "Issued authorization redirect.");

			LinkRedirect { token, redirect_uri, authorize_url }
		});

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Completes a link from the platform's callback parameters.
	///
	/// Parameter validation happens inline. The exchange and the store write then run on a
	/// detached task: if the caller stops waiting (client disconnect, timeout), the single-use
	/// code is still consumed and a successful exchange is still recorded.
	pub async fn callback(
		&self,
		code: Option<&str>,
		correlation: Option<&str>,
	) -> Result<LinkConfirmation> {
		const KIND: FlowKind = FlowKind::Callback;

		let span = FlowSpan::new(KIND, "callback");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let code = present(code);
				let correlation = present(correlation);
				let (code, correlation) = match (code, correlation) {
					(Some(code), Some(correlation)) => (code, correlation),
					(code, correlation) => {
						let missing =
							[("code", code.is_none()), ("correlation", correlation.is_none())]
								.into_iter()
								.filter_map(|(name, missing)| missing.then_some(name))
								.collect::<Vec<_>>()
								.join(", ");

						return Err(Error::MissingParameters { missing });
					},
				};
				let token =
					CorrelationToken::new(correlation).map_err(Error::InvalidCorrelationToken)?;
				let task = tokio::spawn(tracing::Instrument::instrument(
					self.clone().complete(token, code.to_owned()),
					tracing::Span::current(),
				));

				task.await?
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Reports whether `token` is linked. Never fails for malformed tokens; they are unlinked.
	pub async fn status(&self, token: &str) -> Result<LinkStatus> {
		let Ok(parsed) = CorrelationToken::new(token) else {
			return Ok(LinkStatus::new(token, None));
		};
		let record = self.store.get(&parsed).await?;

		Ok(LinkStatus::new(token, record))
	}

	async fn complete(self, token: CorrelationToken, code: String) -> Result<LinkConfirmation> {
		let redirect_uri = self.redirect_uri_for(&token);
		let identity = async {
			let access_token = self.exchange.exchange_code(&code, &redirect_uri).await?;

			self.exchange.fetch_identity(&access_token).await
		}
		.await
		.map_err(|e| {
			tracing::error!(
				token = %token,
				status = ?e.status(),
				body = e.body().unwrap_or_default(),
				error = ?e,
				"Identity exchange failed."
			);

			Error::LinkFailed(e)
		})?;
		let previous = self.store.put(LinkRecord::now(token.clone(), identity.clone())).await?;
		let relinked = match previous {
			Some(previous) if previous.chat_identity != identity => {
				tracing::info!(
					token = %token,
					previous = %previous.chat_identity,
					current = %identity,
					"Re-link replaced the previous chat identity."
				);

				true
			},
			Some(_) => true,
			None => false,
		};

		tracing::info!(token = %token, identity = %identity, relinked, "Link completed.");

		Ok(LinkConfirmation {
			message: format!(
				"Linked `{token}` to chat user {identity}. You can close this window."
			),
			token,
			chat_identity: identity,
			relinked,
		})
	}
}
impl Debug for Linker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Linker")
			.field("client_id", &self.client_id)
			.field("callback_uri", &self.callback_uri.as_str())
			.finish()
	}
}

fn present(value: Option<&str>) -> Option<&str> {
	value.filter(|value| !value.trim().is_empty())
}

fn parse_token(raw: Option<&str>) -> Result<CorrelationToken> {
	let raw = present(raw).ok_or(Error::MissingCorrelationToken)?;

	CorrelationToken::new(raw).map_err(Error::InvalidCorrelationToken)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		store::MemoryStore,
		testing::{self, StaticExchange},
	};

	fn linker(exchange: Arc<StaticExchange>) -> (Linker, MemoryStore) {
		let store = MemoryStore::default();
		let linker = Linker::new(
			PlatformDescriptor::discord().expect("Discord preset should build."),
			"client-1",
			Url::parse("https://bridge.example.com/link/callback")
				.expect("Callback fixture should parse."),
			Arc::new(store.clone()),
			exchange,
		);

		(linker, store)
	}

	#[test]
	fn initiate_requires_a_token() {
		let (linker, _) = linker(Arc::new(StaticExchange::linking("d99")));

		assert!(matches!(linker.initiate(None), Err(Error::MissingCorrelationToken)));
		assert!(matches!(linker.initiate(Some("")), Err(Error::MissingCorrelationToken)));
		assert!(matches!(linker.initiate(Some("  ")), Err(Error::MissingCorrelationToken)));
		assert!(matches!(linker.initiate(Some("p 1")), Err(Error::InvalidCorrelationToken(_))));
	}

	#[test]
	fn initiate_embeds_token_in_redirect_uri() {
		let (linker, store) = linker(Arc::new(StaticExchange::linking("d99")));
		let redirect = linker.initiate(Some("p1")).expect("Initiate should succeed.");

		assert_eq!(
			redirect.redirect_uri.as_str(),
			"https://bridge.example.com/link/callback?correlation=p1"
		);

		let pairs = redirect.authorize_url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some(redirect.redirect_uri.as_str())
		);
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-1"));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("scope").map(String::as_str), Some("identify"));
		assert!(redirect.authorize_url.as_str().contains("p1"));
		assert!(store.is_empty());
	}

	#[test]
	fn redirect_uri_escapes_reserved_characters() {
		let (linker, _) = linker(Arc::new(StaticExchange::linking("d99")));
		let token = CorrelationToken::new("a&b=c").expect("Token fixture should be valid.");

		assert_eq!(
			linker.redirect_uri_for(&token).as_str(),
			"https://bridge.example.com/link/callback?correlation=a%26b%3Dc"
		);
	}

	#[tokio::test]
	async fn callback_writes_identity_and_reuses_redirect_uri() {
		let exchange = Arc::new(StaticExchange::linking("d99"));
		let (linker, store) = linker(exchange.clone());
		let redirect = linker.initiate(Some("p1")).expect("Initiate should succeed.");
		let confirmation =
			linker.callback(Some("abc"), Some("p1")).await.expect("Callback should succeed.");

		assert_eq!(confirmation.chat_identity.as_str(), "d99");
		assert!(!confirmation.relinked);
		assert_eq!(exchange.calls(), vec![("abc".to_owned(), redirect.redirect_uri.to_string())]);

		let status = linker.status("p1").await.expect("Status should succeed.");

		assert!(status.linked);
		assert_eq!(status.chat_identity.map(String::from).as_deref(), Some("d99"));
		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn callback_without_parameters_leaves_store_untouched() {
		let exchange = Arc::new(StaticExchange::linking("d99"));
		let (linker, store) = linker(exchange.clone());
		let err = linker
			.callback(Some(""), Some("p1"))
			.await
			.expect_err("Empty code must be rejected.");

		assert!(matches!(&err, Error::MissingParameters { missing } if missing == "code"));

		let err =
			linker.callback(None, None).await.expect_err("Missing parameters must be rejected.");

		assert!(matches!(
			&err,
			Error::MissingParameters { missing } if missing == "code, correlation"
		));
		assert!(store.is_empty());
		assert!(exchange.calls().is_empty());
	}

	#[tokio::test]
	async fn failed_exchange_keeps_existing_link() {
		let (linker, store) = linker(Arc::new(StaticExchange::rejecting(400)));

		store
			.put(testing::record("p1", "d1"))
			.await
			.expect("Seeding the store should succeed.");

		let err = linker
			.callback(Some("used-code"), Some("p1"))
			.await
			.expect_err("Rejected exchange must fail the callback.");

		assert!(matches!(err, Error::LinkFailed(_)));

		let status = linker.status("p1").await.expect("Status should succeed.");

		assert_eq!(status.chat_identity.map(String::from).as_deref(), Some("d1"));
	}

	#[tokio::test]
	async fn relink_replaces_previous_identity() {
		let (first, store) = linker(Arc::new(StaticExchange::linking("d1")));

		first.callback(Some("c1"), Some("p1")).await.expect("First link should succeed.");

		let second = Linker::new(
			PlatformDescriptor::discord().expect("Discord preset should build."),
			"client-1",
			first.callback_uri.clone(),
			Arc::new(store.clone()),
			Arc::new(StaticExchange::linking("d2")),
		);
		let confirmation =
			second.callback(Some("c2"), Some("p1")).await.expect("Re-link should succeed.");

		assert!(confirmation.relinked);

		let status = second.status("p1").await.expect("Status should succeed.");

		assert_eq!(status.chat_identity.map(String::from).as_deref(), Some("d2"));
	}

	#[tokio::test]
	async fn abandoned_callback_still_records_the_link() {
		let gate = Arc::new(tokio::sync::Notify::new());
		let exchange = Arc::new(StaticExchange::linking("d99").gated_by(gate.clone()));
		let (linker, store) = linker(exchange);
		let waited = tokio::time::timeout(
			std::time::Duration::from_millis(5),
			linker.callback(Some("abc"), Some("p1")),
		)
		.await;

		assert!(waited.is_err(), "Caller should time out while the exchange is held.");
		assert!(store.is_empty());

		gate.notify_one();
		tokio::time::timeout(std::time::Duration::from_secs(5), async {
			while store.is_empty() {
				tokio::task::yield_now().await;
			}
		})
		.await
		.expect("Detached link task should finish.");

		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn status_reports_unlinked_and_malformed_tokens() {
		let (linker, _) = linker(Arc::new(StaticExchange::linking("d99")));
		let status = linker.status("nobody").await.expect("Status should succeed.");

		assert_eq!(
			serde_json::to_value(&status).expect("Status should serialize."),
			serde_json::json!({ "token": "nobody", "chatIdentity": null, "linked": false })
		);

		let status = linker.status("has space").await.expect("Status should succeed.");

		assert!(!status.linked);
		assert_eq!(status.token, "has space");
	}
}
