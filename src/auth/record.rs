//! Link record stored per correlation token.

// self
use crate::{
	_prelude::*,
	auth::{ChatIdentity, CorrelationToken},
};

/// Completed link between a correlation token and a chat identity.
///
/// One record exists per token; a later successful link replaces it wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
	/// Token supplied when the flow was initiated.
	pub correlation_token: CorrelationToken,
	/// Identity returned by the platform's identity endpoint.
	pub chat_identity: ChatIdentity,
	/// Instant the callback completed.
	#[serde(with = "time::serde::rfc3339")]
	pub linked_at: OffsetDateTime,
}
impl LinkRecord {
	/// Creates a record stamped with the provided instant.
	pub fn new(
		correlation_token: CorrelationToken,
		chat_identity: ChatIdentity,
		linked_at: OffsetDateTime,
	) -> Self {
		Self { correlation_token, chat_identity, linked_at }
	}

	/// Creates a record stamped with the current UTC instant.
	pub fn now(correlation_token: CorrelationToken, chat_identity: ChatIdentity) -> Self {
		Self::new(correlation_token, chat_identity, OffsetDateTime::now_utc())
	}
}
