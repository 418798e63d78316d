//! Chat-session capability: look a user up and send them a direct message.
//!
//! The relay dispatcher only depends on [`ChatSession`]. [`DiscordSession`] implements it over
//! the platform's REST API with a bot token; tests substitute in-process doubles.

pub mod commands;
#[cfg(feature = "reqwest")] pub mod discord;

#[cfg(feature = "reqwest")] pub use discord::DiscordSession;

// self
use crate::{_prelude::*, auth::ChatIdentity, error::SessionError};

/// Boxed future returned by [`ChatSession`] operations.
pub type SessionFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, SessionError>> + 'a + Send>>;

/// Chat user resolved by [`ChatSession::lookup_user`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
	/// Platform user id.
	pub id: ChatIdentity,
	/// Display handle, when the platform reports one.
	#[serde(default)]
	pub username: Option<String>,
}
impl ChatUser {
	/// Creates a user without a display handle.
	pub fn new(id: ChatIdentity) -> Self {
		Self { id, username: None }
	}
}

/// Outbound half of the chat-platform session.
///
/// Neither operation is retried: a repeated send can surface as a duplicate visible message.
pub trait ChatSession
where
	Self: Send + Sync,
{
	/// Resolves `identity` to a reachable user. `Ok(None)` means the platform does not know it.
	fn lookup_user<'a>(&'a self, identity: &'a ChatIdentity) -> SessionFuture<'a, Option<ChatUser>>;

	/// Delivers `body` to `user` as a direct message.
	fn send_direct<'a>(&'a self, user: &'a ChatUser, body: &'a str) -> SessionFuture<'a, ()>;
}
