//! Secret wrapper that keeps credentials out of logs.

// self
use crate::_prelude::*;

/// Access token returned by the chat platform's token endpoint.
pub type AccessToken = Secret;

/// Redacted secret wrapper for client secrets, bot tokens, and access tokens.
///
/// Not `Serialize`: [`Secret::expose`] is the only way to the raw value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
