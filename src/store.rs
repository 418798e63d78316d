//! Identity mapping store: contract plus the built-in in-process backend.
//!
//! The store is the only shared mutable state in the bridge. Linking writes through
//! [`LinkStore::put`]; relaying and status queries read through [`LinkStore::get`]. An in-flight
//! link is invisible here until its callback completes.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CorrelationToken, LinkRecord},
};

/// Boxed future returned by [`LinkStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for link records.
///
/// Implementations must apply each operation atomically per token: concurrent writers for the
/// same token leave exactly one of their complete records behind.
pub trait LinkStore
where
	Self: Send + Sync,
{
	/// Stores `record`, replacing any earlier record for the same token. Returns the replaced
	/// record so callers can observe re-links.
	fn put(&self, record: LinkRecord) -> StoreFuture<'_, Option<LinkRecord>>;

	/// Fetches the current record for `token`, if any.
	fn get<'a>(&'a self, token: &'a CorrelationToken) -> StoreFuture<'a, Option<LinkRecord>>;

	/// Removes the record for `token`, returning it when present.
	fn remove<'a>(&'a self, token: &'a CorrelationToken) -> StoreFuture<'a, Option<LinkRecord>>;
}

/// Error type produced by [`LinkStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_is_exposed_as_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));

		let source =
			StdError::source(&err).expect("Bridge error should expose the store error as source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
