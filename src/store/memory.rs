//! Thread-safe in-memory [`LinkStore`]; mappings do not survive a restart.

// self
use crate::{
	_prelude::*,
	auth::{CorrelationToken, LinkRecord},
	store::{LinkStore, StoreFuture},
};

type LinkMap = Arc<RwLock<HashMap<CorrelationToken, LinkRecord>>>;

/// Process-local link store guarded by a single reader/writer lock.
///
/// Every operation is a map-sized critical section with no `.await` inside the guard, so a
/// coarse lock never stalls unrelated requests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(LinkMap);
impl MemoryStore {
	/// Number of linked tokens.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing has been linked yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn put_now(map: LinkMap, record: LinkRecord) -> Option<LinkRecord> {
		map.write().insert(record.correlation_token.clone(), record)
	}

	fn get_now(map: LinkMap, token: &CorrelationToken) -> Option<LinkRecord> {
		map.read().get(token).cloned()
	}

	fn remove_now(map: LinkMap, token: &CorrelationToken) -> Option<LinkRecord> {
		map.write().remove(token)
	}
}
impl LinkStore for MemoryStore {
	fn put(&self, record: LinkRecord) -> StoreFuture<'_, Option<LinkRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::put_now(map, record)) })
	}

	fn get<'a>(&'a self, token: &'a CorrelationToken) -> StoreFuture<'a, Option<LinkRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, token)) })
	}

	fn remove<'a>(&'a self, token: &'a CorrelationToken) -> StoreFuture<'a, Option<LinkRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::remove_now(map, token)) })
	}
}
