//! Content-blob cache
//!
//! Write-once, read-many cache keyed by lowercase-hex SHA-256. Concurrent
//! writers for the same key always produce identical bytes (the key *is*
//! the hash of the bytes), so last-writer-wins is safe - no locking beyond
//! what the map itself needs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared, thread-safe content-blob store.
#[derive(Clone, Default)]
pub struct BlobCache {
	inner: Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>,
}

impl BlobCache {
	pub fn new() -> Self {
		BlobCache::default()
	}

	/// Fetch a cached blob by hash, if present.
	pub fn get(&self, hash: &str) -> Option<Arc<Vec<u8>>> {
		self.inner.read().expect("blob cache lock poisoned").get(hash).cloned()
	}

	/// Insert (or confirm) a blob under its content hash.
	pub fn insert(&self, hash: String, bytes: Vec<u8>) -> Arc<Vec<u8>> {
		let arc = Arc::new(bytes);
		self.inner.write().expect("blob cache lock poisoned").insert(hash, arc.clone());
		arc
	}

	pub fn len(&self) -> usize {
		self.inner.read().expect("blob cache lock poisoned").len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}


// vim: ts=4
