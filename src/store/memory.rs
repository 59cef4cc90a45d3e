//! In-process store set

use crate::error::PreviewResult;
use crate::store::{BackingStore, StoreSet, StoredRequest, StoredResponse};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// A single in-memory request/response table
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (StoredRequest, StoredResponse)>>,
}

impl MemoryStore {
    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn put(&self, request: StoredRequest, response: StoredResponse) -> PreviewResult<()> {
        self.entries
            .write()
            .insert(request.url.clone(), (request, response));
        Ok(())
    }

    async fn lookup(&self, url: &str) -> PreviewResult<Option<StoredResponse>> {
        Ok(self.entries.read().get(url).map(|(_, resp)| resp.clone()))
    }

    async fn delete(&self, url: &str) -> PreviewResult<bool> {
        Ok(self.entries.write().remove(url).is_some())
    }

    async fn keys(&self) -> PreviewResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Named in-memory stores, shared by every provider built from this set
#[derive(Debug, Default)]
pub struct MemoryStoreSet {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStoreSet {
    /// Create an empty store set
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct handle on a named store, if it exists
    pub fn get(&self, name: &str) -> Option<Arc<MemoryStore>> {
        self.stores.lock().get(name).cloned()
    }

    /// Names of all open stores
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl StoreSet for MemoryStoreSet {
    async fn is_available(&self) -> bool {
        true
    }

    async fn open(&self, name: &str) -> PreviewResult<Arc<dyn BackingStore>> {
        let store: Arc<dyn BackingStore> = self
            .stores
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(store)
    }

    async fn delete(&self, name: &str) -> PreviewResult<bool> {
        Ok(self.stores.lock().remove(name).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
