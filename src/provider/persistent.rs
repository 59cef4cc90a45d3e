//! Store-backed provider with deterministic addresses
//!
//! Addresses are `base + root-relative path`, so a network-intercepting
//! layer can recompute any address without asking the cache. The index
//! only changes after the store has confirmed the matching write or
//! delete; a failed operation never leaves an entry pointing at nothing.

use crate::error::{PreviewError, PreviewResult};
use crate::mime::MimeResolver;
use crate::path;
use crate::provider::factory::ProviderKind;
use crate::provider::index::PathIndex;
use crate::provider::{plan_tree_moves, rename_failed, ResourceProvider};
use crate::store::{BackingStore, StoreSet, StoredRequest, StoredResponse};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Name of the store scoped to `project_root`
pub fn store_name(project_root: &str) -> String {
    path::join("vfs", project_root)
}

/// Address prefix for `project_root` served from `origin`
pub fn base_address(origin: &str, project_root: &str) -> String {
    let root = project_root.trim_matches('/');
    let origin = origin.trim_end_matches('/');
    if root.is_empty() {
        format!("{}/dist/vfs/", origin)
    } else {
        format!("{}/dist/vfs/{}/", origin, path::encode_segments(root))
    }
}

/// Deterministic address for `path` under `base`
pub fn address_for(base: &str, project_root: &str, path: &str) -> String {
    format!(
        "{}{}",
        base,
        path::encode_segments(path::relative_to(path, project_root))
    )
}

/// Provider backed by a named request/response store
pub struct PersistentStoreProvider {
    stores: Arc<dyn StoreSet>,
    store: Option<Arc<dyn BackingStore>>,
    mime: Arc<dyn MimeResolver>,
    project_root: String,
    store_name: String,
    base: String,
    index: RwLock<PathIndex>,
    ops: tokio::sync::Mutex<()>,
}

impl PersistentStoreProvider {
    pub fn new(
        stores: Arc<dyn StoreSet>,
        mime: Arc<dyn MimeResolver>,
        origin: &str,
        project_root: &str,
    ) -> Self {
        Self {
            stores,
            store: None,
            mime,
            project_root: project_root.to_string(),
            store_name: store_name(project_root),
            base: base_address(origin, project_root),
            index: RwLock::new(PathIndex::new()),
            ops: tokio::sync::Mutex::new(()),
        }
    }

    /// Address this provider generates for `path`, cached or not
    pub fn address_for(&self, path: &str) -> String {
        address_for(&self.base, &self.project_root, path)
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    fn store(&self) -> PreviewResult<&Arc<dyn BackingStore>> {
        self.store.as_ref().ok_or(PreviewError::NotReady)
    }

    /// Sequential subtree removal. Caller holds the operation lock.
    async fn remove_locked(&self, path: &str) -> PreviewResult<Vec<String>> {
        let store = self.store()?;
        let candidates = self.index.read().subtree(path);
        let mut removed = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let address = self.index.read().address_of(&candidate).map(str::to_string);
            let Some(address) = address else {
                continue;
            };

            if let Err(e) = store.delete(&address).await {
                return Err(PreviewError::StorageDeleteFailed {
                    path: candidate,
                    removed,
                    reason: e.to_string(),
                });
            }

            self.index.write().remove(&candidate);
            debug!("Removed {} ({})", candidate, address);
            removed.push(candidate);
        }

        Ok(removed)
    }

    /// Read, re-store under the new address, then drop the old subtree.
    /// Caller holds the operation lock.
    async fn rename_locked(&self, old_path: &str, new_path: &str) -> PreviewResult<()> {
        let store = self.store()?;
        let old_url = self
            .index
            .read()
            .address_of(old_path)
            .map(str::to_string)
            .ok_or_else(|| PreviewError::RenameSourceMissing(old_path.to_string()))?;

        if old_path == new_path {
            return Ok(());
        }

        let response = store
            .lookup(&old_url)
            .await
            .map_err(|e| PreviewError::StorageReadFailed {
                address: old_url.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| PreviewError::RenameSourceMissing(old_path.to_string()))?;

        let new_url = self.address_for(new_path);
        if new_url == old_url {
            self.index.write().insert(new_path, new_url);
            return Ok(());
        }

        let mime = self.mime.mime_for(new_path);
        store
            .put(
                StoredRequest::get(&new_url, &mime),
                response.with_content_type(&mime),
            )
            .await
            .map_err(|e| PreviewError::StorageWriteFailed {
                address: new_url.clone(),
                reason: e.to_string(),
            })?;

        self.index.write().insert(new_path, new_url.clone());
        debug!("Renamed {} -> {} ({})", old_path, new_path, new_url);

        self.remove_locked(old_path).await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceProvider for PersistentStoreProvider {
    async fn init(&mut self) -> PreviewResult<()> {
        self.index.get_mut().clear();
        self.store = None;

        let wiped = self.stores.delete(&self.store_name).await?;
        if wiped {
            debug!("Deleted stale store {}", self.store_name);
        }
        let store = self.stores.open(&self.store_name).await?;
        let leftover = store.keys().await?;
        if !leftover.is_empty() {
            return Err(PreviewError::InitFailed(format!(
                "store {} still holds {} entries after reset",
                self.store_name,
                leftover.len()
            )));
        }
        self.store = Some(store);
        debug!(
            "Opened {} store {} at {}",
            self.stores.name(),
            self.store_name,
            self.base
        );
        Ok(())
    }

    async fn create(&self, path: &str, content: Vec<u8>, mime: &str) -> PreviewResult<String> {
        let _op = self.ops.lock().await;
        let store = self.store()?;

        let url = self.address_for(path);
        store
            .put(
                StoredRequest::get(&url, mime),
                StoredResponse::synthesize(content, mime),
            )
            .await
            .map_err(|e| PreviewError::StorageWriteFailed {
                address: url.clone(),
                reason: e.to_string(),
            })?;

        self.index.write().insert(path, url.clone());
        debug!("Cached {} as {}", path, url);
        Ok(url)
    }

    async fn remove(&self, path: &str) -> PreviewResult<Vec<String>> {
        let _op = self.ops.lock().await;
        self.remove_locked(path).await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> PreviewResult<()> {
        let _op = self.ops.lock().await;
        self.rename_locked(old_path, new_path).await
    }

    async fn rename_tree(
        &self,
        old_path: &str,
        new_path: &str,
    ) -> PreviewResult<Vec<(String, String)>> {
        let _op = self.ops.lock().await;

        let keys = self.index.read().subtree(old_path);
        if keys.is_empty() {
            return Err(PreviewError::RenameSourceMissing(old_path.to_string()));
        }
        let mut moved = Vec::new();
        for (from, to) in plan_tree_moves(keys, old_path, new_path) {
            if let Err(e) = self.rename_locked(&from, &to).await {
                return Err(rename_failed(&from, moved, e));
            }
            moved.push((from, to));
        }
        Ok(moved)
    }

    async fn fetch(&self, address: &str) -> PreviewResult<Option<StoredResponse>> {
        let _op = self.ops.lock().await;
        self.store()?
            .lookup(address)
            .await
            .map_err(|e| PreviewError::StorageReadFailed {
                address: address.to_string(),
                reason: e.to_string(),
            })
    }

    fn address_of(&self, path: &str) -> Option<String> {
        self.index.read().address_of(path).map(str::to_string)
    }

    fn path_of(&self, address: &str) -> Option<String> {
        self.index.read().path_of(address).map(str::to_string)
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.index.read().entries()
    }

    fn base_address(&self) -> &str {
        &self.base
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Persistent
    }
}
