//! Ephemeral object-handle provider
//!
//! Hands out `blob:` style handles that only resolve inside the current
//! process. Each handle is owned by exactly one index entry; dropping the
//! entry revokes the handle, so retiring, removing and re-initializing can
//! never leak one.

use crate::error::{PreviewError, PreviewResult};
use crate::mime::MimeResolver;
use crate::provider::factory::ProviderKind;
use crate::provider::index::{Address, PathIndex};
use crate::provider::persistent;
use crate::provider::{plan_tree_moves, rename_failed, ResourceProvider};
use crate::store::{BackingStore, StoreSet, StoredRequest, StoredResponse};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use uuid::Uuid;

/// Process-wide table of live object handles
#[derive(Debug)]
pub struct HandleRegistry {
    origin: String,
    objects: Mutex<HashMap<String, StoredResponse>>,
}

impl HandleRegistry {
    /// Create a registry minting handles for `origin`
    pub fn new(origin: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        })
    }

    /// Mint a new handle for `content`. Every call yields a distinct URL.
    pub fn create_object_url(self: &Arc<Self>, content: Vec<u8>, mime: &str) -> ObjectHandle {
        let url = format!("blob:{}/{}", self.origin, Uuid::new_v4());
        self.objects
            .lock()
            .insert(url.clone(), StoredResponse::synthesize(content, mime));
        ObjectHandle {
            url,
            registry: Arc::downgrade(self),
        }
    }

    /// Content behind a live handle
    pub fn resolve(&self, url: &str) -> Option<StoredResponse> {
        self.objects.lock().get(url).cloned()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.objects.lock().contains_key(url)
    }

    /// Number of handles not yet revoked
    pub fn live_count(&self) -> usize {
        self.objects.lock().len()
    }

    fn revoke(&self, url: &str) -> bool {
        self.objects.lock().remove(url).is_some()
    }
}

/// Owned object handle; revoked when dropped
#[derive(Debug)]
pub struct ObjectHandle {
    url: String,
    registry: Weak<HandleRegistry>,
}

impl ObjectHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Revoke now instead of at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl Address for ObjectHandle {
    fn as_address(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.revoke(&self.url) {
                debug!("Revoked handle {}", self.url);
            }
        }
    }
}

/// Best-effort copy of ephemeral content into a persistent store
struct Mirror {
    stores: Arc<dyn StoreSet>,
    store: Option<Arc<dyn BackingStore>>,
    base: String,
    root: String,
}

impl Mirror {
    fn address_for(&self, path: &str) -> String {
        persistent::address_for(&self.base, &self.root, path)
    }

    async fn open(&mut self) {
        let name = persistent::store_name(&self.root);
        if let Err(e) = self.stores.delete(&name).await {
            warn!("Failed to reset mirror store {}: {}", name, e);
        }
        match self.stores.open(&name).await {
            Ok(store) => self.store = Some(store),
            Err(e) => {
                warn!("Mirror store unavailable, continuing without it: {}", e);
                self.store = None;
            }
        }
    }

    async fn put(&self, path: &str, response: StoredResponse, mime: &str) {
        let Some(store) = &self.store else { return };
        let url = self.address_for(path);
        if let Err(e) = store
            .put(StoredRequest::get(&url, mime), response.with_content_type(mime))
            .await
        {
            warn!("Failed to mirror {} to {}: {}", path, url, e);
        }
    }

    async fn delete(&self, path: &str) {
        let Some(store) = &self.store else { return };
        let url = self.address_for(path);
        if let Err(e) = store.delete(&url).await {
            warn!("Failed to drop mirrored {}: {}", url, e);
        }
    }
}

/// Provider backed by revocable in-process handles
pub struct EphemeralHandleProvider {
    registry: Arc<HandleRegistry>,
    base: String,
    mime: Arc<dyn MimeResolver>,
    index: RwLock<PathIndex<ObjectHandle>>,
    ops: tokio::sync::Mutex<()>,
    mirror: Option<Mirror>,
}

impl EphemeralHandleProvider {
    /// Create a provider minting handles from `registry`
    pub fn new(registry: Arc<HandleRegistry>, mime: Arc<dyn MimeResolver>) -> Self {
        let base = format!("{}/", registry.origin);
        Self {
            registry,
            base,
            mime,
            index: RwLock::new(PathIndex::new()),
            ops: tokio::sync::Mutex::new(()),
            mirror: None,
        }
    }

    /// Also write every entry to `stores` under its persistent address.
    ///
    /// Mirror failures are logged and never fail the operation.
    pub fn with_mirror(mut self, stores: Arc<dyn StoreSet>, origin: &str, root: &str) -> Self {
        self.mirror = Some(Mirror {
            stores,
            store: None,
            base: persistent::base_address(origin, root),
            root: root.to_string(),
        });
        self
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Drop the exact entry for `path`, revoking its handle
    fn retire(&self, path: &str) -> bool {
        match self.index.write().remove(path) {
            Some(handle) => {
                debug!("Retiring {} ({})", path, handle.url());
                handle.release();
                true
            }
            None => false,
        }
    }

    async fn rename_locked(&self, old_path: &str, new_path: &str) -> PreviewResult<()> {
        if old_path == new_path {
            return if self.index.read().contains(old_path) {
                Ok(())
            } else {
                Err(PreviewError::RenameSourceMissing(old_path.to_string()))
            };
        }

        let url = {
            let mut index = self.index.write();
            let handle = index
                .remove(old_path)
                .ok_or_else(|| PreviewError::RenameSourceMissing(old_path.to_string()))?;
            let url = handle.url().to_string();
            if let Some(displaced) = index.insert(new_path, handle) {
                debug!("Rename onto {} retires {}", new_path, displaced.url());
                displaced.release();
            }
            url
        };
        debug!("Relabeled {} -> {} ({})", old_path, new_path, url);

        if let Some(mirror) = &self.mirror {
            mirror.delete(old_path).await;
            if let Some(response) = self.registry.resolve(&url) {
                let mime = self.mime.mime_for(new_path);
                mirror.put(new_path, response, &mime).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceProvider for EphemeralHandleProvider {
    async fn init(&mut self) -> PreviewResult<()> {
        let revoked = self.index.get_mut().clear().len();
        if revoked > 0 {
            debug!("Revoked {} handles on init", revoked);
        }
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.open().await;
        }
        Ok(())
    }

    async fn create(&self, path: &str, content: Vec<u8>, mime: &str) -> PreviewResult<String> {
        let _op = self.ops.lock().await;

        let mirrored = self.mirror.as_ref().map(|_| content.clone());
        let handle = self.registry.create_object_url(content, mime);
        let url = handle.url().to_string();

        self.retire(path);
        self.index.write().insert(path, handle);
        debug!("Cached {} as {}", path, url);

        if let (Some(mirror), Some(body)) = (&self.mirror, mirrored) {
            mirror
                .put(path, StoredResponse::synthesize(body, mime), mime)
                .await;
        }
        Ok(url)
    }

    async fn remove(&self, path: &str) -> PreviewResult<Vec<String>> {
        let _op = self.ops.lock().await;

        let removed = {
            let mut index = self.index.write();
            let keys = index.subtree(path);
            for key in &keys {
                if let Some(handle) = index.remove(key) {
                    handle.release();
                }
            }
            keys
        };

        if let Some(mirror) = &self.mirror {
            for key in &removed {
                mirror.delete(key).await;
            }
        }
        if !removed.is_empty() {
            debug!("Removed {} entries under {}", removed.len(), path);
        }
        Ok(removed)
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
        Ok(self.registry.resolve(address))
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
        ProviderKind::Ephemeral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::ExtensionMimeResolver;
    use crate::store::MemoryStoreSet;

    fn provider() -> (Arc<HandleRegistry>, EphemeralHandleProvider) {
        let registry = HandleRegistry::new("http://localhost:8000");
        let provider =
            EphemeralHandleProvider::new(registry.clone(), Arc::new(ExtensionMimeResolver));
        (registry, provider)
    }

    #[test]
    fn dropping_a_handle_revokes_it_once() {
        let registry = HandleRegistry::new("http://h");
        let handle = registry.create_object_url(b"x".to_vec(), "text/plain");
        let url = handle.url().to_string();
        assert!(url.starts_with("blob:http://h/"));
        assert!(registry.is_live(&url));

        handle.release();
        assert!(!registry.is_live(&url));
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn overwrite_retires_previous_handle() {
        let (registry, mut provider) = provider();
        provider.init().await.unwrap();

        let first = provider
            .create("/p/a.html", b"one".to_vec(), "text/html")
            .await
            .unwrap();
        let second = provider
            .create("/p/a.html", b"two".to_vec(), "text/html")
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(provider.len(), 1);
        assert_eq!(provider.path_of(&first), None);
        assert_eq!(provider.path_of(&second).as_deref(), Some("/p/a.html"));
        assert!(!registry.is_live(&first));
        assert_eq!(registry.live_count(), 1);
    }

    #[tokio::test]
    async fn remove_cascades_and_releases() {
        let (registry, mut provider) = provider();
        provider.init().await.unwrap();
        for path in ["/a", "/a/b", "/a/c/d", "/ab"] {
            provider.create(path, vec![], "text/plain").await.unwrap();
        }

        let removed = provider.remove("/a").await.unwrap();
        assert_eq!(removed, vec!["/a", "/a/b", "/a/c/d"]);
        assert!(provider.address_of("/ab").is_some());
        assert_eq!(registry.live_count(), 1);

        assert!(provider.remove("/missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_relabels_without_new_handle() {
        let (registry, mut provider) = provider();
        provider.init().await.unwrap();
        let url = provider
            .create("/p/a.css", b"a{}".to_vec(), "text/css")
            .await
            .unwrap();

        provider.rename("/p/a.css", "/p/b.css").await.unwrap();
        assert_eq!(provider.address_of("/p/a.css"), None);
        assert_eq!(provider.address_of("/p/b.css").as_deref(), Some(url.as_str()));
        assert_eq!(provider.path_of(&url).as_deref(), Some("/p/b.css"));
        assert!(registry.is_live(&url));

        let err = provider.rename("/p/a.css", "/p/c.css").await.unwrap_err();
        assert!(matches!(err, PreviewError::RenameSourceMissing(_)));
    }

    #[tokio::test]
    async fn rename_is_exact_path_only() {
        let (_registry, mut provider) = provider();
        provider.init().await.unwrap();
        provider.create("/d", vec![], "text/plain").await.unwrap();
        provider.create("/d/x", vec![], "text/plain").await.unwrap();

        provider.rename("/d", "/e").await.unwrap();
        assert!(provider.address_of("/e").is_some());
        assert!(provider.address_of("/d/x").is_some());
        assert!(provider.address_of("/e/x").is_none());
    }

    #[tokio::test]
    async fn rename_tree_moves_descendants() {
        let (_registry, mut provider) = provider();
        provider.init().await.unwrap();
        provider.create("/d/x", vec![], "text/plain").await.unwrap();
        provider.create("/d/y/z", vec![], "text/plain").await.unwrap();
        provider.create("/dx", vec![], "text/plain").await.unwrap();

        let moves = provider.rename_tree("/d", "/e").await.unwrap();
        assert_eq!(moves.len(), 2);
        assert!(provider.address_of("/e/x").is_some());
        assert!(provider.address_of("/e/y/z").is_some());
        assert!(provider.address_of("/d/x").is_none());
        assert!(provider.address_of("/dx").is_some());
    }

    #[tokio::test]
    async fn init_revokes_everything() {
        let (registry, mut provider) = provider();
        provider.init().await.unwrap();
        let url = provider
            .create("/p/a", vec![1], "text/plain")
            .await
            .unwrap();

        provider.init().await.unwrap();
        assert!(provider.is_empty());
        assert!(!registry.is_live(&url));
        assert_eq!(provider.path_of(&url), None);
    }

    #[tokio::test]
    async fn fetch_resolves_live_handles() {
        let (_registry, mut provider) = provider();
        provider.init().await.unwrap();
        let url = provider
            .create("/p/a.txt", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();

        let response = provider.fetch(&url).await.unwrap().unwrap();
        assert_eq!(response.body, b"hello");
        assert_eq!(response.content_type(), Some("text/plain"));
        assert!(provider.fetch("blob:nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mirror_writes_persistent_copies() {
        let stores = Arc::new(MemoryStoreSet::new());
        let registry = HandleRegistry::new("http://h");
        let mut provider =
            EphemeralHandleProvider::new(registry, Arc::new(ExtensionMimeResolver))
                .with_mirror(stores.clone(), "http://h", "/p");
        provider.init().await.unwrap();

        provider
            .create("/p/a.html", b"<b>".to_vec(), "text/html")
            .await
            .unwrap();
        let store = stores.get("vfs/p").unwrap();
        assert_eq!(store.len(), 1);

        provider.rename("/p/a.html", "/p/b.txt").await.unwrap();
        let moved = store
            .lookup("http://h/dist/vfs/p/b.txt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.content_type(), Some("text/plain"));

        provider.remove("/p").await.unwrap();
        assert!(store.is_empty());
    }
}
