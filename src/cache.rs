//! Path/URL cache façade
//!
//! [`PathUrlCache`] owns the active provider and is the only thing callers
//! talk to. It normalizes incoming paths, enforces the initialization
//! lifecycle, and reports every mutation to the configured sink.
//!
//! # Lifecycle
//!
//! | State | create/remove/rename | lookups |
//! |-------|----------------------|---------|
//! | Uninitialized | `NotReady` | echo input |
//! | Initializing | `NotReady` | echo input |
//! | Ready | run | translate |
//! | Failed | `NotReady` | echo input |
//!
//! `initialize` may be called again at any time except while it is already
//! running; each call discards the old provider and its storage. It waits
//! for in-flight mutations and fetches to finish before the old storage is
//! touched, and operations started meanwhile see `NotReady`.

use crate::config::CacheConfig;
use crate::error::{PreviewError, PreviewResult};
use crate::events::{CacheEvent, ChangeSink};
use crate::mime::{ExtensionMimeResolver, MimeResolver};
use crate::path;
use crate::provider::{
    create_provider, select, Capabilities, HandleRegistry, ProviderContext, ProviderKind,
    ProviderMode, ResourceProvider,
};
use crate::store::{MemoryStoreSet, StoreSet, StoredResponse};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Initialization state of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Supplies the current project's root path
pub trait ProjectRoot: Send + Sync {
    fn project_root(&self) -> String;
}

impl ProjectRoot for String {
    fn project_root(&self) -> String {
        self.clone()
    }
}

/// Project root that can be switched between initializations
#[derive(Debug, Clone, Default)]
pub struct SharedRoot(Arc<RwLock<String>>);

impl SharedRoot {
    pub fn new(root: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(root.into())))
    }

    /// Point at a different project; takes effect on the next `initialize`
    pub fn set(&self, root: impl Into<String>) {
        *self.0.write() = root.into();
    }
}

impl ProjectRoot for SharedRoot {
    fn project_root(&self) -> String {
        self.0.read().clone()
    }
}

/// Marks initialization failed unless disarmed, so an abandoned
/// `initialize` future cannot leave the cache stuck in `Initializing`.
struct InitGuard<'a> {
    state: &'a Mutex<ProviderState>,
    armed: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.lock() = ProviderState::Failed;
        }
    }
}

/// The path/URL cache
pub struct PathUrlCache {
    origin: String,
    mode: ProviderMode,
    mirror_ephemeral: bool,
    root: Arc<dyn ProjectRoot>,
    stores: Arc<dyn StoreSet>,
    mime: Arc<dyn MimeResolver>,
    handles: Arc<HandleRegistry>,
    sink: Option<Arc<dyn ChangeSink>>,
    state: Mutex<ProviderState>,
    active: RwLock<Option<Arc<dyn ResourceProvider>>>,
    /// Shared by storage operations, exclusive for `initialize`
    gate: tokio::sync::RwLock<()>,
}

impl PathUrlCache {
    /// Create an uninitialized cache from config
    ///
    /// Defaults to an in-memory store set and the built-in MIME table.
    pub fn new(config: &CacheConfig, root: Arc<dyn ProjectRoot>) -> Self {
        Self {
            origin: config.origin.trim_end_matches('/').to_string(),
            mode: config.mode,
            mirror_ephemeral: config.mirror_ephemeral,
            root,
            stores: Arc::new(MemoryStoreSet::new()),
            mime: Arc::new(ExtensionMimeResolver),
            handles: HandleRegistry::new(config.origin.trim_end_matches('/')),
            sink: None,
            state: Mutex::new(ProviderState::Uninitialized),
            active: RwLock::new(None),
            gate: tokio::sync::RwLock::new(()),
        }
    }

    /// Use `stores` for persistent addresses
    pub fn with_store_set(mut self, stores: Arc<dyn StoreSet>) -> Self {
        self.stores = stores;
        self
    }

    pub fn with_mime_resolver(mut self, mime: Arc<dyn MimeResolver>) -> Self {
        self.mime = mime;
        self
    }

    /// Report mutations to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Share an existing handle registry (e.g. with a server resolving handles)
    pub fn with_handle_registry(mut self, handles: Arc<HandleRegistry>) -> Self {
        self.handles = handles;
        self
    }

    pub fn state(&self) -> ProviderState {
        *self.state.lock()
    }

    /// Select a provider and (re)create its storage.
    ///
    /// `mode` overrides the configured mode for this initialization only.
    pub async fn initialize(&self, mode: Option<ProviderMode>) -> PreviewResult<ProviderKind> {
        {
            let mut state = self.state.lock();
            if *state == ProviderState::Initializing {
                return Err(PreviewError::InitInProgress);
            }
            *state = ProviderState::Initializing;
        }
        let mut guard = InitGuard {
            state: &self.state,
            armed: true,
        };

        // Retire the previous provider before anything touches its storage.
        let _exclusive = self.gate.write().await;
        self.active.write().take();

        let project_root = path::normalize(&self.root.project_root());
        if !project_root.starts_with('/') {
            return Err(PreviewError::InitFailed(format!(
                "project root must be absolute, got {}",
                project_root
            )));
        }

        let mode = mode.unwrap_or(self.mode);
        let capabilities = match mode {
            ProviderMode::Auto => Capabilities::probe(self.stores.as_ref()).await,
            _ => Capabilities {
                persistent_store: false,
            },
        };
        let kind = select(capabilities, mode);
        debug!("Selected {} provider ({:?}, {:?})", kind, mode, capabilities);

        let ctx = ProviderContext {
            origin: self.origin.clone(),
            project_root: project_root.clone(),
            stores: self.stores.clone(),
            mime: self.mime.clone(),
            handles: self.handles.clone(),
            mirror_ephemeral: self.mirror_ephemeral,
        };
        let mut provider = create_provider(kind, &ctx);
        provider.init().await?;

        let base = provider.base_address().to_string();
        *self.active.write() = Some(Arc::from(provider));
        guard.armed = false;
        *self.state.lock() = ProviderState::Ready;

        info!("Cache ready: {} for {} at {}", kind, project_root, base);
        self.notify(CacheEvent::Reset {
            provider: kind.name().to_string(),
            base,
        })
        .await;
        Ok(kind)
    }

    /// Cache `content` for `path` and return its address
    pub async fn create_entry(
        &self,
        path: &str,
        content: impl Into<Vec<u8>>,
        mime: &str,
    ) -> PreviewResult<String> {
        let _shared = self.shared()?;
        let provider = self.provider()?;
        let key = path::normalize(path);

        let address = provider.create(&key, content.into(), mime).await?;
        self.notify(CacheEvent::Created {
            path: key,
            address: address.clone(),
        })
        .await;
        Ok(address)
    }

    /// Remove `path` and everything below it.
    ///
    /// On a partial failure the sink still hears about the paths that were
    /// removed before the error.
    pub async fn remove_entry(&self, path: &str) -> PreviewResult<Vec<String>> {
        let _shared = self.shared()?;
        let provider = self.provider()?;
        let key = path::normalize(path);

        match provider.remove(&key).await {
            Ok(removed) => {
                if !removed.is_empty() {
                    self.notify(CacheEvent::Removed {
                        paths: removed.clone(),
                    })
                    .await;
                }
                Ok(removed)
            }
            Err(e) => {
                if !e.removed_paths().is_empty() {
                    self.notify(CacheEvent::Removed {
                        paths: e.removed_paths().to_vec(),
                    })
                    .await;
                }
                Err(e)
            }
        }
    }

    /// Rename `old_path` to `new_path`, moving any cached descendants along.
    ///
    /// A rename that fails partway still reports the moves it made.
    pub async fn rename_entry(&self, old_path: &str, new_path: &str) -> PreviewResult<()> {
        let _shared = self.shared()?;
        let provider = self.provider()?;
        let old_key = path::normalize(old_path);
        let new_key = path::normalize(new_path);

        if old_key != new_key && path::is_within(&new_key, &old_key) {
            return Err(PreviewError::InvalidRename {
                from: old_key,
                to: new_key,
            });
        }

        match provider.rename_tree(&old_key, &new_key).await {
            Ok(moves) => {
                self.notify(CacheEvent::Renamed { moves }).await;
                Ok(())
            }
            Err(e) => {
                if !e.moved_entries().is_empty() {
                    self.notify(CacheEvent::Renamed {
                        moves: e.moved_entries().to_vec(),
                    })
                    .await;
                }
                Err(e)
            }
        }
    }

    /// Address cached for `path`, or `path` itself when there is none
    pub fn address_of(&self, path: &str) -> String {
        self.provider()
            .ok()
            .and_then(|provider| provider.address_of(&path::normalize(path)))
            .unwrap_or_else(|| path.to_string())
    }

    /// Path cached for `address`, or `address` itself when there is none.
    ///
    /// Addresses are matched exactly as given.
    pub fn path_of(&self, address: &str) -> String {
        self.provider()
            .ok()
            .and_then(|provider| provider.path_of(address))
            .unwrap_or_else(|| address.to_string())
    }

    /// Address prefix of the active provider
    pub fn base_address(&self) -> PreviewResult<String> {
        Ok(self.provider()?.base_address().to_string())
    }

    /// Whether addresses are in-process handles that need runtime rewriting
    pub fn uses_ephemeral_handles(&self) -> PreviewResult<bool> {
        Ok(self.provider()?.kind() == ProviderKind::Ephemeral)
    }

    pub fn kind(&self) -> PreviewResult<ProviderKind> {
        Ok(self.provider()?.kind())
    }

    /// Drag-out download descriptor: `<mime>:<basename>:<address>`
    pub fn download_url(&self, path: &str) -> String {
        let key = path::normalize(path);
        format!(
            "{}:{}:{}",
            self.mime.mime_for(&key),
            path::basename(&key),
            self.address_of(path)
        )
    }

    /// Content served at `address`, if the active provider has it
    pub async fn fetch(&self, address: &str) -> PreviewResult<Option<StoredResponse>> {
        let _shared = self.shared()?;
        self.provider()?.fetch(address).await
    }

    /// All cached `(path, address)` pairs; empty before initialization
    pub fn entries(&self) -> Vec<(String, String)> {
        self.provider()
            .map(|provider| provider.entries())
            .unwrap_or_default()
    }

    /// Current normalized project root
    pub fn project_root(&self) -> String {
        path::normalize(&self.root.project_root())
    }

    pub fn mime_resolver(&self) -> &Arc<dyn MimeResolver> {
        &self.mime
    }

    pub fn handle_registry(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }

    /// Shared hold on the gate; refused while `initialize` holds or awaits it
    fn shared(&self) -> PreviewResult<tokio::sync::RwLockReadGuard<'_, ()>> {
        self.gate.try_read().map_err(|_| PreviewError::NotReady)
    }

    fn provider(&self) -> PreviewResult<Arc<dyn ResourceProvider>> {
        if self.state() != ProviderState::Ready {
            return Err(PreviewError::NotReady);
        }
        self.active.read().clone().ok_or(PreviewError::NotReady)
    }

    pub(crate) async fn notify(&self, event: CacheEvent) {
        if let Some(sink) = &self.sink {
            sink.notify(&event).await;
        }
    }
}
