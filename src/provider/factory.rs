//! Provider selection and construction
//!
//! Runs once per cache initialization: probe what the runtime can do,
//! let an explicit mode override the probe, then build the chosen
//! variant.

use crate::mime::MimeResolver;
use crate::provider::ephemeral::{EphemeralHandleProvider, HandleRegistry};
use crate::provider::persistent::PersistentStoreProvider;
use crate::provider::ResourceProvider;
use crate::store::StoreSet;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Requested provider mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Prefer the persistent store when the runtime supports it
    #[default]
    Auto,
    /// Always use in-process object handles
    Ephemeral,
    /// Always use the persistent store
    Persistent,
}

/// The provider variant actually in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ephemeral,
    Persistent,
}

impl ProviderKind {
    /// Get a human-readable provider name
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Ephemeral => "ephemeral handles",
            ProviderKind::Persistent => "persistent store",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of probing the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// A persistent request/response store can be opened
    pub persistent_store: bool,
}

impl Capabilities {
    /// Probe `stores` for persistent-store support
    pub async fn probe(stores: &dyn StoreSet) -> Self {
        Self {
            persistent_store: stores.is_available().await,
        }
    }
}

/// Pick a provider variant. An explicit mode always wins over the probe.
pub fn select(capabilities: Capabilities, mode: ProviderMode) -> ProviderKind {
    match mode {
        ProviderMode::Ephemeral => ProviderKind::Ephemeral,
        ProviderMode::Persistent => ProviderKind::Persistent,
        ProviderMode::Auto if capabilities.persistent_store => ProviderKind::Persistent,
        ProviderMode::Auto => ProviderKind::Ephemeral,
    }
}

/// Everything a provider needs to be built
#[derive(Clone)]
pub struct ProviderContext {
    pub origin: String,
    pub project_root: String,
    pub stores: Arc<dyn StoreSet>,
    pub mime: Arc<dyn MimeResolver>,
    pub handles: Arc<HandleRegistry>,
    /// Mirror ephemeral content into the store, best effort
    pub mirror_ephemeral: bool,
}

/// Build an uninitialized provider of the given kind
pub fn create_provider(kind: ProviderKind, ctx: &ProviderContext) -> Box<dyn ResourceProvider> {
    match kind {
        ProviderKind::Ephemeral => {
            let provider = EphemeralHandleProvider::new(ctx.handles.clone(), ctx.mime.clone());
            if ctx.mirror_ephemeral {
                Box::new(provider.with_mirror(
                    ctx.stores.clone(),
                    &ctx.origin,
                    &ctx.project_root,
                ))
            } else {
                Box::new(provider)
            }
        }
        ProviderKind::Persistent => Box::new(PersistentStoreProvider::new(
            ctx.stores.clone(),
            ctx.mime.clone(),
            &ctx.origin,
            &ctx.project_root,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::ExtensionMimeResolver;
    use crate::store::{DiskStoreSet, MemoryStoreSet};

    const SUPPORTED: Capabilities = Capabilities {
        persistent_store: true,
    };
    const UNSUPPORTED: Capabilities = Capabilities {
        persistent_store: false,
    };

    fn context() -> ProviderContext {
        ProviderContext {
            origin: "http://localhost:8000".to_string(),
            project_root: "/project".to_string(),
            stores: Arc::new(MemoryStoreSet::new()),
            mime: Arc::new(ExtensionMimeResolver),
            handles: HandleRegistry::new("http://localhost:8000"),
            mirror_ephemeral: false,
        }
    }

    #[test]
    fn auto_prefers_persistent_when_available() {
        assert_eq!(select(SUPPORTED, ProviderMode::Auto), ProviderKind::Persistent);
        assert_eq!(select(UNSUPPORTED, ProviderMode::Auto), ProviderKind::Ephemeral);
    }

    #[test]
    fn override_wins_over_probe() {
        assert_eq!(select(SUPPORTED, ProviderMode::Ephemeral), ProviderKind::Ephemeral);
        assert_eq!(select(UNSUPPORTED, ProviderMode::Persistent), ProviderKind::Persistent);
    }

    #[test]
    fn created_provider_matches_kind() {
        let ctx = context();
        for kind in [ProviderKind::Ephemeral, ProviderKind::Persistent] {
            assert_eq!(create_provider(kind, &ctx).kind(), kind);
        }
        assert_eq!(
            create_provider(ProviderKind::Persistent, &ctx).base_address(),
            "http://localhost:8000/dist/vfs/project/"
        );
        assert_eq!(
            create_provider(ProviderKind::Ephemeral, &ctx).base_address(),
            "http://localhost:8000/"
        );
    }

    #[tokio::test]
    async fn probe_reflects_store_set() {
        assert!(Capabilities::probe(&MemoryStoreSet::new()).await.persistent_store);

        let temp = tempfile::TempDir::new().unwrap();
        let blocked = temp.path().join("file");
        std::fs::write(&blocked, b"x").unwrap();
        let caps = Capabilities::probe(&DiskStoreSet::new(blocked)).await;
        assert!(!caps.persistent_store);
    }

    #[test]
    fn mode_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ProviderMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"ephemeral\"").unwrap();
        assert_eq!(parsed.mode, ProviderMode::Ephemeral);
    }
}
