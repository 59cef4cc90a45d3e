//! Store set persisted under the state directory
//!
//! Layout: `<root>/<sha256(store name)>/` holds one `<sha256(url)>.json`
//! metadata file and one `<sha256(url)>.body` file per entry. The metadata
//! file is written last and removed first, so its presence marks a
//! complete entry.

use crate::error::{PreviewError, PreviewResult};
use crate::store::{BackingStore, StoreSet, StoredRequest, StoredResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

const PROBE_FILE: &str = ".probe";
const NAME_FILE: &str = "NAME";

/// Metadata persisted alongside each body file
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    request: StoredRequest,
    response: StoredResponse,
}

fn digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// One store directory
#[derive(Debug)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    fn meta_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", digest(url)))
    }

    fn body_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.body", digest(url)))
    }

    /// Directory backing this store
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl BackingStore for DiskStore {
    async fn put(&self, request: StoredRequest, response: StoredResponse) -> PreviewResult<()> {
        let meta_path = self.meta_path(&request.url);
        let body_path = self.body_path(&request.url);

        fs::write(&body_path, &response.body).await.map_err(|e| {
            PreviewError::io(format!("writing store body {}", body_path.display()), e)
        })?;

        let content = serde_json::to_string_pretty(&EntryMeta { request, response })?;
        fs::write(&meta_path, content).await.map_err(|e| {
            PreviewError::io(format!("writing store entry {}", meta_path.display()), e)
        })?;

        Ok(())
    }

    async fn lookup(&self, url: &str) -> PreviewResult<Option<StoredResponse>> {
        let meta_path = self.meta_path(url);
        let content = match fs::read_to_string(&meta_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PreviewError::io(
                    format!("reading store entry {}", meta_path.display()),
                    e,
                ))
            }
        };

        let meta: EntryMeta = serde_json::from_str(&content)?;
        let body_path = self.body_path(url);
        let body = fs::read(&body_path).await.map_err(|e| {
            PreviewError::io(format!("reading store body {}", body_path.display()), e)
        })?;

        Ok(Some(StoredResponse { body, ..meta.response }))
    }

    async fn delete(&self, url: &str) -> PreviewResult<bool> {
        let meta_path = self.meta_path(url);
        let existed = match fs::remove_file(&meta_path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(PreviewError::io(
                    format!("removing store entry {}", meta_path.display()),
                    e,
                ))
            }
        };

        let body_path = self.body_path(url);
        match fs::remove_file(&body_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PreviewError::io(
                    format!("removing store body {}", body_path.display()),
                    e,
                ))
            }
        }

        Ok(existed)
    }

    async fn keys(&self) -> PreviewResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| PreviewError::io("reading store directory", e))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PreviewError::io("reading store entry", e))?
        {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(entry.path())
                    .await
                    .map_err(|e| PreviewError::io("reading store entry", e))?;
                let meta: EntryMeta = serde_json::from_str(&content)?;
                keys.push(meta.request.url);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Named stores under one root directory
#[derive(Debug, Clone)]
pub struct DiskStoreSet {
    root: PathBuf,
}

impl DiskStoreSet {
    /// Create a store set rooted at `root`; nothing is touched until used
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this set
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(digest(name))
    }
}

#[async_trait]
impl StoreSet for DiskStoreSet {
    async fn is_available(&self) -> bool {
        if fs::create_dir_all(&self.root).await.is_err() {
            return false;
        }
        let probe = self.root.join(PROBE_FILE);
        let writable = fs::write(&probe, b"ok").await.is_ok();
        let _ = fs::remove_file(&probe).await;
        writable
    }

    async fn open(&self, name: &str) -> PreviewResult<Arc<dyn BackingStore>> {
        let dir = self.store_dir(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PreviewError::StoreUnavailable {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        fs::write(dir.join(NAME_FILE), name)
            .await
            .map_err(|e| PreviewError::StoreUnavailable {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Opened disk store {} at {}", name, dir.display());
        Ok(Arc::new(DiskStore { dir }))
    }

    async fn delete(&self, name: &str) -> PreviewResult<bool> {
        let dir = self.store_dir(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PreviewError::StoreUnavailable {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}
