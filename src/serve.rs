//! Serving cached content to the preview
//!
//! Two read paths sit on top of the cache:
//! - [`intercept`] answers a fetch from the active provider's storage,
//!   or lets it go to the network.
//! - [`XhrBridge`] answers XHR reads from the virtual filesystem. Ephemeral
//!   handle documents cannot issue relative requests themselves, so the
//!   preview forwards them here instead.

use crate::cache::PathUrlCache;
use crate::error::PreviewError;
use crate::path;
use crate::provider::ProviderKind;
use crate::store::StoredResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Message and response tag for bridged XHR reads
pub const XHR_METHOD: &str = "XMLHttpRequest";

/// Outcome of intercepting a fetch
#[derive(Debug)]
pub enum Interception {
    /// The cache holds this URL
    Cached(StoredResponse),
    /// Not cached; fetch it from the network
    Passthrough,
}

/// Answer a fetch for `url` from cache storage when possible.
///
/// Never fails: lookup errors are logged and treated as a miss.
pub async fn intercept(cache: &PathUrlCache, url: &str) -> Interception {
    match cache.fetch(url).await {
        Ok(Some(response)) => Interception::Cached(response),
        Ok(None) => Interception::Passthrough,
        Err(PreviewError::NotReady) => {
            debug!("Cache not ready, passing {} through", url);
            Interception::Passthrough
        }
        Err(e) => {
            warn!("Cache lookup for {} failed: {}", url, e);
            Interception::Passthrough
        }
    }
}

/// Whether documents need the XHR rewriting script injected.
///
/// Only ephemeral handles break relative requests; before initialization
/// nothing is injected.
pub fn needs_remote_script(cache: &PathUrlCache) -> bool {
    cache.kind().ok() == Some(ProviderKind::Ephemeral)
}

/// Whether a preview message is a bridged XHR request
pub fn is_xhr_request(message: &str) -> bool {
    message == XHR_METHOD
}

/// Text reads from the virtual filesystem
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read the file at a canonical virtual path as UTF-8
    async fn read_text(&self, path: &str) -> io::Result<String>;
}

/// Maps the virtual project root onto a host directory
#[derive(Debug, Clone)]
pub struct HostFileSource {
    project_root: String,
    host_root: PathBuf,
}

impl HostFileSource {
    pub fn new(project_root: &str, host_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: path::normalize(project_root),
            host_root: host_root.into(),
        }
    }

    /// Host location for a virtual path, if it lies inside the project
    pub fn host_path(&self, virtual_path: &str) -> Option<PathBuf> {
        let virtual_path = path::normalize(virtual_path);
        if !path::is_within(&virtual_path, &self.project_root) {
            return None;
        }

        let relative = path::relative_to(&virtual_path, &self.project_root);
        Some(
            relative
                .split('/')
                .filter(|segment| !segment.is_empty())
                .fold(self.host_root.clone(), |host, segment| host.join(segment)),
        )
    }
}

#[async_trait]
impl FileSource for HostFileSource {
    async fn read_text(&self, path: &str) -> io::Result<String> {
        let host = self.host_path(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} is outside the project", path))
        })?;
        tokio::fs::read_to_string(host).await
    }
}

/// Reply sent back to the preview for a bridged XHR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XhrResponse {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl XhrResponse {
    fn content(content: String) -> Self {
        Self {
            method: XHR_METHOD.to_string(),
            content: Some(content),
            error: None,
            status: None,
        }
    }

    fn error(status: u16, error: String) -> Self {
        Self {
            method: XHR_METHOD.to_string(),
            content: None,
            error: Some(error),
            status: Some(status),
        }
    }
}

/// Answers XHR reads relative to the document being previewed
pub struct XhrBridge<F: FileSource> {
    source: F,
}

impl<F: FileSource> XhrBridge<F> {
    pub fn new(source: F) -> Self {
        Self { source }
    }

    /// Resolve `requested` against the document at `document_address`
    ///
    /// When the document address is not a cached one the request is
    /// resolved against the project root.
    pub fn resolve(&self, cache: &PathUrlCache, document_address: &str, requested: &str) -> String {
        let document = cache.path_of(document_address);
        let dir = if document != document_address {
            path::dirname(&document).to_string()
        } else {
            cache.project_root()
        };
        path::resolve(&dir, &path::normalize(requested))
    }

    /// Read `requested` and build the reply
    pub async fn handle(
        &self,
        cache: &PathUrlCache,
        document_address: &str,
        requested: &str,
    ) -> XhrResponse {
        let target = self.resolve(cache, document_address, requested);

        match self.source.read_text(&target).await {
            Ok(content) => XhrResponse::content(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("XHR for missing {}", target);
                XhrResponse::error(404, format!("No resource found for `{}`", target))
            }
            Err(e) => {
                warn!("XHR read of {} failed: {}", target, e);
                XhrResponse::error(500, "Could not complete the request".to_string())
            }
        }
    }
}
