//! preview-cache - path-to-URL cache for live previews
//!
//! Maps virtual project paths onto addresses a sandboxed preview can load.
//! Addresses come from one of two providers: revocable in-process object
//! handles, or deterministic URLs backed by a persistent request/response
//! store. [`PathUrlCache`] picks one at initialization and hides which.
//!
//! ```rust,ignore
//! use preview_cache::{CacheConfig, PathUrlCache};
//! use std::sync::Arc;
//!
//! let cache = PathUrlCache::new(&CacheConfig::default(), Arc::new("/project".to_string()));
//! cache.initialize(None).await?;
//! let address = cache.create_entry("/project/index.html", "<h1>hi</h1>", "text/html").await?;
//! assert_eq!(cache.path_of(&address), "/project/index.html");
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod import;
pub mod mime;
pub mod path;
pub mod provider;
pub mod serve;
pub mod store;
pub mod ui;

pub use cache::{PathUrlCache, ProjectRoot, ProviderState, SharedRoot};
pub use config::{CacheConfig, Config};
pub use error::{PreviewError, PreviewResult};
pub use provider::{ProviderKind, ProviderMode};
