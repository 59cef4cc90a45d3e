//! Error types for preview-cache
//!
//! All modules use `PreviewResult<T>` as their return type. Lookup misses
//! are never errors: `address_of` / `path_of` echo their input instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for preview-cache operations
pub type PreviewResult<T> = Result<T, PreviewError>;

/// All errors that can occur in preview-cache
#[derive(Error, Debug)]
pub enum PreviewError {
    // Lifecycle errors
    #[error("Cache is not initialized")]
    NotReady,

    #[error("Cache initialization already in progress")]
    InitInProgress,

    #[error("Cache initialization failed: {0}")]
    InitFailed(String),

    // Storage errors
    #[error("Failed to write {address} to the backing store: {reason}")]
    StorageWriteFailed { address: String, reason: String },

    #[error("Failed to delete {path} from the backing store after removing {} entries: {reason}", .removed.len())]
    StorageDeleteFailed {
        path: String,
        removed: Vec<String>,
        reason: String,
    },

    #[error("Failed to read {address} from the backing store: {reason}")]
    StorageReadFailed { address: String, reason: String },

    #[error("Backing store unavailable: {name}: {reason}")]
    StoreUnavailable { name: String, reason: String },

    #[error("Store error: {0}")]
    Store(String),

    // Entry errors
    #[error("Rename source not found: {0}")]
    RenameSourceMissing(String),

    #[error("Cannot rename {from} into its own subtree {to}")]
    InvalidRename { from: String, to: String },

    #[error("Rename stopped at {from} after moving {} entries: {source}", .moved.len())]
    RenameIncomplete {
        from: String,
        moved: Vec<(String, String)>,
        #[source]
        source: Box<PreviewError>,
    },

    // Import errors
    #[error("Unsupported import source: {0}")]
    InvalidSource(PathBuf),

    #[error("File too large to import: {path} ({size} bytes, limit {limit})")]
    ImportTooLarge { path: PathBuf, size: u64, limit: u64 },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PreviewError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if error is retryable
    ///
    /// Only backing-store failures qualify. The cache never retries on its
    /// own; the caller decides.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RenameIncomplete { source, .. } => source.is_retryable(),
            _ => matches!(
                self,
                Self::StorageWriteFailed { .. }
                    | Self::StorageDeleteFailed { .. }
                    | Self::StorageReadFailed { .. }
            ),
        }
    }

    /// Paths that were removed before a subtree removal failed
    pub fn removed_paths(&self) -> &[String] {
        match self {
            Self::StorageDeleteFailed { removed, .. } => removed,
            _ => &[],
        }
    }

    /// `(from, to)` moves applied before a subtree rename failed
    pub fn moved_entries(&self) -> &[(String, String)] {
        match self {
            Self::RenameIncomplete { moved, .. } => moved,
            _ => &[],
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotReady => Some("Call initialize() before using the cache"),
            Self::StoreUnavailable { .. } => Some("Run with --mode ephemeral to skip the store"),
            Self::ImportTooLarge { .. } => Some("Raise import.byte_limit in the config"),
            _ => None,
        }
    }
}
