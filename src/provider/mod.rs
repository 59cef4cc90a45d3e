//! Resource providers: where cached addresses come from
//!
//! Two interchangeable backends sit behind [`ResourceProvider`]:
//! - [`EphemeralHandleProvider`]: revocable in-process object handles
//! - [`PersistentStoreProvider`]: deterministic addresses backed by a store
//!
//! Exactly one is active per initialized cache. [`factory`] decides which.

pub mod ephemeral;
pub mod factory;
pub mod index;
pub mod persistent;

pub use ephemeral::{EphemeralHandleProvider, HandleRegistry, ObjectHandle};
pub use factory::{create_provider, select, Capabilities, ProviderContext, ProviderKind, ProviderMode};
pub use index::PathIndex;
pub use persistent::PersistentStoreProvider;

use crate::error::{PreviewError, PreviewResult};
use crate::path;
use crate::store::StoredResponse;
use async_trait::async_trait;

/// Abstract provider interface
///
/// All paths handed to a provider are already canonical; normalization is
/// the façade's job. Operations that touch storage are serialized per
/// instance, in call order.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Prepare empty storage. Wipes anything left from a previous session.
    async fn init(&mut self) -> PreviewResult<()>;

    /// Cache `content` for `path`, retiring any previous entry for that path
    async fn create(&self, path: &str, content: Vec<u8>, mime: &str) -> PreviewResult<String>;

    /// Remove `path` and everything below it, returning the removed paths
    async fn remove(&self, path: &str) -> PreviewResult<Vec<String>>;

    /// Move the single entry at `old_path` to `new_path`
    async fn rename(&self, old_path: &str, new_path: &str) -> PreviewResult<()>;

    /// Move `old_path` and every entry below it under `new_path`.
    ///
    /// Runs as one serialized operation; returns the `(from, to)` moves.
    /// If a move fails after others went through, the error is
    /// `RenameIncomplete` carrying the moves that were applied.
    async fn rename_tree(
        &self,
        old_path: &str,
        new_path: &str,
    ) -> PreviewResult<Vec<(String, String)>>;

    /// Resolve an address to the content it serves
    async fn fetch(&self, address: &str) -> PreviewResult<Option<StoredResponse>>;

    /// Cached address for an exact canonical path
    fn address_of(&self, path: &str) -> Option<String>;

    /// Cached path for an exact address
    fn path_of(&self, address: &str) -> Option<String>;

    /// All `(path, address)` pairs in path order
    fn entries(&self) -> Vec<(String, String)>;

    /// Address prefix this provider hands out
    fn base_address(&self) -> &str;

    fn kind(&self) -> ProviderKind;
}

/// Plan the exact renames that move the subtree `keys` from `old` to `new`.
///
/// Deepest entries come first so a parent's own rename never sweeps up
/// children that have not moved yet.
pub(crate) fn plan_tree_moves(keys: Vec<String>, old: &str, new: &str) -> Vec<(String, String)> {
    let prefix = path::subtree_prefix(old);
    let mut moves: Vec<(String, String)> = keys
        .into_iter()
        .map(|key| {
            let target = if key == old {
                new.to_string()
            } else {
                let rest = key.strip_prefix(&*prefix).unwrap_or(&key);
                path::join(new, rest)
            };
            (key, target)
        })
        .collect();
    moves.reverse();
    moves
}

/// Error for a subtree rename that failed at `from`.
///
/// Moves already applied stay applied, so they travel with the error.
pub(crate) fn rename_failed(
    from: &str,
    moved: Vec<(String, String)>,
    source: PreviewError,
) -> PreviewError {
    if moved.is_empty() {
        return source;
    }
    PreviewError::RenameIncomplete {
        from: from.to_string(),
        moved,
        source: Box::new(source),
    }
}
