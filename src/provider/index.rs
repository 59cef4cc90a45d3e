//! Bidirectional path/address index
//!
//! Both directions are updated inside the same `&mut self` call, so a
//! reader never sees one direction ahead of the other.

use crate::path;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

/// Anything that can stand in as an address in the index
pub trait Address {
    fn as_address(&self) -> &str;
}

impl Address for String {
    fn as_address(&self) -> &str {
        self
    }
}

/// Ordered `path -> address` map with an `address -> path` inverse
#[derive(Debug)]
pub struct PathIndex<A: Address = String> {
    by_path: BTreeMap<String, A>,
    by_address: HashMap<String, String>,
}

impl<A: Address> Default for PathIndex<A> {
    fn default() -> Self {
        Self {
            by_path: BTreeMap::new(),
            by_address: HashMap::new(),
        }
    }
}

impl<A: Address> PathIndex<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path -> address`, returning the entry it replaced
    pub fn insert(&mut self, path: &str, address: A) -> Option<A> {
        let previous = self.remove(path);
        // Another path may still claim the same address.
        if let Some(owner) = self.by_address.get(address.as_address()).cloned() {
            self.by_path.remove(&owner);
        }
        self.by_address
            .insert(address.as_address().to_string(), path.to_string());
        self.by_path.insert(path.to_string(), address);
        previous
    }

    /// Remove the exact entry for `path`
    pub fn remove(&mut self, path: &str) -> Option<A> {
        let address = self.by_path.remove(path)?;
        if self
            .by_address
            .get(address.as_address())
            .is_some_and(|owner| owner == path)
        {
            self.by_address.remove(address.as_address());
        }
        Some(address)
    }

    /// `path` itself plus every key nested below it, in ascending order
    pub fn subtree(&self, dir: &str) -> Vec<String> {
        let prefix = path::subtree_prefix(dir);
        let mut keys: Vec<String> = Vec::new();
        if self.by_path.contains_key(dir) {
            keys.push(dir.to_string());
        }
        keys.extend(
            self.by_path
                .range::<str, _>((Bound::Included(&*prefix), Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(&*prefix))
                .filter(|(key, _)| key.as_str() != dir)
                .map(|(key, _)| key.clone()),
        );
        keys
    }

    pub fn address_of(&self, path: &str) -> Option<&str> {
        self.by_path.get(path).map(Address::as_address)
    }

    pub fn path_of(&self, address: &str) -> Option<&str> {
        self.by_address.get(address).map(String::as_str)
    }

    pub fn get(&self, path: &str) -> Option<&A> {
        self.by_path.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// All `(path, address)` pairs in path order
    pub fn entries(&self) -> Vec<(String, String)> {
        self.by_path
            .iter()
            .map(|(path, address)| (path.clone(), address.as_address().to_string()))
            .collect()
    }

    /// Drop every entry, returning the addresses that were held
    pub fn clear(&mut self) -> Vec<A> {
        self.by_address.clear();
        std::mem::take(&mut self.by_path).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(paths: &[&str]) -> PathIndex {
        let mut index = PathIndex::new();
        for p in paths {
            index.insert(p, format!("addr:{}", p));
        }
        index
    }

    #[test]
    fn insert_updates_both_directions() {
        let mut index = PathIndex::new();
        assert!(index.insert("/a", "u1".to_string()).is_none());
        assert_eq!(index.address_of("/a"), Some("u1"));
        assert_eq!(index.path_of("u1"), Some("/a"));

        let old = index.insert("/a", "u2".to_string());
        assert_eq!(old.as_deref(), Some("u1"));
        assert_eq!(index.path_of("u1"), None);
        assert_eq!(index.path_of("u2"), Some("/a"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn reinserting_same_address_keeps_inverse() {
        let mut index = PathIndex::new();
        index.insert("/a", "u".to_string());
        index.insert("/a", "u".to_string());
        assert_eq!(index.path_of("u"), Some("/a"));
    }

    #[test]
    fn address_moves_between_paths() {
        let mut index = PathIndex::new();
        index.insert("/a", "u".to_string());
        index.insert("/b", "u".to_string());
        assert_eq!(index.address_of("/a"), None);
        assert_eq!(index.path_of("u"), Some("/b"));
    }

    #[test]
    fn subtree_matches_prefix_plus_separator() {
        let index = index_with(&["/a", "/a/b", "/a/c/d", "/ab", "/a-z", "/b"]);
        assert_eq!(index.subtree("/a"), vec!["/a", "/a/b", "/a/c/d"]);
        assert_eq!(index.subtree("/a/c"), vec!["/a/c/d"]);
        assert!(index.subtree("/zzz").is_empty());
    }

    #[test]
    fn subtree_of_root_is_everything() {
        let index = index_with(&["/a", "/b/c"]);
        assert_eq!(index.subtree("/"), vec!["/a", "/b/c"]);
    }

    #[test]
    fn remove_and_clear() {
        let mut index = index_with(&["/a", "/b"]);
        assert_eq!(index.remove("/a").as_deref(), Some("addr:/a"));
        assert!(index.remove("/a").is_none());
        assert_eq!(index.path_of("addr:/a"), None);

        let drained = index.clear();
        assert_eq!(drained, vec!["addr:/b".to_string()]);
        assert!(index.is_empty());
    }
}
