//! Navigation Cache Module
//!
//! Bidirectional mapping between hierarchical folder paths and numeric
//! identifiers, with ancestor-chain bookkeeping. Lets the UI resolve
//! breadcrumbs and deep links without a remote path-resolution round
//! trip. The two indexes (path→id and id→item) are always kept in
//! agreement: inserts write both, the expiry sweep removes from both in
//! the same pass.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::current_timestamp_ms;

// == Constants ==
/// Fixed navigation TTL measured against `last_accessed`.
pub const NAVIGATION_TTL: Duration = Duration::from_secs(15 * 60);

/// Window used by `statistics()` to count recently touched items.
const RECENT_WINDOW_MS: u64 = 5 * 60 * 1000;

/// Root of every cached folder path.
const ROOT_PATH: &str = "/files";

// == Navigation Item ==
/// One cached folder with its resolved path and ancestor chain.
///
/// `full_path` is the root-to-leaf concatenation of escaped ancestor
/// names; `parent_chain` lists ancestor ids from the root down, ending
/// with the item's own id.
#[derive(Debug, Clone)]
pub struct NavigationItem {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub full_path: String,
    pub parent_chain: Vec<i64>,
    /// Last successful lookup or insertion (Unix milliseconds)
    pub last_accessed: u64,
}

// == Navigation Statistics ==
/// Observability snapshot for the navigation cache.
#[derive(Debug, Clone, Serialize)]
pub struct NavigationStatistics {
    pub total_cached_paths: usize,
    pub total_cached_folders: usize,
    /// Items touched within the last five minutes
    pub recently_accessed: usize,
}

// == Navigation Cache ==
/// Dual-index folder navigation cache with lazy TTL expiry.
pub struct NavigationCache {
    /// full path -> folder id
    path_index: HashMap<String, i64>,
    /// folder id -> item
    folders: HashMap<i64, NavigationItem>,
    /// Expiry horizon in milliseconds
    ttl_ms: u64,
}

impl NavigationCache {
    // == Constructors ==
    /// Creates a navigation cache with the standard 15-minute TTL.
    pub fn new() -> Self {
        Self::with_ttl(NAVIGATION_TTL)
    }

    /// Creates a navigation cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            path_index: HashMap::new(),
            folders: HashMap::new(),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    // == Add Folder ==
    /// Caches a folder under both indexes.
    ///
    /// When `full_path` is omitted it is derived from the parent's
    /// cached path plus the escaped `name`; an unknown parent falls back
    /// to a flat root-relative path. The parent chain is the parent's
    /// chain extended with this folder's id.
    pub fn add_folder(
        &mut self,
        id: i64,
        name: &str,
        parent_id: Option<i64>,
        full_path: Option<&str>,
    ) {
        let full_path = match full_path {
            Some(path) => path.to_string(),
            None => self.build_full_path(name, parent_id),
        };

        let mut parent_chain = self.build_parent_chain(parent_id);
        parent_chain.push(id);

        let item = NavigationItem {
            id,
            name: name.to_string(),
            parent_id,
            full_path: full_path.clone(),
            parent_chain,
            last_accessed: current_timestamp_ms(),
        };

        self.folders.insert(id, item);
        self.path_index.insert(full_path.clone(), id);
        debug!(path = %full_path, id, "navigation cache add");
    }

    // == Lookups ==
    /// Resolves a full path to its folder id, refreshing the item's
    /// access time. Runs the lazy expiry sweep first.
    pub fn get_folder_id_by_path(&mut self, path: &str) -> Option<i64> {
        self.sweep_expired();

        let id = *self.path_index.get(path)?;
        let item = self.folders.get_mut(&id)?;
        item.last_accessed = current_timestamp_ms();
        debug!(path = %path, id, "navigation cache path hit");
        Some(id)
    }

    /// Resolves a folder id to its full path, refreshing the item's
    /// access time. Runs the lazy expiry sweep first.
    pub fn get_path_by_id(&mut self, id: i64) -> Option<String> {
        self.sweep_expired();

        let item = self.folders.get_mut(&id)?;
        item.last_accessed = current_timestamp_ms();
        Some(item.full_path.clone())
    }

    /// Returns the ancestor chain for a folder (root first, the folder's
    /// own id last), refreshing the item's access time.
    pub fn get_parent_chain(&mut self, id: i64) -> Option<Vec<i64>> {
        let item = self.folders.get_mut(&id)?;
        item.last_accessed = current_timestamp_ms();
        Some(item.parent_chain.clone())
    }

    /// Membership test only; does not refresh access time.
    pub fn can_direct_navigate(&self, id: i64) -> bool {
        self.folders.contains_key(&id)
    }

    // == Smart Path ==
    /// Joins a folder name onto the current path, escaping the segment.
    /// An empty or root current path yields a root-relative result.
    pub fn build_smart_path(current_path: &str, name: &str) -> String {
        let clean = current_path.trim_end_matches('/');
        let encoded = urlencoding::encode(name);

        if clean.is_empty() || clean == ROOT_PATH {
            format!("{ROOT_PATH}/{encoded}")
        } else {
            format!("{clean}/{encoded}")
        }
    }

    // == Batch Add ==
    /// Caches a resolved root-to-leaf chain in order, so each segment's
    /// insert can see its parent from the earlier iterations of the same
    /// batch.
    pub fn batch_add_from_path_resolution(&mut self, segments: &[String], ids: &[i64]) {
        let mut current_path = ROOT_PATH.to_string();

        for (i, (segment, &id)) in segments.iter().zip(ids.iter()).enumerate() {
            current_path = format!("{current_path}/{}", urlencoding::encode(segment));
            let parent_id = if i > 0 { Some(ids[i - 1]) } else { None };
            self.add_folder(id, segment, parent_id, Some(&current_path));
        }
    }

    // == Statistics ==
    /// Returns an owned observability snapshot.
    pub fn statistics(&self) -> NavigationStatistics {
        let now = current_timestamp_ms();
        let recently_accessed = self
            .folders
            .values()
            .filter(|item| now.saturating_sub(item.last_accessed) < RECENT_WINDOW_MS)
            .count();

        NavigationStatistics {
            total_cached_paths: self.path_index.len(),
            total_cached_folders: self.folders.len(),
            recently_accessed,
        }
    }

    // == Clear ==
    /// Drops both indexes.
    pub fn clear(&mut self) {
        self.path_index.clear();
        self.folders.clear();
        debug!("navigation cache cleared");
    }

    /// Number of cached folders.
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Derives a folder's full path from its cached parent; unknown
    /// parents fall back to a flat root-relative path.
    fn build_full_path(&self, name: &str, parent_id: Option<i64>) -> String {
        let encoded = urlencoding::encode(name);
        match parent_id.and_then(|pid| self.folders.get(&pid)) {
            Some(parent) => format!("{}/{encoded}", parent.full_path),
            None => format!("{ROOT_PATH}/{encoded}"),
        }
    }

    /// Copies the parent's chain; an unknown but non-null parent yields
    /// a single-element stub so the chain still records the link.
    fn build_parent_chain(&self, parent_id: Option<i64>) -> Vec<i64> {
        match parent_id {
            None => Vec::new(),
            Some(pid) => match self.folders.get(&pid) {
                Some(parent) => parent.parent_chain.clone(),
                None => vec![pid],
            },
        }
    }

    /// Removes every item whose `last_accessed` is past the TTL from
    /// both indexes in the same pass.
    fn sweep_expired(&mut self) {
        let now = current_timestamp_ms();
        let expired: Vec<i64> = self
            .folders
            .values()
            .filter(|item| now.saturating_sub(item.last_accessed) > self.ttl_ms)
            .map(|item| item.id)
            .collect();

        for id in &expired {
            if let Some(item) = self.folders.remove(id) {
                self.path_index.remove(&item.full_path);
            }
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(), "navigation cache sweep");
        }
    }

    /// Backdates an item's access time, for expiry tests.
    #[cfg(test)]
    fn rewind_access(&mut self, id: i64, by_ms: u64) {
        if let Some(item) = self.folders.get_mut(&id) {
            item.last_accessed = item.last_accessed.saturating_sub(by_ms);
        }
    }
}

impl Default for NavigationCache {
    fn default() -> Self {
        Self::new()
    }
}
