//! Cooldown Store
//!
//! Tracks which candidates were already signaled (or marked ignorable after
//! a persistent data error) and when that suppression expires. An entry
//! suppresses its key while `expires_at > now`; expired entries behave as
//! absent even before `prune` removes them.
//!
//! The store is plain in-memory state owned by the scan orchestrator. It can
//! be saved to and loaded from a JSON file so suppression survives restarts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::candidate::CandidateKey;

#[derive(Error, Debug)]
pub enum CooldownError {
    #[error("Failed to read cooldown file: {0}")]
    ReadError(String),

    #[error("Failed to write cooldown file: {0}")]
    WriteError(String),

    #[error("Cooldown file is corrupted: {0}")]
    CorruptedFile(String),

    #[error("Failed to serialize cooldowns: {0}")]
    SerializationError(String),

    #[error("Failed to create directory: {0}")]
    DirectoryError(String),
}

/// On-disk entry layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub key: CandidateKey,
    /// Unix seconds
    pub expires_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CooldownFile {
    entries: Vec<CooldownEntry>,
}

/// Key -> expiry map
#[derive(Debug, Clone, Default)]
pub struct CooldownStore {
    entries: HashMap<CandidateKey, u64>,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `key` has an entry expiring strictly after `now`
    pub fn is_suppressed(&self, key: &CandidateKey, now: u64) -> bool {
        self.entries
            .get(key)
            .map_or(false, |&expires_at| expires_at > now)
    }

    /// Write (or overwrite) the expiry of `key` to `now + duration`
    pub fn suppress(&mut self, key: CandidateKey, now: u64, duration: Duration) {
        let expires_at = now.saturating_add(duration.as_secs());
        self.entries.insert(key, expires_at);
    }

    /// Remove expired entries, returning how many were dropped
    pub fn prune(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, &mut expires_at| expires_at > now);
        before - self.entries.len()
    }

    /// Expiry of `key` if an entry exists (expired or not)
    pub fn expires_at(&self, key: &CandidateKey) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Seconds of suppression left for `key` at `now`
    pub fn remaining(&self, key: &CandidateKey, now: u64) -> Option<u64> {
        self.entries
            .get(key)
            .filter(|&&expires_at| expires_at > now)
            .map(|&expires_at| expires_at - now)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries sorted by expiry, soonest first
    pub fn entries(&self) -> Vec<CooldownEntry> {
        let mut entries: Vec<CooldownEntry> = self
            .entries
            .iter()
            .map(|(key, &expires_at)| CooldownEntry {
                key: key.clone(),
                expires_at,
            })
            .collect();
        entries.sort_by(|a, b| a.expires_at.cmp(&b.expires_at).then_with(|| a.key.cmp(&b.key)));
        entries
    }

    /// Load a store from disk. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, CooldownError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| CooldownError::ReadError(e.to_string()))?;

        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let file: CooldownFile = serde_json::from_str(&content)
            .map_err(|e| CooldownError::CorruptedFile(e.to_string()))?;

        let entries = file
            .entries
            .into_iter()
            .map(|entry| (entry.key, entry.expires_at))
            .collect();

        Ok(Self { entries })
    }

    /// Save the store to disk. Writes a sibling temp file then renames it
    /// over the target so a crash never leaves a half-written file.
    pub fn save(&self, path: &Path) -> Result<(), CooldownError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CooldownError::DirectoryError(e.to_string()))?;
            }
        }

        let file = CooldownFile {
            entries: self.entries(),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| CooldownError::SerializationError(e.to_string()))?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .map_err(|e| CooldownError::WriteError(e.to_string()))?;
        fs::rename(&tmp_path, path)
            .map_err(|e| CooldownError::WriteError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(token: &str) -> CandidateKey {
        CandidateKey::new("solana", token, "pool")
    }

    #[test]
    fn test_suppression_window() {
        let mut store = CooldownStore::new();
        let t0 = 1_700_000_000;

        store.suppress(key("a"), t0, Duration::from_secs(3600));

        assert!(store.is_suppressed(&key("a"), t0 + 1800));
        assert!(!store.is_suppressed(&key("a"), t0 + 3601));
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let mut store = CooldownStore::new();
        store.suppress(key("a"), 100, Duration::from_secs(60));

        assert!(store.is_suppressed(&key("a"), 159));
        assert!(!store.is_suppressed(&key("a"), 160));
    }

    #[test]
    fn test_unknown_key_not_suppressed() {
        let store = CooldownStore::new();
        assert!(!store.is_suppressed(&key("missing"), 0));
    }

    #[test]
    fn test_keys_are_distinct_per_pool() {
        let mut store = CooldownStore::new();
        store.suppress(CandidateKey::new("solana", "a", "pool1"), 0, Duration::from_secs(60));

        assert!(store.is_suppressed(&CandidateKey::new("solana", "a", "pool1"), 10));
        assert!(!store.is_suppressed(&CandidateKey::new("solana", "a", "pool2"), 10));
    }

    #[test]
    fn test_later_write_replaces_expiry() {
        let mut store = CooldownStore::new();
        store.suppress(key("a"), 100, Duration::from_secs(60));
        store.suppress(key("a"), 150, Duration::from_secs(60));

        assert_eq!(store.expires_at(&key("a")), Some(210));
        assert_eq!(store.remaining(&key("a"), 200), Some(10));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let mut store = CooldownStore::new();
        store.suppress(key("old"), 0, Duration::from_secs(10));
        store.suppress(key("new"), 0, Duration::from_secs(100));

        let removed = store.prune(50);

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.is_suppressed(&key("new"), 50));
        assert_eq!(store.expires_at(&key("old")), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("cooldowns.json");

        let mut store = CooldownStore::new();
        store.suppress(key("a"), 1_000, Duration::from_secs(3600));
        store.suppress(key("b"), 1_000, Duration::from_secs(60));
        store.save(&path).unwrap();

        let loaded = CooldownStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.expires_at(&key("a")), Some(4_600));
        assert!(loaded.is_suppressed(&key("b"), 1_030));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = CooldownStore::load(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cooldowns.json");
        fs::write(&path, "{ not json").unwrap();

        let result = CooldownStore::load(&path);
        assert!(matches!(result, Err(CooldownError::CorruptedFile(_))));
    }

    #[test]
    fn test_entries_sorted_by_expiry() {
        let mut store = CooldownStore::new();
        store.suppress(key("late"), 0, Duration::from_secs(300));
        store.suppress(key("soon"), 0, Duration::from_secs(30));

        let entries = store.entries();
        assert_eq!(entries[0].key.token, "soon");
        assert_eq!(entries[1].key.token, "late");
    }
}
