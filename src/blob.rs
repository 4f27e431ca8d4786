//! Concrete byte-store collaborator behind the Cache Adapter.
//!
//! A single-file-per-path store under a configured cache root: each cached
//! path maps deterministically to one file on disk, with an in-memory
//! metadata index tracking a byte budget and least-recently-used eviction.
//! Eviction policy tuning is explicitly out of scope for this proxy — this
//! is the simplest thing that satisfies the Cache Adapter's `get`/`put`
//! contract, not a production cache replacement algorithm.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use bytes::Bytes;
use dashmap::DashMap;

use crate::error::StoreError;

/// A blob as retrieved from the store: shared bytes plus the timestamp it
/// was stored with.
#[derive(Clone)]
pub struct StoredBlob {
    pub bytes: Arc<Bytes>,
    pub last_modified: SystemTime,
}

impl StoredBlob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

struct Metadata {
    filename: String,
    len: usize,
    last_modified: SystemTime,
    last_accessed: Instant,
}

pub struct BlobStore {
    cache_root: PathBuf,
    entries: DashMap<String, Metadata>,
    used_bytes: AtomicUsize,
    budget_bytes: usize,
}

impl BlobStore {
    pub fn new(cache_root: PathBuf, budget_bytes: usize) -> std::io::Result<Self> {
        fs::create_dir_all(&cache_root)?;
        Ok(Self {
            cache_root,
            entries: DashMap::new(),
            used_bytes: AtomicUsize::new(0),
            budget_bytes,
        })
    }

    /// Looks up `path`, bumping its recency on hit. A metadata entry whose
    /// file went missing out from under the store is treated as a miss
    /// rather than an error.
    pub fn get(&self, path: &str) -> Option<StoredBlob> {
        let mut entry = self.entries.get_mut(path)?;
        let file = self.cache_root.join(&entry.filename);
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path, %err, "cached blob file missing or unreadable");
                return None;
            }
        };
        entry.last_accessed = Instant::now();
        Some(StoredBlob {
            bytes: Arc::new(Bytes::from(bytes)),
            last_modified: entry.last_modified,
        })
    }

    /// Stores `bytes` under `path`, evicting least-recently-used entries
    /// until the budget is satisfied. Fails only if a single blob alone
    /// exceeds the configured budget, or the write to disk fails.
    pub fn put(&self, path: &str, bytes: Bytes, last_modified: SystemTime) -> Result<(), StoreError> {
        let len = bytes.len();
        if len > self.budget_bytes {
            return Err(StoreError::ExceedsBudget {
                len,
                budget: self.budget_bytes,
            });
        }

        if let Some(old) = self.entries.get(path) {
            self.used_bytes.fetch_sub(old.len, Ordering::SeqCst);
        }

        self.evict_until_fits(len);

        let filename = store_key(path);
        fs::write(self.cache_root.join(&filename), &bytes)?;

        self.entries.insert(
            path.to_string(),
            Metadata {
                filename,
                len,
                last_modified,
                last_accessed: Instant::now(),
            },
        );
        self.used_bytes.fetch_add(len, Ordering::SeqCst);
        Ok(())
    }

    fn evict_until_fits(&self, incoming: usize) {
        while self.used_bytes.load(Ordering::SeqCst) + incoming > self.budget_bytes {
            let victim = self
                .entries
                .iter()
                .min_by_key(|e| e.last_accessed)
                .map(|e| e.key().clone());
            let Some(key) = victim else { break };
            if let Some((_, meta)) = self.entries.remove(&key) {
                self.used_bytes.fetch_sub(meta.len, Ordering::SeqCst);
                let _ = fs::remove_file(self.cache_root.join(&meta.filename));
            }
        }
    }

    #[cfg(test)]
    fn used_bytes(&self) -> usize {
        self.used_bytes.load(Ordering::SeqCst)
    }
}

/// Deterministic path → filename mapping, shared with the header sidecar
/// store so both stores can locate a path's files without a shared index.
/// `DefaultHasher` is unseeded and stable across calls (unlike the
/// randomized `RandomState` default), so the same path always hashes to the
/// same filename.
pub(crate) fn store_key(path: &str) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_store(budget_bytes: usize) -> BlobStore {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("apt-cache-proxy-blob-test-{}-{n}", std::process::id()));
        BlobStore::new(dir, budget_bytes).unwrap()
    }

    fn bytes(n: usize) -> Bytes {
        Bytes::from(vec![b'x'; n])
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = temp_store(1024);
        let now = SystemTime::now();
        store.put("/a", bytes(10), now).unwrap();
        let got = store.get("/a").unwrap();
        assert_eq!(got.len(), 10);
        assert_eq!(got.last_modified, now);
    }

    #[test]
    fn miss_returns_none() {
        let store = temp_store(1024);
        assert!(store.get("/missing").is_none());
    }

    #[test]
    fn blob_larger_than_budget_is_rejected() {
        let store = temp_store(100);
        let err = store.put("/big", bytes(200), SystemTime::now()).unwrap_err();
        assert!(matches!(err, StoreError::ExceedsBudget { len: 200, budget: 100 }));
    }

    #[test]
    fn least_recently_used_entry_is_evicted_first() {
        let store = temp_store(150);
        store.put("/a", bytes(100), SystemTime::now()).unwrap();
        store.put("/b", bytes(40), SystemTime::now()).unwrap();
        // touch /a so /b becomes the LRU entry
        store.get("/a").unwrap();
        store.put("/c", bytes(40), SystemTime::now()).unwrap();

        assert!(store.get("/a").is_some());
        assert!(store.get("/b").is_none());
        assert!(store.get("/c").is_some());
        assert!(store.used_bytes() <= 150);
    }

    #[test]
    fn replacing_a_path_accounts_old_bytes_freed() {
        let store = temp_store(1024);
        store.put("/a", bytes(100), SystemTime::now()).unwrap();
        store.put("/a", bytes(10), SystemTime::now()).unwrap();
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn store_key_is_deterministic_and_path_specific() {
        assert_eq!(store_key("/ubuntu/pool/a.deb"), store_key("/ubuntu/pool/a.deb"));
        assert_ne!(store_key("/ubuntu/pool/a.deb"), store_key("/ubuntu/pool/b.deb"));
    }
}
