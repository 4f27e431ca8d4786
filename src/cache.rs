//! Thin facade over the blob and header stores. Adds no decision logic of
//! its own — the Revalidation Engine owns every hit/miss/refetch decision;
//! this module only translates store results into one shape and logs
//! non-fatal write failures.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use http::HeaderMap;

use crate::blob::BlobStore;
use crate::headers::HeaderStore;

/// Everything the engine needs from a cache hit.
pub struct CacheHit {
    pub body: Arc<Bytes>,
    pub last_modified: SystemTime,
    pub headers: Option<HeaderMap>,
}

impl CacheHit {
    pub fn len(&self) -> usize {
        self.body.len()
    }
}

pub struct CacheAdapter {
    blobs: BlobStore,
    headers: HeaderStore,
}

impl CacheAdapter {
    pub fn new(cache_dir: PathBuf, budget_bytes: usize) -> std::io::Result<Self> {
        Ok(Self {
            blobs: BlobStore::new(cache_dir.join("blobs"), budget_bytes)?,
            headers: HeaderStore::new(cache_dir.join("headers"))?,
        })
    }

    pub fn lookup(&self, path: &str) -> Option<CacheHit> {
        let blob = self.blobs.get(path)?;
        Some(CacheHit {
            body: blob.bytes,
            last_modified: blob.last_modified,
            headers: self.headers.get(path),
        })
    }

    /// Stores a freshly fetched body. Failure is logged and never propagated
    /// — the response already in flight is served from the bytes on hand.
    pub fn store_blob(&self, path: &str, body: Bytes, last_modified: SystemTime) {
        if let Err(err) = self.blobs.put(path, body, last_modified) {
            tracing::warn!(path, %err, "failed to store blob in cache");
        }
    }

    /// Stores response headers. Independent of `store_blob`; one may succeed
    /// while the other fails (data model invariant 1).
    pub fn store_headers(&self, path: &str, headers: HeaderMap) {
        if let Err(err) = self.headers.put(path, headers) {
            tracing::warn!(path, %err, "failed to store headers in cache");
        }
    }
}
