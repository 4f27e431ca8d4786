//! Concrete header-sidecar collaborator behind the Cache Adapter.
//!
//! Stored independently of [`crate::blob::BlobStore`] so that a body and its
//! headers can legally fall out of sync (invariant 1 of the cache entry data
//! model): one store succeeding while the other fails is a degraded-but-legal
//! state, not an error the engine has to reconcile. Each path's headers are
//! serialized with a small length-prefixed encoding into their own sidecar
//! file under the cache root, next to (but independent of) the blob store.

use std::fs;
use std::path::PathBuf;

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::blob::store_key;
use crate::error::StoreError;

pub struct HeaderStore {
    cache_root: PathBuf,
}

impl HeaderStore {
    pub fn new(cache_root: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(&cache_root)?;
        Ok(Self { cache_root })
    }

    pub fn get(&self, path: &str) -> Option<HeaderMap> {
        let file = self.cache_root.join(store_key(path));
        let buf = fs::read(&file).ok()?;
        decode(&buf)
    }

    pub fn put(&self, path: &str, headers: HeaderMap) -> Result<(), StoreError> {
        let file = self.cache_root.join(store_key(path));
        fs::write(file, encode(&headers))?;
        Ok(())
    }
}

/// `u32` header count, then for each header a `u32` name length + name bytes
/// and a `u32` value length + value bytes, all little-endian.
fn encode(headers: &HeaderMap) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(headers.len() as u32).to_le_bytes());
    for (name, value) in headers.iter() {
        let name = name.as_str().as_bytes();
        let value = value.as_bytes();
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name);
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buf.extend_from_slice(value);
    }
    buf
}

fn decode(buf: &[u8]) -> Option<HeaderMap> {
    let mut cursor = buf;
    let count = read_u32(&mut cursor)? as usize;
    let mut headers = HeaderMap::with_capacity(count);
    for _ in 0..count {
        let name_len = read_u32(&mut cursor)? as usize;
        let name = take(&mut cursor, name_len)?;
        let value_len = read_u32(&mut cursor)? as usize;
        let value = take(&mut cursor, value_len)?;
        let name = HeaderName::from_bytes(name).ok()?;
        let value = HeaderValue::from_bytes(value).ok()?;
        headers.append(name, value);
    }
    Some(headers)
}

fn read_u32(cursor: &mut &[u8]) -> Option<u32> {
    let bytes = take(cursor, 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

fn take<'a>(cursor: &mut &'a [u8], n: usize) -> Option<&'a [u8]> {
    if cursor.len() < n {
        return None;
    }
    let (head, tail) = cursor.split_at(n);
    *cursor = tail;
    Some(head)
}
