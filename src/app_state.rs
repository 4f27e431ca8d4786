//! Shared application state handed to every connection.
//!
//! Threaded explicitly through an `Arc` into the service closure rather than
//! reached through a global registry — the proxy has exactly one engine and
//! one config for its whole lifetime, so there is nothing a type-keyed
//! global map would buy beyond indirection.

use crate::cache::CacheAdapter;
use crate::config::ProxyConfig;
use crate::engine::RevalidationEngine;
use crate::origin::OriginClient;

pub struct AppState {
    pub config: ProxyConfig,
    pub engine: RevalidationEngine,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> std::io::Result<Self> {
        let cache = CacheAdapter::new(config.cache_dir.clone(), config.cache_budget_bytes)?;
        let origin = OriginClient::new(config.request_timeout);
        let engine = RevalidationEngine::new(cache, origin);
        Ok(Self { config, engine })
    }
}
