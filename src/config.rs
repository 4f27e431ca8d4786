//! Configuration file parsing and validation.
//!
//! The on-disk format is TOML with a `[server]` table and a `[[repository]]`
//! array of tables, matching the external configuration surface. Parsing
//! failures and validation failures are both fatal at startup — they never
//! reach the request-handling error paths.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub listen: Vec<SocketAddr>,
    pub request_timeout: Duration,
    pub log_requests: bool,
    /// Root directory for the on-disk blob and header-sidecar stores (see
    /// [`crate::blob::BlobStore`], [`crate::headers::HeaderStore`]).
    pub cache_dir: PathBuf,
    pub cache_budget_bytes: usize,
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub prefix: String,
    pub upstream: String,
}

impl ProxyConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: RawConfig = toml::from_str(&raw)?;
        parsed.validate()
    }

    /// Longest-prefix-wins lookup of which repository a request path maps to.
    pub fn resolve(&self, path: &str) -> Option<&RepositoryConfig> {
        self.repositories
            .iter()
            .filter(|r| path.starts_with(r.prefix.as_str()))
            .max_by_key(|r| r.prefix.len())
    }
}

#[derive(Deserialize)]
struct RawConfig {
    server: RawServer,
    #[serde(rename = "repository", default)]
    repositories: Vec<RawRepository>,
}

#[derive(Deserialize)]
struct RawServer {
    listen: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default)]
    log_requests: bool,
    #[serde(default = "default_cache_dir")]
    cache_dir: String,
    #[serde(default = "default_cache_budget_bytes")]
    cache_budget_bytes: usize,
}

#[derive(Deserialize)]
struct RawRepository {
    prefix: String,
    upstream: String,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_cache_dir() -> String {
    "./cache".to_string()
}

fn default_cache_budget_bytes() -> usize {
    1024 * 1024 * 1024
}

impl RawConfig {
    fn validate(self) -> Result<ProxyConfig, ConfigError> {
        if self.repositories.is_empty() {
            return Err(ConfigError::NoRepositories);
        }
        if self.server.listen.is_empty() {
            return Err(ConfigError::NoListenAddress);
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(self.server.request_timeout_secs));
        }

        let mut repositories = Vec::with_capacity(self.repositories.len());
        for repo in self.repositories {
            if repo.prefix.is_empty() || !repo.prefix.starts_with('/') {
                return Err(ConfigError::InvalidPrefix(repo.prefix));
            }
            if reqwest::Url::parse(&repo.upstream).is_err() {
                return Err(ConfigError::InvalidUpstream {
                    prefix: repo.prefix,
                    upstream: repo.upstream,
                });
            }
            repositories.push(RepositoryConfig {
                prefix: repo.prefix,
                upstream: repo.upstream,
            });
        }

        let mut listen = Vec::with_capacity(self.server.listen.len());
        for addr in &self.server.listen {
            let parsed = addr
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::InvalidPrefix(addr.clone()))?;
            listen.push(parsed);
        }

        Ok(ProxyConfig {
            listen,
            request_timeout: Duration::from_secs(self.server.request_timeout_secs),
            log_requests: self.server.log_requests,
            cache_dir: PathBuf::from(self.server.cache_dir),
            cache_budget_bytes: self.server.cache_budget_bytes,
            repositories,
        })
    }
}
