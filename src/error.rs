//! Error types for the proxy's ambient stack: configuration, storage, origin
//! transport. Manual `Display`/`Error` impls, matching the rest of the
//! dependency-facing code in this crate rather than pulling in a derive macro
//! for a handful of variants.

use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    NoRepositories,
    InvalidPrefix(String),
    InvalidUpstream { prefix: String, upstream: String },
    InvalidTimeout(u64),
    NoListenAddress,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {e}"),
            ConfigError::NoRepositories => write!(f, "config must declare at least one [[repository]]"),
            ConfigError::InvalidPrefix(p) => {
                write!(f, "repository prefix {p:?} must be non-empty and start with '/'")
            }
            ConfigError::InvalidUpstream { prefix, upstream } => {
                write!(f, "repository {prefix:?} has invalid upstream url {upstream:?}")
            }
            ConfigError::InvalidTimeout(t) => write!(f, "request_timeout_secs must be > 0, got {t}"),
            ConfigError::NoListenAddress => write!(f, "config must declare at least one listen address"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Failure writing into a blob or header store. Always non-fatal to the
/// caller; the entry was either served from freshly fetched bytes or
/// degrades to a cache miss on the next request.
#[derive(Debug)]
pub enum StoreError {
    ExceedsBudget { len: usize, budget: usize },
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ExceedsBudget { len, budget } => {
                write!(f, "blob of {len} bytes exceeds cache budget of {budget} bytes")
            }
            StoreError::Io(e) => write!(f, "cache file I/O failed: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::ExceedsBudget { .. } => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Failure reaching the upstream mirror.
#[derive(Debug)]
pub enum OriginError {
    Transport(reqwest::Error),
}

impl fmt::Display for OriginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginError::Transport(e) => write!(f, "origin request failed: {e}"),
        }
    }
}

impl std::error::Error for OriginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OriginError::Transport(e) => Some(e),
        }
    }
}

impl From<reqwest::Error> for OriginError {
    fn from(e: reqwest::Error) -> Self {
        OriginError::Transport(e)
    }
}
