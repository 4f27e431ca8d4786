//! A caching reverse proxy for APT/Debian-style package repositories.
//!
//! Classifies requests by repository path convention (pool vs. dists),
//! answers conditional requests from a disk-backed cache, and coalesces
//! concurrent revalidations against the same path into a single origin
//! fetch.
//!
//! # Compatibility
//! - Runtime: `tokio`
//! - HTTP: `hyper` 1.x, outbound via `reqwest`

/// Response body type used throughout the proxy.
pub mod body;

/// Shared application state handed to every connection.
pub mod app_state;

/// Disk-backed cached-response store (blobs + origin headers).
pub mod cache;

/// Disk-backed blob storage with an LRU eviction budget.
pub mod blob;

/// Path-based freshness policy classification (pool vs. dists).
pub mod classify;

/// Configuration file parsing and validation.
pub mod config;

/// Extension-to-MIME-type inference for synthesized responses.
pub mod content_type;

/// The Revalidation Engine: decision graph for hit/revalidate/miss.
pub mod engine;

/// Domain error types for configuration, storage, and origin failures.
pub mod error;

/// Request handler: validates, classifies, and dispatches to the engine.
mod handler;

/// Stored per-path response headers from the origin.
pub mod headers;

/// IMF-fixdate (RFC 7231) parsing and formatting for HTTP date headers.
pub mod http_date;

/// HTTP client for the upstream mirror.
pub mod origin;

/// Response generation utilities and traits.
pub mod responder;

/// HTTP server implementation and configuration.
mod server;

/// Request coalescing for concurrent origin fetches of the same path.
pub mod single_flight;

/// Structured tracing subscriber setup.
pub mod tracing;

/// Core type definitions used throughout the proxy.
pub mod types;

pub use app_state::AppState;
pub use server::serve;
