//! The Revalidation Engine: decides whether a request is a cache hit, a
//! needed revalidation, or a miss, and orchestrates the single-flight
//! registry, origin client, and cache adapter to answer it.
//!
//! The cache-hit-gone-stale path and the cache-miss path both reach the
//! origin through the exact same [`SingleFlightRegistry::acquire`] call
//! site below, so "at most one origin `GET` per path" holds regardless of
//! which branch triggered the refetch — the split-path structure this is
//! meant to avoid would let a revalidation-triggered refetch and a
//! concurrent miss-triggered fetch race past two different locks.

use std::time::SystemTime;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::body::ProxyBody;
use crate::cache::{CacheAdapter, CacheHit};
use crate::classify::FreshnessPolicy;
use crate::content_type;
use crate::http_date;
use crate::origin::{OriginClient, OriginResponse};
use crate::single_flight::{Acquired, SingleFlightRegistry};
use crate::types::Response;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Everything the engine needs to answer one request. Built by the Request
/// Handler after validation and policy classification.
pub struct RequestContext {
    pub path: String,
    pub method: Method,
    pub if_modified_since: Option<SystemTime>,
    pub policy: FreshnessPolicy,
    pub origin_url: String,
}

enum Revalidation {
    ServeCached,
    Refetch,
}

pub struct RevalidationEngine {
    cache: CacheAdapter,
    origin: OriginClient,
    registry: SingleFlightRegistry,
}

impl RevalidationEngine {
    pub fn new(cache: CacheAdapter, origin: OriginClient) -> Self {
        Self {
            cache,
            origin,
            registry: SingleFlightRegistry::new(),
        }
    }

    /// Maximum number of times a follower re-enters the top of the decision
    /// graph before giving up with `503`. Covers the pathological-contention
    /// case in spec §4.5 step C.2; in the common case this loop runs once.
    const MAX_ATTEMPTS: u32 = 4;

    pub async fn handle(&self, ctx: &RequestContext) -> Response {
        for _ in 0..Self::MAX_ATTEMPTS {
            if let Some(hit) = self.cache.lookup(&ctx.path) {
                if let Some(not_modified) = self.try_not_modified(ctx, &hit) {
                    return not_modified;
                }
                if !ctx.policy.validate_with_origin {
                    return self.hit_response(ctx, &hit);
                }
                match self.revalidate(ctx, &hit).await {
                    Revalidation::ServeCached => return self.hit_response(ctx, &hit),
                    Revalidation::Refetch => match self.registry.acquire(&ctx.path) {
                        Acquired::Leader(release) => {
                            let response = self.refetch_full(ctx).await;
                            drop(release);
                            return response;
                        }
                        Acquired::Waiter(waiter) => {
                            waiter.wait().await;
                            continue;
                        }
                    },
                }
            } else {
                match self.registry.acquire(&ctx.path) {
                    Acquired::Leader(release) => {
                        let response = self.fetch_miss(ctx).await;
                        drop(release);
                        return response;
                    }
                    Acquired::Waiter(waiter) => {
                        waiter.wait().await;
                        continue;
                    }
                }
            }
        }

        tracing::warn!(path = %ctx.path, "single-flight exhausted after repeated contention");
        empty_response(StatusCode::SERVICE_UNAVAILABLE)
    }

    fn try_not_modified(&self, ctx: &RequestContext, hit: &CacheHit) -> Option<Response> {
        if !ctx.policy.use_conditional {
            return None;
        }
        let client_ims = ctx.if_modified_since?;
        if authoritative_last_modified(hit) <= client_ims {
            Some(empty_response(StatusCode::NOT_MODIFIED))
        } else {
            None
        }
    }

    async fn revalidate(&self, ctx: &RequestContext, hit: &CacheHit) -> Revalidation {
        let authoritative = authoritative_last_modified(hit);
        match self.origin.conditional_head(&ctx.origin_url, authoritative).await {
            Ok(status) if status == StatusCode::NOT_MODIFIED => Revalidation::ServeCached,
            Ok(status) if status.is_success() => Revalidation::Refetch,
            Ok(status) => {
                tracing::warn!(path = %ctx.path, %status, "unexpected revalidation status, serving cached entry");
                Revalidation::ServeCached
            }
            Err(err) => {
                tracing::warn!(path = %ctx.path, %err, "revalidation HEAD failed, serving cached entry");
                Revalidation::ServeCached
            }
        }
    }

    fn hit_response(&self, ctx: &RequestContext, hit: &CacheHit) -> Response {
        let headers = build_hit_headers(hit, &ctx.path);
        let body: Bytes = (*hit.body).clone();
        finish(StatusCode::OK, headers, body, ctx.method == Method::GET)
    }

    /// Leader's work once revalidation found newer content: always a full
    /// `GET`, independent of the client's method, since the point is to
    /// refresh the cache rather than merely answer this one request.
    async fn refetch_full(&self, ctx: &RequestContext) -> Response {
        match self.origin.fetch(&ctx.origin_url, Method::GET, None).await {
            Ok(resp) if resp.status == StatusCode::OK => self.store_and_respond(ctx, resp),
            Ok(resp) => {
                tracing::warn!(path = %ctx.path, status = %resp.status, "refetch returned unexpected status, serving prior cache entry");
                self.serve_prior_or(ctx, StatusCode::BAD_GATEWAY)
            }
            Err(err) => {
                tracing::warn!(path = %ctx.path, %err, "refetch transport error, serving prior cache entry");
                self.serve_prior_or(ctx, StatusCode::GATEWAY_TIMEOUT)
            }
        }
    }

    fn serve_prior_or(&self, ctx: &RequestContext, fallback: StatusCode) -> Response {
        match self.cache.lookup(&ctx.path) {
            Some(hit) => self.hit_response(ctx, &hit),
            None => empty_response(fallback),
        }
    }

    /// Leader's work on a cache miss: mirrors the client's method and only
    /// forwards its conditional header when the path's policy allows it.
    async fn fetch_miss(&self, ctx: &RequestContext) -> Response {
        let forward_ims = if ctx.policy.use_conditional {
            ctx.if_modified_since
        } else {
            None
        };
        match self.origin.fetch(&ctx.origin_url, ctx.method.clone(), forward_ims).await {
            Ok(resp) if resp.status == StatusCode::NOT_MODIFIED => empty_response(StatusCode::NOT_MODIFIED),
            Ok(resp) if resp.status == StatusCode::OK => self.store_and_respond(ctx, resp),
            Ok(resp) => {
                tracing::info!(path = %ctx.path, status = %resp.status, "origin returned a non-success status");
                let headers = forward_headers(&resp.headers, &ctx.path);
                finish(resp.status, headers, resp.body, ctx.method == Method::GET)
            }
            Err(err) => {
                tracing::error!(path = %ctx.path, %err, "origin fetch failed on cache miss");
                empty_response(StatusCode::GATEWAY_TIMEOUT)
            }
        }
    }

    fn store_and_respond(&self, ctx: &RequestContext, resp: OriginResponse) -> Response {
        let last_modified = resp
            .headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(http_date::parse)
            .unwrap_or_else(SystemTime::now);

        // Store the hop-by-hop-stripped headers, not the raw origin headers —
        // otherwise a later cache hit replays them alongside finish()'s
        // freshly computed Content-Length.
        let headers = forward_headers(&resp.headers, &ctx.path);

        self.cache.store_blob(&ctx.path, resp.body.clone(), last_modified);
        self.cache.store_headers(&ctx.path, headers.clone());

        finish(StatusCode::OK, headers, resp.body, ctx.method == Method::GET)
    }
}

fn authoritative_last_modified(hit: &CacheHit) -> SystemTime {
    hit.headers
        .as_ref()
        .and_then(|h| h.get(LAST_MODIFIED))
        .and_then(|v| v.to_str().ok())
        .and_then(http_date::parse)
        .unwrap_or(hit.last_modified)
}

fn is_directory_path(path: &str) -> bool {
    path.ends_with('/')
}

fn build_hit_headers(hit: &CacheHit, path: &str) -> HeaderMap {
    let mut headers = match &hit.headers {
        Some(h) => h.clone(),
        None => {
            let mut h = HeaderMap::new();
            let content_type = if is_directory_path(path) {
                "text/html"
            } else {
                content_type::infer(path)
            };
            h.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            h.insert(
                LAST_MODIFIED,
                HeaderValue::from_str(&http_date::format(hit.last_modified))
                    .expect("formatted IMF-fixdate is valid header value"),
            );
            h
        }
    };
    headers.remove(CONTENT_LENGTH);
    headers
}

fn forward_headers(origin: &HeaderMap, path: &str) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in origin.iter() {
        if HOP_BY_HOP.contains(&name.as_str()) || name == CONTENT_LENGTH {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    if !out.contains_key(CONTENT_TYPE) {
        out.insert(CONTENT_TYPE, HeaderValue::from_static(content_type::infer(path)));
    }
    out
}

fn finish(status: StatusCode, mut headers: HeaderMap, body: Bytes, write_body: bool) -> Response {
    headers.insert(
        CONTENT_LENGTH,
        HeaderValue::from_str(&body.len().to_string()).expect("digit string is a valid header value"),
    );
    let proxy_body = if write_body { ProxyBody::from(body) } else { ProxyBody::empty() };
    let mut response = http::Response::new(proxy_body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn empty_response(status: StatusCode) -> Response {
    let mut response = http::Response::new(ProxyBody::empty());
    *response.status_mut() = status;
    response
}
