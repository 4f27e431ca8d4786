//! HTTP client for the upstream mirror. Every request carries a fixed
//! `User-Agent` and is subject to the configured request timeout; there is
//! no retry logic here, transport failures are reported to the Revalidation
//! Engine to handle per its fail-open/504 policy.

use std::time::{Duration, SystemTime};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http::header::{CONTENT_LENGTH, IF_MODIFIED_SINCE, USER_AGENT};

use crate::error::OriginError;
use crate::http_date;

const PROXY_USER_AGENT: &str = concat!("apt-cache-proxy/", env!("CARGO_PKG_VERSION"));

pub struct OriginResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct OriginClient {
    http: reqwest::Client,
}

impl OriginClient {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client config is static and always valid");
        Self { http }
    }

    /// Sends a conditional `HEAD` for revalidation. Returns the origin's raw
    /// status so the caller can distinguish `304`, `200`, and anything else.
    pub async fn conditional_head(&self, url: &str, if_modified_since: SystemTime) -> Result<StatusCode, OriginError> {
        let resp = self
            .http
            .head(url)
            .header(USER_AGENT, PROXY_USER_AGENT)
            .header(IF_MODIFIED_SINCE, http_date::format(if_modified_since))
            .send()
            .await?;
        Ok(resp.status())
    }

    /// Issues `method` against `url`, optionally carrying `If-Modified-Since`.
    /// Always reads the body to completion — callers that don't want a body
    /// (a `HEAD`) should not call this with `Method::HEAD` bodies present
    /// server-side in practice, but `reqwest` returns an empty body for
    /// `HEAD` regardless so this is safe either way.
    pub async fn fetch(
        &self,
        url: &str,
        method: Method,
        if_modified_since: Option<SystemTime>,
    ) -> Result<OriginResponse, OriginError> {
        let mut req = self.http.request(method, url).header(USER_AGENT, PROXY_USER_AGENT);
        if let Some(ims) = if_modified_since {
            req = req.header(IF_MODIFIED_SINCE, http_date::format(ims));
        }
        let resp = req.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;

        if let Some(declared) = declared_content_length(&headers) {
            if declared != body.len() {
                tracing::warn!(
                    url,
                    declared,
                    actual = body.len(),
                    "origin response body shorter than declared Content-Length"
                );
            }
        }

        Ok(OriginResponse { status, headers, body })
    }
}

fn declared_content_length(headers: &HeaderMap) -> Option<usize> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}
