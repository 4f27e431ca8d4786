//! Core type aliases shared across the proxy's request path.

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Incoming;

use crate::body::ProxyBody;

/// Incoming request with Hyper's streaming body.
pub type Request = hyper::Request<Incoming>;

/// Outgoing response using the proxy's body wrapper.
pub type Response = hyper::Response<ProxyBody>;

pub(crate) type BoxBody = UnsyncBoxBody<Bytes, BoxError>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
