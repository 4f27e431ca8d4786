//! Conversion of handler return values into `Response<ProxyBody>`.

use std::fmt::Display;

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;

use crate::body::ProxyBody;

/// Converts a value into an HTTP response. Lets the request handler return
/// plain `(StatusCode, message)` tuples for error paths instead of building
/// a `Response<ProxyBody>` by hand.
pub trait Responder {
    fn into_response(self) -> Response<ProxyBody>;
}

impl<R> Responder for (StatusCode, R)
where
    R: Display,
{
    fn into_response(self) -> Response<ProxyBody> {
        let (status, body) = self;
        let mut res = Response::new(ProxyBody::new(Full::from(Bytes::from(body.to_string()))));
        *res.status_mut() = status;
        res
    }
}
