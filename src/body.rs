//! Response body wrapper used across the proxy's handler and cache paths.
//!
//! `ProxyBody` erases the concrete body type (a buffered blob or an empty
//! body) behind a single boxed `Body` so the request handler can return one
//! type regardless of which code path built the response.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;

use http_body_util::{BodyExt, Empty};
use hyper::body::{Body, Frame, SizeHint};

use crate::types::{BoxBody, BoxError};

/// A response body backed by buffered bytes.
pub struct ProxyBody(BoxBody);

impl ProxyBody {
    /// Wraps any compatible `Body` implementation, boxing it for uniform storage.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self(body.map_err(|e| e.into()).boxed_unsync())
    }

    /// A body with no content, used for 304/403/405/503/504 responses.
    pub fn empty() -> Self {
        Self::new(Empty::new())
    }
}

impl Default for ProxyBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<()> for ProxyBody {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

impl From<&str> for ProxyBody {
    fn from(buf: &str) -> Self {
        Self::new(http_body_util::Full::from(buf.to_owned()))
    }
}

macro_rules! body_from_impl {
    ($ty:ty) => {
        impl From<$ty> for ProxyBody {
            fn from(buf: $ty) -> Self {
                Self::new(http_body_util::Full::from(buf))
            }
        }
    };
}

body_from_impl!(String);
body_from_impl!(Vec<u8>);
body_from_impl!(Bytes);

impl Body for ProxyBody {
    type Data = Bytes;
    type Error = BoxError;

    #[inline]
    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.0).poll_frame(cx)
    }

    #[inline]
    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }
}
