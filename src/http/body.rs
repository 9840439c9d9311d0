//! Response bodies that carry a guard until they finish.
//!
//! Admission slots and active-query entries must outlive the handler when
//! the response body is still streaming (tail, export). [`hold`] moves a
//! guard into the body; the guard is dropped at end of stream, on a body
//! error, or when the body itself is dropped (client went away).

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::Response;
use hyper::body::{Body as HttpBody, Bytes, Frame, SizeHint};

/// A body that owns `guard` for as long as it is being streamed.
pub struct GuardedBody<G> {
    inner: Body,
    guard: Option<G>,
}

impl<G> GuardedBody<G> {
    pub fn new(inner: Body, guard: G) -> Self {
        Self {
            inner,
            guard: Some(guard),
        }
    }
}

impl<G: Unpin> HttpBody for GuardedBody<G> {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.guard.take();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Keep `guard` alive until `response`'s body is fully sent or dropped.
pub fn hold<G>(response: Response, guard: G) -> Response
where
    G: Send + Unpin + 'static,
{
    response.map(|body| Body::new(GuardedBody::new(body, guard)))
}
