//! Default query engine: relays admitted requests to a storage node.
//!
//! # Responsibilities
//! - Pick a node (round robin, healthy first)
//! - Rebuild the request against the node's base URL, same path and query
//! - Enforce the per-call timeout
//! - Feed request outcomes back into node health
//! - Turn non-2xx upstream replies into `QueryError` carrying that status

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode, Uri};
use axum::response::Response;
use hyper::body::{Body as HttpBody, Bytes};

use crate::handlers::{QueryCall, QueryEngine, QueryError};
use crate::storage::node::StorageNode;
use crate::storage::nodes::StorageNodes;

/// Upstream error bodies are truncated to this many bytes.
const MAX_ERROR_BODY: usize = 64 * 1024;

const TRUNCATED_MARKER: &str = " ...(truncated)";

const HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::HOST,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

pub struct ForwardingEngine {
    nodes: Arc<StorageNodes>,
}

impl ForwardingEngine {
    pub fn new(nodes: Arc<StorageNodes>) -> Self {
        Self { nodes }
    }
}

/// Keeps the node's in-flight count accurate on every exit path.
struct InFlight<'a>(&'a StorageNode);

impl<'a> InFlight<'a> {
    fn start(node: &'a StorageNode) -> Self {
        node.begin();
        Self(node)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.end();
    }
}

fn upstream_uri(node: &StorageNode, path: &str, query: Option<&str>) -> Result<Uri, QueryError> {
    let mut url = node.base_url.clone();
    url.set_path(path);
    url.set_query(query);
    url.as_str().parse().map_err(|e| {
        QueryError::with_status(
            StatusCode::BAD_REQUEST,
            format!("cannot build storage request URL: {}", e),
        )
    })
}

fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from {
        if !HOP_BY_HOP.contains(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

#[async_trait]
impl QueryEngine for ForwardingEngine {
    async fn execute(&self, call: QueryCall) -> Result<Response, QueryError> {
        let node = self
            .nodes
            .pick()
            .map_err(|e| QueryError::with_status(e.status(), e.to_string()))?;

        let (parts, body) = call.request.into_parts();
        let uri = upstream_uri(&node, &call.path, parts.uri.query())?;

        let mut upstream = Request::builder().method(parts.method).uri(uri);
        if let Some(headers) = upstream.headers_mut() {
            copy_headers(&parts.headers, headers);
        }
        let upstream = upstream.body(body).map_err(|e| {
            QueryError::with_status(StatusCode::BAD_REQUEST, format!("invalid request: {}", e))
        })?;

        let _in_flight = InFlight::start(&node);
        let sent = tokio::time::timeout(
            self.nodes.request_timeout(),
            self.nodes.client().request(upstream),
        )
        .await;

        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                node.mark_failure(self.nodes.unhealthy_threshold());
                return Err(QueryError::with_status(
                    StatusCode::BAD_GATEWAY,
                    format!("cannot reach storage node {}: {}", node.addr, e),
                ));
            }
            Err(_) => {
                node.mark_failure(self.nodes.unhealthy_threshold());
                return Err(QueryError::with_status(
                    StatusCode::GATEWAY_TIMEOUT,
                    format!(
                        "storage node {} did not respond within {:?}",
                        node.addr,
                        self.nodes.request_timeout()
                    ),
                ));
            }
        };

        let status = response.status();
        match status {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                node.mark_failure(self.nodes.unhealthy_threshold());
            }
            _ => node.mark_success(self.nodes.healthy_threshold()),
        }

        let (parts, body) = response.into_parts();
        if !status.is_success() {
            return Err(QueryError::with_status(status, read_error_body(body).await));
        }

        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Read an upstream error body as the error message, keeping at most
/// [`MAX_ERROR_BODY`] bytes. A body that fails mid-read is reported as such.
async fn read_error_body<B>(mut body: B) -> String
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    let mut buf = Vec::new();
    let mut truncated = false;
    while let Some(frame) = poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => return format!("cannot read error response from storage node: {}", e),
        };
        let Ok(data) = frame.into_data() else {
            continue;
        };
        let room = MAX_ERROR_BODY - buf.len();
        if data.len() > room {
            buf.extend_from_slice(&data[..room]);
            truncated = true;
            break;
        }
        buf.extend_from_slice(&data);
    }

    let mut message = String::from_utf8_lossy(&buf).trim().to_string();
    if truncated {
        message.push_str(TRUNCATED_MARKER);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_uri_keeps_path_and_query() {
        let node = StorageNode::parse("storage-1:8401").unwrap();
        let uri = upstream_uri(
            &node,
            "/select/0/loki/api/v1/query",
            Some("query=up&timeout=5s"),
        )
        .unwrap();
        assert_eq!(
            uri.to_string(),
            "http://storage-1:8401/select/0/loki/api/v1/query?query=up&timeout=5s"
        );
    }

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let mut from = HeaderMap::new();
        from.insert(header::HOST, "frontend".parse().unwrap());
        from.insert(header::CONNECTION, "close".parse().unwrap());
        from.insert("x-request-id", "abc".parse().unwrap());

        let mut to = HeaderMap::new();
        copy_headers(&from, &mut to);
        assert_eq!(to.len(), 1);
        assert_eq!(to["x-request-id"], "abc");
    }

    #[tokio::test]
    async fn short_error_body_is_kept_verbatim() {
        let message = read_error_body(Body::from("  unknown label \n")).await;
        assert_eq!(message, "unknown label");
    }

    #[tokio::test]
    async fn oversized_error_body_is_truncated_not_dropped() {
        let message = read_error_body(Body::from("e".repeat(100 * 1024))).await;
        assert!(message.ends_with(TRUNCATED_MARKER));
        assert_eq!(message.len(), MAX_ERROR_BODY + TRUNCATED_MARKER.len());
        assert!(message.starts_with("eeee"));
    }

    #[tokio::test]
    async fn failed_error_body_read_is_reported() {
        struct Broken;

        impl HttpBody for Broken {
            type Data = Bytes;
            type Error = std::io::Error;

            fn poll_frame(
                self: Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Option<Result<hyper::body::Frame<Bytes>, std::io::Error>>> {
                std::task::Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
            }
        }

        let message = read_error_body(Broken).await;
        assert_eq!(
            message,
            "cannot read error response from storage node: connection reset"
        );
    }
}
