//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Forward a buffered request to an upstream and buffer its response
//! - Issue health probes
//! - Enforce connect/send/read/attempt deadlines
//!
//! The [`UpstreamClient`] trait is the seam between the core and socket
//! I/O; [`HyperUpstreamClient`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::resilience::timeouts::{within, UpstreamTimeouts};

const USER_AGENT: &str = concat!("upstream-lb-health-check/", env!("CARGO_PKG_VERSION"));

/// A fully buffered request bound for one upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Absolute URL including path and query.
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport-level failure: the upstream produced no usable response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out after {after:?} waiting for {phase}")]
    Timeout { after: Duration, phase: &'static str },

    #[error("upstream request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Forward one request under the given budgets.
    async fn send(
        &self,
        request: UpstreamRequest,
        timeouts: &UpstreamTimeouts,
    ) -> Result<UpstreamResponse, TransportError>;

    /// GET `url` and report the status code.
    async fn probe(&self, url: &str, timeout: Duration) -> Result<StatusCode, TransportError>;
}

/// Response bodies larger than this are refused unless configured otherwise.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// hyper-util backed client.
#[derive(Clone)]
pub struct HyperUpstreamClient {
    client: Client<HttpConnector, Body>,
    max_response_bytes: usize,
}

impl HyperUpstreamClient {
    pub fn new(timeouts: &UpstreamTimeouts) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(timeouts.connect);
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Cap on a buffered upstream response body.
    pub fn with_response_limit(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }
}

fn request_error(e: hyper_util::client::legacy::Error) -> TransportError {
    if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl UpstreamClient for HyperUpstreamClient {
    async fn send(
        &self,
        request: UpstreamRequest,
        timeouts: &UpstreamTimeouts,
    ) -> Result<UpstreamResponse, TransportError> {
        let mut builder = Request::builder().method(request.method).uri(&request.url);
        if let Some(headers) = builder.headers_mut() {
            *headers = request.headers;
        }
        let req = builder
            .body(Body::from(request.body))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let attempt = async {
            let response = within(timeouts.response_head(), "response head", async {
                self.client.request(req).await.map_err(request_error)
            })
            .await?;

            let (parts, body): (_, hyper::body::Incoming) = response.into_parts();
            let limit = self.max_response_bytes;
            let body = within(timeouts.read, "response body", async {
                axum::body::to_bytes(Body::new(body), limit).await.map_err(|e| {
                    TransportError::Request(format!("response body (limit {limit} bytes): {e}"))
                })
            })
            .await?;

            Ok::<_, TransportError>(UpstreamResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        within(timeouts.next, "attempt", attempt).await
    }

    async fn probe(&self, url: &str, timeout: Duration) -> Result<StatusCode, TransportError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(url)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = within(Some(timeout), "health probe", async {
            self.client.request(req).await.map_err(request_error)
        })
        .await?;

        Ok(response.status())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::{routing::get, Router};

    async fn serve(body: &'static str) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/", get(move || async move { body }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn get_request(addr: SocketAddr) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::GET,
            url: format!("http://{addr}/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_response_within_limit() {
        let addr = serve("0123456789").await;
        let client = HyperUpstreamClient::new(&UpstreamTimeouts::default()).with_response_limit(10);

        let response = client.send(get_request(addr), &UpstreamTimeouts::default()).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_oversized_response_is_transport_error() {
        let addr = serve("this upstream answer is far longer than sixteen bytes").await;
        let client = HyperUpstreamClient::new(&UpstreamTimeouts::default()).with_response_limit(16);

        let err = client
            .send(get_request(addr), &UpstreamTimeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HyperUpstreamClient::new(&UpstreamTimeouts::default());
        let err = client
            .send(get_request(addr), &UpstreamTimeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "{err:?}");
    }
}
