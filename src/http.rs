//! HTTP transport.
//!
//! Network access goes through the [`Transport`] trait so the release fetcher,
//! manifest store and repository manager can be exercised without a network.
//! [`HttpTransport`] is the production implementation on top of `reqwest`;
//! [`MemoryTransport`] serves canned responses keyed by URL.
//!
//! Requests carry no deadline: a slow mirror simply makes the command slower.

use crate::error::{Result, RpmGetError};
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Mutex;

/// An outgoing GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Response status, advertised length and a body stream.
pub struct Response {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Vec<u8>>>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Collect the whole body into memory.
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

pub trait Transport: Send + Sync {
    fn get(&self, request: Request) -> BoxFuture<'_, Result<Response>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn get(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        (**self).get(request)
    }
}

/// Fetch a URL and return its body, failing on non-2xx responses.
pub async fn fetch_bytes<T: Transport + ?Sized>(transport: &T, request: Request) -> Result<Vec<u8>> {
    let url = request.url.clone();
    let response = transport.get(request).await?;
    if !response.is_success() {
        return Err(RpmGetError::HttpStatus {
            url,
            status: response.status,
        });
    }
    response.bytes().await
}

/// `reqwest`-backed transport that stamps every request with the configured
/// user agent.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(async move {
            tracing::debug!("GET {}", request.url);

            let mut builder = self
                .client
                .get(&request.url)
                .header(reqwest::header::USER_AGENT, &self.user_agent);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let content_length = response.content_length();
            tracing::debug!("{} -> HTTP {}", request.url, status);

            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()).map_err(RpmGetError::from))
                .boxed();

            Ok(Response {
                status,
                content_length,
                body,
            })
        })
    }
}

#[derive(Clone)]
struct Route {
    status: u16,
    body: Vec<u8>,
    interrupted: bool,
}

/// In-memory transport serving fixed bodies. Unknown URLs answer 404.
/// Every request is recorded so callers can assert on URLs and headers.
#[derive(Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<Request>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.insert(url, status, body.into(), false);
    }

    /// Serve `partial` with a 200, then fail the body stream with a
    /// connection reset.
    pub fn route_interrupted(&self, url: &str, partial: impl Into<Vec<u8>>) {
        self.insert(url, 200, partial.into(), true);
    }

    fn insert(&self, url: &str, status: u16, body: Vec<u8>, interrupted: bool) {
        self.routes.lock().unwrap_or_else(|e| e.into_inner()).insert(
            url.to_string(),
            Route {
                status,
                body,
                interrupted,
            },
        );
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Transport for MemoryTransport {
    fn get(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        let route = self
            .routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&request.url)
            .cloned()
            .unwrap_or(Route {
                status: 404,
                body: b"Not Found".to_vec(),
                interrupted: false,
            });
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        Box::pin(async move {
            let Route {
                status,
                body,
                interrupted,
            } = route;

            let chunks = if interrupted {
                vec![
                    Ok(body.clone()),
                    Err(RpmGetError::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    ))),
                ]
            } else {
                // Two chunks, to exercise streaming consumers.
                let mid = body.len() / 2;
                vec![Ok(body[..mid].to_vec()), Ok(body[mid..].to_vec())]
            };
            let content_length = if interrupted {
                None
            } else {
                Some(body.len() as u64)
            };

            Ok(Response {
                status,
                content_length,
                body: futures::stream::iter(chunks).boxed(),
            })
        })
    }
}
