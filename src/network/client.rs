//! HTTP client transport for forwarding cache misses

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::ext::ReasonPhrase;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use super::transport::Transport;
use super::{POOL_IDLE_TIMEOUT_SECS, POOL_MAX_IDLE_PER_HOST};
use crate::error::BoxError;
use crate::exchange::{is_content_header, Request, Response};

/// Transport backed by a pooled hyper client (plain HTTP)
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    /// Create a new HTTP transport
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build_http();

        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: &Request) -> Result<Response, BoxError> {
        debug!("Forwarding {} {}", request.method, request.uri);

        let http_request = to_hyper_request(request)?;

        let response = self.client.request(http_request).await.map_err(|e| {
            warn!("Request failed: {e}");
            e
        })?;

        from_hyper_response(response).await
    }
}

/// Build a hyper request carrying both header lists and the body
fn to_hyper_request(request: &Request) -> Result<hyper::Request<Full<Bytes>>, BoxError> {
    let mut builder = hyper::Request::builder()
        .method(request.method.clone())
        .uri(request.uri.clone());

    for (name, values) in request.headers.iter().chain(request.content_headers.iter()) {
        for value in values {
            builder = builder.header(name, value.as_str());
        }
    }

    let body = request.body.clone().unwrap_or_default();
    Ok(builder.body(Full::new(body))?)
}

/// Buffer a hyper response into the cache model
async fn from_hyper_response(response: hyper::Response<Incoming>) -> Result<Response, BoxError> {
    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();

    let mut response = Response::new(parts.status);
    if let Some(reason) = parts.extensions.get::<ReasonPhrase>() {
        response.reason = String::from_utf8_lossy(reason.as_bytes()).into_owned();
    }

    for (name, value) in &parts.headers {
        // The body is buffered, so chunked framing no longer applies.
        if *name == hyper::header::TRANSFER_ENCODING {
            continue;
        }

        let value = String::from_utf8_lossy(value.as_bytes());
        if is_content_header(name.as_str()) {
            response.content_headers.append(name.as_str(), value);
        } else {
            response.headers.append(name.as_str(), value);
        }
    }

    if !body.is_empty() || !response.content_headers.is_empty() {
        response = response.with_body(body);
    }

    Ok(response)
}
