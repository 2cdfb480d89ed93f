//! Transport capability used to reach the real network

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::exchange::{Request, Response};

/// Sends a request over the network
///
/// The body of the returned response must be fully buffered. Errors are
/// surfaced to callers as [`VcrError::Transport`](crate::VcrError::Transport)
/// without being inspected or retried.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and wait for the complete response
    async fn send(&self, request: &Request) -> Result<Response, BoxError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &Request) -> Result<Response, BoxError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: &Request) -> Result<Response, BoxError> {
        (**self).send(request).await
    }
}
