use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use salvo::async_trait;

use crate::error::StreamError;

/// Status line and headers of a remote response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_length: Option<u64>,
}

pub struct TransportResponse {
    pub head: ResponseHead,
    /// One item per network read.
    pub body: BoxStream<'static, Result<Bytes, StreamError>>,
}

/// Issues the GET behind a deferred response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// ## Errors
    /// Returns a `StreamError` if no response head could be obtained.
    async fn request_get(
        &self,
        target: &str,
        headers: &HeaderMap,
    ) -> Result<TransportResponse, StreamError>;
}
