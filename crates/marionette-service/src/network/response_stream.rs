use std::sync::Arc;

use bytes::Bytes;

use super::checksum::DigestAccumulator;
use super::deferred::DeferredResponse;
use crate::error::ServiceResult;

/// A response body that is either already in memory or still on the wire.
#[derive(Debug, Clone)]
pub enum ResponseStream {
    Buffered(Bytes),
    Deferred(Arc<DeferredResponse>),
}

impl ResponseStream {
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// ## Errors
    /// Returns the fetch failure of a deferred body.
    pub async fn length(&self) -> ServiceResult<Option<u64>> {
        match self {
            Self::Buffered(body) => Ok(u64::try_from(body.len()).ok()),
            Self::Deferred(deferred) => deferred.length().await,
        }
    }

    /// ## Summary
    /// Hands the body to `consumer`, in one piece when buffered.
    ///
    /// The digest, if any, is fed the same bytes.
    ///
    /// ## Errors
    /// Returns the fetch failure of a deferred body.
    pub async fn stream<F>(
        &self,
        digest: Option<Box<dyn DigestAccumulator>>,
        mut consumer: F,
    ) -> ServiceResult<Option<String>>
    where
        F: FnMut(&[u8]),
    {
        match self {
            Self::Buffered(body) => {
                consumer(body);
                Ok(digest.map(|mut digest| {
                    digest.update(body);
                    digest.checksum()
                }))
            }
            Self::Deferred(deferred) => {
                if let Some(digest) = digest {
                    deferred.attach_digest(digest);
                }
                deferred.stream(consumer).await
            }
        }
    }
}

impl From<Bytes> for ResponseStream {
    fn from(body: Bytes) -> Self {
        Self::Buffered(body)
    }
}

impl From<DeferredResponse> for ResponseStream {
    fn from(deferred: DeferredResponse) -> Self {
        Self::Deferred(Arc::new(deferred))
    }
}
