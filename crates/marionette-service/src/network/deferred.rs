//! A GET whose body is fetched by a background task and pulled chunk by
//! chunk by the consumer.
//!
//! The request is only issued when the consumer first asks for the length or
//! the body. Chunks travel through a channel of capacity one, so a slow
//! consumer holds back further network reads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tokio::sync::{mpsc, watch};
use tracing_futures::Instrument;

use super::checksum::DigestAccumulator;
use super::transport::{ResponseHead, Transport, TransportResponse};
use crate::error::{ServiceError, ServiceResult, StreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamState {
    NotStarted = 0,
    Requesting = 1,
    HeadersReady = 2,
    Streaming = 3,
    Done = 4,
}

impl StreamState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Requesting,
            2 => Self::HeadersReady,
            3 => Self::Streaming,
            _ => Self::Done,
        }
    }
}

#[derive(Debug, Clone)]
enum HeadSignal {
    Pending,
    Ready(ResponseHead),
    Failed(StreamError),
}

enum Chunk {
    Data(Bytes),
    End,
}

struct Shared {
    state: AtomicU8,
    failure: Mutex<Option<StreamError>>,
}

impl Shared {
    fn set_state(&self, state: StreamState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// The sending halves, handed to the background task on start.
struct Producer {
    head: watch::Sender<HeadSignal>,
    chunks: mpsc::Sender<Chunk>,
}

pub struct DeferredResponse {
    target: String,
    request_headers: HeaderMap,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    started: AtomicBool,
    producer: Mutex<Option<Producer>>,
    head: watch::Receiver<HeadSignal>,
    chunks: tokio::sync::Mutex<mpsc::Receiver<Chunk>>,
    shared: Arc<Shared>,
    digest: Mutex<Option<Box<dyn DigestAccumulator>>>,
}

impl DeferredResponse {
    /// ## Summary
    /// Prepares a fetch of `target`. Nothing is sent until the first call to
    /// [`Self::length`], [`Self::stream`] or [`Self::next_chunk`], which must
    /// happen inside a tokio runtime.
    ///
    /// `timeout` bounds the wait for the response head and for every
    /// subsequent read.
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        request_headers: HeaderMap,
        transport: Arc<dyn Transport>,
        timeout: Duration,
    ) -> Self {
        let (head_tx, head_rx) = watch::channel(HeadSignal::Pending);
        let (chunk_tx, chunk_rx) = mpsc::channel(1);

        Self {
            target: target.into(),
            request_headers,
            transport,
            timeout,
            started: AtomicBool::new(false),
            producer: Mutex::new(Some(Producer {
                head: head_tx,
                chunks: chunk_tx,
            })),
            head: head_rx,
            chunks: tokio::sync::Mutex::new(chunk_rx),
            shared: Arc::new(Shared {
                state: AtomicU8::new(StreamState::NotStarted as u8),
                failure: Mutex::new(None),
            }),
            digest: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub const fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    /// Replaces any previously attached accumulator.
    pub fn attach_digest(&self, digest: Box<dyn DigestAccumulator>) {
        *self.digest.lock() = Some(digest);
    }

    /// ## Summary
    /// Issues the request if nobody has yet, then waits for the response head.
    ///
    /// ## Errors
    /// Returns the fetch failure if no head could be obtained.
    pub async fn ensure_started(&self) -> ServiceResult<ResponseHead> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.launch();
        }
        self.wait_for_head().await
    }

    fn launch(&self) {
        let Some(producer) = self.producer.lock().take() else {
            return;
        };
        self.shared.set_state(StreamState::Requesting);
        tracing::debug!(target = %self.target, "Starting deferred fetch");

        let fetch = Fetch {
            target: self.target.clone(),
            headers: self.request_headers.clone(),
            transport: Arc::clone(&self.transport),
            timeout: self.timeout,
            producer,
            shared: Arc::clone(&self.shared),
        };
        tokio::spawn(fetch.run().instrument(tracing::Span::current()));
    }

    async fn wait_for_head(&self) -> ServiceResult<ResponseHead> {
        let mut head = self.head.clone();
        let signal = match head
            .wait_for(|signal| !matches!(signal, HeadSignal::Pending))
            .await
        {
            Ok(signal) => signal.clone(),
            Err(_closed) => return Err(StreamError::Closed(self.target.clone()).into()),
        };

        match signal {
            HeadSignal::Ready(head) => Ok(head),
            HeadSignal::Failed(err) => Err(err.into()),
            HeadSignal::Pending => Err(ServiceError::InvariantViolation(
                "Response head still pending after signal",
            )),
        }
    }

    /// ## Errors
    /// Returns the fetch failure if no head could be obtained.
    pub async fn length(&self) -> ServiceResult<Option<u64>> {
        Ok(self.ensure_started().await?.content_length)
    }

    /// ## Summary
    /// Pulls the next chunk, or `None` once the body is complete.
    ///
    /// ## Errors
    /// Returns the background failure once the chunks delivered before it
    /// have been consumed.
    pub async fn next_chunk(&self) -> ServiceResult<Option<Bytes>> {
        self.ensure_started().await?;
        let mut chunks = self.chunks.lock().await;
        self.pull(&mut chunks).await
    }

    /// ## Summary
    /// Feeds every remaining chunk to `consumer` in arrival order and returns
    /// the hex digest when an accumulator is attached.
    ///
    /// ## Errors
    /// Returns the background failure after delivering the chunks that
    /// preceded it.
    pub async fn stream<F>(&self, mut consumer: F) -> ServiceResult<Option<String>>
    where
        F: FnMut(&[u8]),
    {
        self.ensure_started().await?;
        let mut chunks = self.chunks.lock().await;
        while let Some(chunk) = self.pull(&mut chunks).await? {
            consumer(&chunk);
        }
        Ok(self.digest.lock().as_ref().map(|digest| digest.checksum()))
    }

    async fn pull(&self, chunks: &mut mpsc::Receiver<Chunk>) -> ServiceResult<Option<Bytes>> {
        match chunks.recv().await {
            Some(Chunk::Data(bytes)) => {
                if let Some(digest) = self.digest.lock().as_mut() {
                    digest.update(&bytes);
                }
                Ok(Some(bytes))
            }
            Some(Chunk::End) => {
                self.shared.set_state(StreamState::Done);
                self.finish()
            }
            None if self.state() == StreamState::Done => self.finish(),
            None => Err(StreamError::Closed(self.target.clone()).into()),
        }
    }

    fn finish(&self) -> ServiceResult<Option<Bytes>> {
        match self.shared.failure.lock().as_ref() {
            Some(err) => Err(err.clone().into()),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for DeferredResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredResponse")
            .field("target", &self.target)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct Fetch {
    target: String,
    headers: HeaderMap,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    producer: Producer,
    shared: Arc<Shared>,
}

impl Fetch {
    async fn run(self) {
        if let Err(err) = self.pump().await {
            tracing::warn!(
                kind = "transport",
                transient = err.is_transient(),
                target = %self.target,
                error = %err,
                "Deferred fetch failed"
            );
            *self.shared.failure.lock() = Some(err.clone());
            self.producer.head.send_if_modified(|signal| {
                if matches!(signal, HeadSignal::Pending) {
                    *signal = HeadSignal::Failed(err);
                    true
                } else {
                    false
                }
            });
        }

        // Every data chunk has been received once `End` is in the channel.
        if self.producer.chunks.send(Chunk::End).await.is_err() {
            tracing::trace!(target = %self.target, "Consumer gone before end of stream");
        }
        self.shared.set_state(StreamState::Done);
    }

    fn timed_out(&self) -> StreamError {
        StreamError::Timeout {
            target: self.target.clone(),
            timeout: self.timeout,
        }
    }

    async fn pump(&self) -> Result<(), StreamError> {
        let TransportResponse { head, mut body } = tokio::time::timeout(
            self.timeout,
            self.transport.request_get(&self.target, &self.headers),
        )
        .await
        .map_err(|_elapsed| self.timed_out())??;

        self.shared.set_state(StreamState::HeadersReady);
        self.producer.head.send_replace(HeadSignal::Ready(head.clone()));
        check_status(&self.target, head.status)?;

        loop {
            let Some(chunk) = tokio::time::timeout(self.timeout, body.next())
                .await
                .map_err(|_elapsed| self.timed_out())?
            else {
                return Ok(());
            };

            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            self.shared.set_state(StreamState::Streaming);
            if self.producer.chunks.send(Chunk::Data(chunk)).await.is_err() {
                tracing::debug!(target = %self.target, "Consumer dropped the response");
                return Ok(());
            }
        }
    }
}

fn check_status(target: &str, status: StatusCode) -> Result<(), StreamError> {
    if status == StatusCode::NOT_FOUND {
        return Err(StreamError::NoContent(target.to_string()));
    }
    if !status.is_success() {
        return Err(StreamError::RemoteStatus {
            target: target.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}
