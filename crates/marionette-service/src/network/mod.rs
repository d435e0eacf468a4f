//! Outbound requests and the streaming response bridge.
//!
//! ## Module Organization
//!
//! - `checksum`: incremental digests over streamed bodies
//! - `deferred`: lazily started GETs streamed through a bounded channel
//! - `pool`: mechanism-aware HTTP clients
//! - `response_stream`: buffered and deferred bodies behind one interface
//! - `transport`: the seam between the bridge and the HTTP client

pub mod checksum;
pub mod deferred;
pub mod pool;
pub mod response_stream;
pub mod transport;

pub use checksum::{ChecksumAlgorithm, ChecksumStream, DigestAccumulator};
pub use deferred::{DeferredResponse, StreamState};
pub use pool::{AuthHttpClient, HttpPool};
pub use response_stream::ResponseStream;
pub use transport::{ResponseHead, Transport, TransportResponse};
