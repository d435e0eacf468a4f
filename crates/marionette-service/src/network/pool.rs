//! Outbound HTTP clients configured by the active mechanism.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Method, Response};
use salvo::async_trait;

use marionette_core::config::HttpClientConfig;

use super::deferred::DeferredResponse;
use super::transport::{ResponseHead, Transport, TransportResponse};
use crate::error::{ServiceError, ServiceResult, StreamError};
use crate::mechanism::{ActiveMechanism, ClientOptions};

pub struct HttpPool {
    config: HttpClientConfig,
    mechanism: ActiveMechanism,
    /// Only populated when keep-alive is enabled.
    cache: Mutex<HashMap<String, Arc<AuthHttpClient>>>,
}

impl HttpPool {
    /// ## Summary
    /// Creates a pool and runs the mechanism's client `init` hook.
    ///
    /// ## Errors
    /// Returns an error if the mechanism rejects the options.
    pub fn new(
        config: HttpClientConfig,
        mechanism: ActiveMechanism,
        options: &ClientOptions,
    ) -> ServiceResult<Self> {
        mechanism.client().init(options)?;
        Ok(Self {
            config,
            mechanism,
            cache: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub const fn keep_alive(&self) -> bool {
        self.config.keep_alive
    }

    /// ## Summary
    /// Builds a fresh client for `host:port`.
    ///
    /// ## Errors
    /// Returns an error if the proxy or the mechanism's TLS material is unusable.
    pub fn client(&self, host: &str, port: u16) -> ServiceResult<AuthHttpClient> {
        let timeout = self.config.timeout();
        let mut builder = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout);

        builder = match self.config.proxy_url() {
            Some(url) => builder.proxy(reqwest::Proxy::all(url)?),
            None => builder.no_proxy(),
        };
        if !self.config.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }
        builder = self.mechanism.client().setup_outbound_connection(builder)?;

        let scheme = if self.mechanism.client().uses_tls() {
            "https"
        } else {
            "http"
        };
        tracing::debug!(
            mechanism = self.mechanism.name(),
            host,
            port,
            scheme,
            "Built outbound client"
        );

        Ok(AuthHttpClient {
            client: builder.build()?,
            base_url: format!("{scheme}://{host}:{port}"),
            mechanism: self.mechanism.clone(),
            timeout,
        })
    }

    /// ## Summary
    /// Returns a client for `host:port`, reusing a cached one when keep-alive
    /// is enabled and `reset` is false.
    ///
    /// ## Errors
    /// Returns an error if a new client cannot be built.
    pub fn http_instance(
        &self,
        host: &str,
        port: u16,
        reset: bool,
    ) -> ServiceResult<Arc<AuthHttpClient>> {
        if !self.config.keep_alive {
            return Ok(Arc::new(self.client(host, port)?));
        }

        let key = format!("{host}:{port}");
        let mut cache = self.cache.lock();
        if !reset && let Some(client) = cache.get(&key) {
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(self.client(host, port)?);
        cache.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Drops every cached client.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

/// A client whose requests carry the active mechanism's credentials.
pub struct AuthHttpClient {
    client: reqwest::Client,
    base_url: String,
    mechanism: ActiveMechanism,
    timeout: Duration,
}

impl AuthHttpClient {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> ServiceResult<Response> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        let request = self.mechanism.client().prepare_request(request);
        Ok(request.send().await?)
    }

    /// ## Errors
    /// Returns an error if no response arrives.
    pub async fn get(&self, path: &str, headers: HeaderMap) -> ServiceResult<Response> {
        self.send(Method::GET, path, headers, None).await
    }

    /// ## Errors
    /// Returns an error if no response arrives.
    pub async fn delete(&self, path: &str, headers: HeaderMap) -> ServiceResult<Response> {
        self.send(Method::DELETE, path, headers, None).await
    }

    /// ## Errors
    /// Returns an error if no response arrives.
    pub async fn post(
        &self,
        path: &str,
        body: impl Into<Bytes>,
        headers: HeaderMap,
    ) -> ServiceResult<Response> {
        self.send(Method::POST, path, headers, Some(body.into())).await
    }

    /// ## Errors
    /// Returns an error if no response arrives.
    pub async fn put(
        &self,
        path: &str,
        body: impl Into<Bytes>,
        headers: HeaderMap,
    ) -> ServiceResult<Response> {
        self.send(Method::PUT, path, headers, Some(body.into())).await
    }

    /// ## Summary
    /// A GET whose body is fetched lazily in the background.
    #[must_use]
    pub fn deferred_get(self: &Arc<Self>, path: &str, headers: HeaderMap) -> DeferredResponse {
        let transport: Arc<dyn Transport> = Arc::clone(self) as Arc<dyn Transport>;
        DeferredResponse::new(path, headers, transport, self.timeout)
    }
}

impl std::fmt::Debug for AuthHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHttpClient")
            .field("base_url", &self.base_url)
            .field("mechanism", &self.mechanism)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for AuthHttpClient {
    async fn request_get(
        &self,
        target: &str,
        headers: &HeaderMap,
    ) -> Result<TransportResponse, StreamError> {
        let response = self
            .get(target, headers.clone())
            .await
            .map_err(|err| match err {
                ServiceError::HttpClientError(e) => {
                    StreamError::from_reqwest(target, &e, self.timeout)
                }
                other => StreamError::Network {
                    target: target.to_string(),
                    message: other.to_string(),
                },
            })?;

        let head = ResponseHead {
            status: response.status(),
            headers: response.headers().clone(),
            content_length: response.content_length(),
        };
        let owned_target = target.to_string();
        let timeout = self.timeout;
        let body = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|e| StreamError::from_reqwest(&owned_target, &e, timeout))
            })
            .boxed();

        Ok(TransportResponse { head, body })
    }
}
