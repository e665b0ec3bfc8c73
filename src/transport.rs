//! The retrying, load-balancing transport.
//!
//! A [`Transport`] turns a [`Request`] into transfers on a pool of node
//! connections, runs them through a [`Multiplexer`], and classifies whatever
//! fails. Use [`TransportBuilder`] (or [`TransportBuilder::from_config`]) to
//! create one.

use crate::classify::classify;
use crate::config::{
    Auth, ConnectionConfig, DebugFilter, GetBodyStrategy, HttpVersion, KerberosSettings,
    NegotiateAuth, NegotiateProvider, TlsConfig, TransportConfig,
};
use crate::connection::{Connection, DecodedBody, PreparedRequest, TransferFailure, TransferResponse};
use crate::multiplexer::{Multiplexer, MultiplexerHandle, MultiplexerStats, Transfer};
use crate::pool::ConnectionPool;
use crate::request::{Request, RequestBody};
use crate::retry::{RetryPolicy, RetryPredicate};
use crate::sniff::{self, SniffSettings, SNIFF_PATH};
use crate::{Error, Payload, Response, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use url::Url;

/// A transport for talking to an Elasticsearch-style cluster.
///
/// Cheap to clone; clones share the pool and the multiplexer.
///
/// # Examples
///
/// ```no_run
/// use estransport::{Request, Transport};
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), estransport::Error> {
/// let transport = Transport::builder()
///     .base_urls(["http://es1:9200", "http://es2:9200"])?
///     .timeout(Duration::from_secs(30))
///     .max_active(16)
///     .max_retries(2)
///     .retry_on_timeout(true)
///     .build()?;
///
/// transport.put("/books/_doc/1", json!({"title": "Dune"})).await?;
///
/// let hits = transport
///     .perform(
///         Request::post("/books/_search")
///             .with_query_param("request_timeout", "5")
///             .with_body(json!({"query": {"match": {"title": "dune"}}})),
///     )
///     .await?;
/// println!("{:?}", hits.data);
///
/// if let Some(stats) = transport.close().await? {
///     println!("ran {} transfers", stats.completed);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    pool: ConnectionPool,
    multiplexer: MultiplexerHandle,
    /// Drive loop spawned by `build`, when no handle was supplied.
    driver: Mutex<Option<JoinHandle<MultiplexerStats>>>,
    default_headers: HeaderMap,
    timeout: Duration,
    retry_policy: RetryPolicy,
    retry_predicate: Option<Box<dyn RetryPredicate>>,
    get_body_strategy: GetBodyStrategy,
    /// Settings for connections created by node discovery.
    connection_config: ConnectionConfig,
    sniff: SniffSettings,
    /// When the node list was last discovered. Held for the whole discovery.
    last_sniff: tokio::sync::Mutex<Option<Instant>>,
}

impl Transport {
    pub fn builder() -> TransportBuilder {
        TransportBuilder::new()
    }

    /// Sends a request, retrying on other nodes as the retry rule allows.
    ///
    /// `HEAD` requests yield [`Payload::Exists`]; a `404` on `HEAD` is
    /// `Exists(false)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns the classified error of the last attempt, or a local error
    /// when the request cannot be sent or the response cannot be decoded.
    pub async fn perform(&self, request: Request) -> Result<Response<Payload>> {
        let is_head = request.method == Method::HEAD;
        let normalized = request.normalize(self.inner.get_body_strategy)?;
        if self.inner.sniff.enabled {
            self.resniff(false).await;
        }

        let mut headers = self.inner.default_headers.clone();
        headers.extend(normalized.headers);
        let timeout = normalized.timeout.unwrap_or(self.inner.timeout);

        let start = Instant::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let entry = self.inner.pool.next();
            let connection = Arc::clone(entry.connection());
            let url = connection.url_for(&normalized.path, &normalized.query);

            tracing::debug!(
                method = %normalized.method,
                url = %url,
                attempt = attempt,
                "Executing request"
            );

            let transfer = Transfer::new(
                connection,
                PreparedRequest {
                    method: normalized.method.clone(),
                    url: url.clone(),
                    headers: headers.clone(),
                    body: normalized.body.clone(),
                    timeout,
                    ignore: normalized.ignore.clone(),
                },
            );
            let outcome = self.inner.multiplexer.submit(transfer).outcome().await;

            let failure = match outcome {
                Ok(response) => {
                    entry.mark_live();
                    tracing::info!(
                        method = %normalized.method,
                        url = %url,
                        attempt = attempt,
                        status = response.status.as_u16(),
                        latency_ms = response.duration.as_millis(),
                        "Request completed"
                    );
                    return into_response(response, is_head, start.elapsed(), attempt);
                }
                Err(failure) => failure,
            };

            if let TransferFailure::Http(http) = &failure {
                if is_head && http.status == StatusCode::NOT_FOUND {
                    entry.mark_live();
                    return Ok(Response::new(
                        Payload::Exists(false),
                        http.body.clone(),
                        http.status,
                        http.headers.clone(),
                        start.elapsed(),
                        attempt,
                    ));
                }
            }

            let error = classify(&failure);
            let retryable = match &self.inner.retry_predicate {
                Some(predicate) => predicate.should_retry(&error, attempt),
                None => self.inner.retry_policy.should_retry(&error, attempt),
            };

            tracing::warn!(
                method = %normalized.method,
                url = %url,
                attempt = attempt,
                status = error.status().map(|s| s.as_u16()),
                latency_ms = error.record().map(|r| r.duration.as_millis()),
                error = %error,
                retryable = retryable,
                "Request failed"
            );

            if retryable && self.inner.retry_policy.allows_another(attempt) {
                entry.mark_dead();
                if self.inner.sniff.enabled && matches!(failure, TransferFailure::Engine(_)) {
                    self.resniff(true).await;
                }
                continue;
            }
            return Err(error);
        }
    }

    /// Sends `method path` with the given query, headers and body.
    ///
    /// `request_timeout` and `ignore` in `query` are applied to the call and
    /// not transmitted.
    ///
    /// # Errors
    ///
    /// See [`Transport::perform`].
    pub async fn request<K, V>(
        &self,
        method: Method,
        path: impl Into<String>,
        query: impl IntoIterator<Item = (K, V)>,
        headers: HeaderMap,
        body: Option<RequestBody>,
    ) -> Result<Response<Payload>>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = Request::new(method, path)
            .with_query_params(query.into_iter().map(|(k, v)| (k.into(), v.into())));
        request.headers = headers;
        request.body = body;
        self.perform(request).await
    }

    pub async fn get(&self, path: impl Into<String>) -> Result<Response<Payload>> {
        self.perform(Request::get(path)).await
    }

    /// Returns whether `path` exists.
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than `404`.
    pub async fn head(&self, path: impl Into<String>) -> Result<bool> {
        let response = self.perform(Request::head(path)).await?;
        Ok(matches!(response.data, Payload::Exists(true)))
    }

    pub async fn put(&self, path: impl Into<String>, body: impl Into<RequestBody>) -> Result<Response<Payload>> {
        self.perform(Request::put(path).with_body(body)).await
    }

    pub async fn post(&self, path: impl Into<String>, body: impl Into<RequestBody>) -> Result<Response<Payload>> {
        self.perform(Request::post(path).with_body(body)).await
    }

    pub async fn delete(&self, path: impl Into<String>) -> Result<Response<Payload>> {
        self.perform(Request::delete(path)).await
    }

    /// Stops the multiplexer.
    ///
    /// When this transport spawned the drive loop, waits for in-flight and
    /// queued transfers to finish and returns the loop's stats. Later calls,
    /// and transports built on a supplied handle, return `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the drive loop was cancelled.
    pub async fn close(&self) -> Result<Option<MultiplexerStats>> {
        self.inner.multiplexer.stop();
        let driver = match self.inner.driver.lock() {
            Ok(mut driver) => driver.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(driver) = driver else {
            return Ok(None);
        };
        match driver.await {
            Ok(stats) => Ok(Some(stats)),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(Error::Closed),
        }
    }

    /// Returns whether the cluster answers `HEAD /` successfully.
    pub async fn ping(&self) -> bool {
        match self.perform(Request::head("/")).await {
            Ok(response) => matches!(response.data, Payload::Exists(true)),
            Err(e) => {
                tracing::debug!(error = %e, "Ping failed");
                false
            }
        }
    }

    /// Discovers the cluster's nodes and replaces the pool with them.
    ///
    /// Live nodes are asked first and the first usable answer wins. Returns
    /// the new number of nodes.
    ///
    /// # Errors
    ///
    /// Returns the error of the last node asked when none of them listed an
    /// HTTP node, or a configuration error when a discovered node cannot be
    /// set up. The pool is unchanged on error.
    pub async fn sniff(&self) -> Result<usize> {
        let mut last_sniff = self.inner.last_sniff.lock().await;
        let result = self.refresh_nodes().await;
        *last_sniff = Some(Instant::now());
        result
    }

    /// Number of nodes in the pool.
    pub fn nodes(&self) -> usize {
        self.inner.pool.len()
    }

    /// Number of pool entries currently considered live.
    pub fn live_nodes(&self) -> usize {
        self.inner.pool.live_count()
    }

    /// Rediscovers nodes when `force` is set or the node list is stale.
    /// Failures keep the current pool.
    async fn resniff(&self, force: bool) {
        let mut last_sniff = self.inner.last_sniff.lock().await;
        if !force && last_sniff.is_some_and(|at| at.elapsed() < self.inner.sniff.interval) {
            return;
        }
        match self.refresh_nodes().await {
            Ok(nodes) => tracing::debug!(nodes = nodes, forced = force, "Nodes discovered"),
            Err(e) => tracing::warn!(error = %e, "Node discovery failed, keeping current nodes"),
        }
        *last_sniff = Some(Instant::now());
    }

    async fn refresh_nodes(&self) -> Result<usize> {
        let urls = self.discover().await?;
        self.inner
            .pool
            .rebuild(urls, |url| Connection::new(url, &self.inner.connection_config))
    }

    async fn discover(&self) -> Result<Vec<Url>> {
        let mut entries: Vec<_> = self.inner.pool.entries().iter().cloned().collect();
        entries.sort_by_key(|entry| entry.is_dead());

        let mut last_error = None;
        for entry in entries {
            let connection = Arc::clone(entry.connection());
            let url = connection.url_for(SNIFF_PATH, &[]);
            tracing::debug!(url = %url, "Discovering nodes");

            let transfer = Transfer::new(
                connection,
                PreparedRequest {
                    method: Method::GET,
                    url: url.clone(),
                    headers: self.inner.default_headers.clone(),
                    body: None,
                    timeout: self.inner.sniff.timeout,
                    ignore: Vec::new(),
                },
            );
            let error = match self.inner.multiplexer.submit(transfer).outcome().await {
                Ok(response) => {
                    let text = match response.body {
                        DecodedBody::Text(text) => text,
                        DecodedBody::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    };
                    match serde_json::from_str::<Value>(&text) {
                        Ok(body) => {
                            let urls = sniff::node_urls(&body, entry.connection().base_url());
                            if !urls.is_empty() {
                                return Ok(urls);
                            }
                            Error::Configuration(format!("node discovery on {url} found no HTTP nodes"))
                        }
                        Err(e) => Error::Deserialization {
                            raw_response: text,
                            serde_error: e.to_string(),
                            status: response.status,
                        },
                    }
                }
                Err(TransferFailure::Closed) => return Err(Error::Closed),
                Err(failure) => classify(&failure),
            };
            tracing::warn!(url = %url, error = %error, "Node discovery failed");
            last_error = Some(error);
        }
        Err(last_error.unwrap_or_else(|| {
            Error::Configuration("no nodes to discover from".to_string())
        }))
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        let ct = ct.to_ascii_lowercase();
        ct == "application/json" || ct.ends_with("+json")
    })
}

fn into_response(
    response: TransferResponse,
    is_head: bool,
    latency: Duration,
    attempts: usize,
) -> Result<Response<Payload>> {
    let TransferResponse {
        status,
        headers,
        content_type,
        body,
        ..
    } = response;

    let (data, raw_body) = if is_head {
        (Payload::Exists(status.is_success()), String::new())
    } else if body.is_empty() {
        (Payload::Empty, String::new())
    } else {
        match body {
            DecodedBody::Text(text) if is_json(content_type.as_deref()) => {
                match serde_json::from_str(&text) {
                    Ok(value) => (Payload::Json(value), text),
                    Err(e) => {
                        tracing::error!(error = %e, raw_response = %text, "Failed to deserialize response");
                        return Err(Error::Deserialization {
                            raw_response: text,
                            serde_error: e.to_string(),
                            status,
                        });
                    }
                }
            }
            DecodedBody::Text(text) => (Payload::Text(text.clone()), text),
            DecodedBody::Binary(bytes) => {
                let raw = String::from_utf8_lossy(&bytes).into_owned();
                (Payload::Binary(bytes), raw)
            }
        }
    };

    Ok(Response::new(data, raw_body, status, headers, latency, attempts))
}

/// Builder for configuring and creating a [`Transport`].
///
/// # Examples
///
/// ```no_run
/// use estransport::{DebugFilter, TlsConfig, TransportBuilder};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), estransport::Error> {
/// let transport = TransportBuilder::new()
///     .base_url("https://es.internal:9200")?
///     .basic_auth("elastic", "changeme")
///     .tls(TlsConfig {
///         ca_bundle: Some("/etc/ssl/cluster-ca.pem".into()),
///         ..TlsConfig::default()
///     })
///     .debug_filter(DebugFilter::HEADER | DebugFilter::TEXT)
///     .default_header("X-Opaque-Id", "nightly-reindex")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct TransportBuilder {
    urls: Vec<Url>,
    default_headers: HeaderMap,
    connection: ConnectionConfig,
    kerberos: Option<KerberosSettings>,
    timeout: Duration,
    max_active: usize,
    poll_interval: Duration,
    retry_policy: RetryPolicy,
    retry_predicate: Option<Box<dyn RetryPredicate>>,
    get_body_strategy: GetBodyStrategy,
    multiplexer: Option<MultiplexerHandle>,
    sniff: SniffSettings,
}

impl TransportBuilder {
    pub fn new() -> Self {
        let defaults = TransportConfig::default();
        Self {
            urls: Vec::new(),
            default_headers: HeaderMap::new(),
            connection: ConnectionConfig::default(),
            kerberos: None,
            timeout: defaults.timeout,
            max_active: defaults.max_active,
            poll_interval: defaults.poll_interval,
            retry_policy: RetryPolicy::default(),
            retry_predicate: None,
            get_body_strategy: GetBodyStrategy::default(),
            multiplexer: None,
            sniff: SniffSettings {
                enabled: defaults.sniff,
                interval: defaults.sniff_interval,
                timeout: defaults.sniff_timeout,
            },
        }
    }

    /// Starts from a deserialized [`TransportConfig`].
    ///
    /// Secret files are read here. Kerberos settings still need a provider,
    /// see [`TransportBuilder::negotiate_provider`].
    ///
    /// # Errors
    ///
    /// Returns an error for invalid URLs, unreadable secret files,
    /// conflicting authentication or unknown debug filters.
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        let (auth, kerberos) = config.resolve_auth()?;
        let mut builder = Self::new()
            .base_urls(&config.urls)?
            .timeout(config.timeout)
            .max_active(config.max_active)
            .poll_interval(config.poll_interval)
            .max_retries(config.max_retries)
            .retry_on_timeout(config.retry_on_timeout)
            .retry_on_status(config.retry_on_status.iter().copied())
            .get_body_strategy(config.get_body_strategy)
            .http_version(config.http_version)
            .user_agent(&config.user_agent)
            .tls(config.tls.clone())
            .debug_filter(config.debug_filter()?)
            .sniff(config.sniff)
            .sniff_interval(config.sniff_interval)
            .sniff_timeout(config.sniff_timeout);
        builder.connection.auth = auth;
        builder.kerberos = kerberos;
        if let Some(identity) = &config.impersonate {
            builder = builder.impersonate(identity);
        }
        Ok(builder)
    }

    /// Adds a node URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or not `http`/`https`.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "Unsupported URL scheme '{}' in {url}",
                url.scheme()
            )));
        }
        self.urls.push(url);
        Ok(self)
    }

    /// Adds several node URLs.
    ///
    /// # Errors
    ///
    /// Returns an error on the first invalid URL.
    pub fn base_urls<I, S>(self, urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter().try_fold(self, |builder, url| builder.base_url(url))
    }

    /// Adds a header sent with every request unless the request sets it.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Default timeout of one attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maximum concurrent transfers of the multiplexer `build` creates.
    pub fn max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }

    /// Upper bound on one idle wait of the multiplexer `build` creates.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.retry_policy.max_retries = max_retries;
        self
    }

    pub fn retry_on_timeout(mut self, retry: bool) -> Self {
        self.retry_policy.retry_on_timeout = retry;
        self
    }

    /// Replaces the set of statuses that are retried.
    pub fn retry_on_status(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_policy.retry_on_status = statuses.into_iter().collect();
        self
    }

    /// Replaces the retry decision. The `max_retries` ceiling still applies.
    pub fn retry_predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.retry_predicate = Some(predicate);
        self
    }

    pub fn get_body_strategy(mut self, strategy: GetBodyStrategy) -> Self {
        self.get_body_strategy = strategy;
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.connection.auth = Auth::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.connection.auth = Auth::Bearer(token.into());
        self
    }

    /// Authenticates with SPNEGO tokens from `provider`.
    pub fn negotiate(mut self, settings: KerberosSettings, provider: Arc<dyn NegotiateProvider>) -> Self {
        self.kerberos = None;
        self.connection.auth = Auth::Negotiate(NegotiateAuth { settings, provider });
        self
    }

    /// Supplies the provider for Kerberos settings loaded by
    /// [`TransportBuilder::from_config`]. Does nothing without such settings.
    pub fn negotiate_provider(self, provider: Arc<dyn NegotiateProvider>) -> Self {
        match self.kerberos.clone() {
            Some(settings) => self.negotiate(settings, provider),
            None => self,
        }
    }

    /// Sends requests on behalf of `identity`.
    pub fn impersonate(mut self, identity: impl Into<String>) -> Self {
        self.connection.impersonate = Some(identity.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.connection.user_agent = user_agent.into();
        self
    }

    pub fn http_version(mut self, version: HttpVersion) -> Self {
        self.connection.http_version = version;
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.connection.tls = tls;
        self
    }

    pub fn debug_filter(mut self, filter: DebugFilter) -> Self {
        self.connection.debug = filter;
        self
    }

    pub fn tcp_keepalive(mut self, enabled: bool) -> Self {
        self.connection.tcp_keepalive = enabled;
        self
    }

    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.connection.tcp_nodelay = enabled;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.connection.max_redirects = max;
        self
    }

    /// Discovers nodes before the first request, after connection failures
    /// and whenever the node list is older than the sniff interval. The
    /// configured URLs only seed the first discovery.
    pub fn sniff(mut self, enabled: bool) -> Self {
        self.sniff.enabled = enabled;
        self
    }

    pub fn sniff_interval(mut self, interval: Duration) -> Self {
        self.sniff.interval = interval;
        self
    }

    pub fn sniff_timeout(mut self, timeout: Duration) -> Self {
        self.sniff.timeout = timeout;
        self
    }

    /// Runs transfers on an existing multiplexer instead of spawning one.
    pub fn multiplexer(mut self, handle: MultiplexerHandle) -> Self {
        self.multiplexer = Some(handle);
        self
    }

    /// Builds the transport.
    ///
    /// Without a supplied multiplexer handle the drive loop is spawned on the
    /// current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no node URL was given,
    /// `max_active` or `poll_interval` is zero, Kerberos settings lack a
    /// provider, a connection cannot be set up, or no runtime is available
    /// to spawn the drive loop on.
    pub fn build(self) -> Result<Transport> {
        if self.max_active == 0 {
            return Err(Error::Configuration(
                "max_active must be at least 1".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Configuration(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.kerberos.is_some() {
            return Err(Error::Configuration(
                "kerberos authentication requires a negotiate provider".to_string(),
            ));
        }

        let connections = self
            .urls
            .into_iter()
            .map(|url| Connection::new(url, &self.connection))
            .collect::<Result<Vec<_>>>()?;
        let pool = ConnectionPool::new(connections)?;

        let (multiplexer, driver) = match self.multiplexer {
            Some(handle) => (handle, None),
            None => {
                let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
                    Error::Configuration(
                        "no tokio runtime to run the multiplexer on; build inside a runtime or supply a handle"
                            .to_string(),
                    )
                })?;
                let (multiplexer, handle) = Multiplexer::new(self.max_active)?;
                let driver = runtime.spawn(multiplexer.drive(self.poll_interval));
                (handle, Some(driver))
            }
        };

        tracing::debug!(
            nodes = pool.len(),
            max_active = self.max_active,
            timeout_ms = self.timeout.as_millis(),
            max_retries = self.retry_policy.max_retries,
            sniff = self.sniff.enabled,
            "Transport built"
        );

        Ok(Transport {
            inner: Arc::new(TransportInner {
                pool,
                multiplexer,
                driver: Mutex::new(driver),
                default_headers: self.default_headers,
                timeout: self.timeout,
                retry_policy: self.retry_policy,
                retry_predicate: self.retry_predicate,
                get_body_strategy: self.get_body_strategy,
                connection_config: self.connection,
                sniff: self.sniff,
                last_sniff: tokio::sync::Mutex::new(None),
            }),
        })
    }
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
