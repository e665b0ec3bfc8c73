//! A configured endpoint that executes one HTTP transfer at a time.
//!
//! A [`Connection`] is built once per cluster node from a
//! [`ConnectionConfig`]. [`Connection::perform`] runs a single exchange
//! (following redirects itself) and hands back the raw result;
//! [`Connection::resolve`] turns that result into a decoded response or an
//! opaque [`TransferFailure`]. Classification of failures happens later, in the
//! transport.

use crate::config::{Auth, CertFormat, ConnectionConfig, DebugFilter, HttpVersion, TlsConfig, RUN_AS_HEADER};
use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use http::{Method, StatusCode};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use url::Url;

const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// A fully resolved request, ready to run on a [`Connection`].
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    /// Absolute URL, query string included.
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Deadline for the whole exchange, redirects included.
    pub timeout: Duration,
    /// Statuses accepted as success in addition to 2xx.
    pub ignore: Vec<u16>,
}

/// What came back from the engine, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawExchange {
    pub status: StatusCode,
    /// The status line of the final response, e.g. `HTTP/1.1 200 OK`.
    pub status_line: String,
    /// Headers of the final response only.
    pub headers: HeaderMap,
    pub body: Bytes,
    /// The URL that produced the final response.
    pub url: Url,
    pub duration: Duration,
}

/// Coarse category of an engine-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Timeout,
    Connect,
    Redirect,
    Body,
    Request,
    Other,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineErrorKind::Timeout => "timeout",
            EngineErrorKind::Connect => "connect",
            EngineErrorKind::Redirect => "redirect",
            EngineErrorKind::Body => "body",
            EngineErrorKind::Request => "request",
            EngineErrorKind::Other => "engine",
        };
        f.write_str(name)
    }
}

/// A transfer that failed below HTTP.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
    pub url: String,
    pub duration: Duration,
}

impl EngineError {
    fn new(kind: EngineErrorKind, message: impl Into<String>, url: &Url, start: Instant) -> Self {
        Self {
            kind,
            message: message.into(),
            url: url.to_string(),
            duration: start.elapsed(),
        }
    }

    fn from_reqwest(error: &reqwest::Error, url: &Url, start: Instant) -> Self {
        let kind = if error.is_timeout() {
            EngineErrorKind::Timeout
        } else if error.is_connect() {
            EngineErrorKind::Connect
        } else if error.is_redirect() {
            EngineErrorKind::Redirect
        } else if error.is_body() || error.is_decode() {
            EngineErrorKind::Body
        } else if error.is_request() || error.is_builder() {
            EngineErrorKind::Request
        } else {
            EngineErrorKind::Other
        };

        // reqwest's Display stops at the outermost layer; the useful part
        // (refused, dns, certificate) is further down the chain.
        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(kind, message, url, start)
    }
}

/// A response whose status is neither 2xx nor ignored.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status_line}")]
pub struct HttpFailure {
    pub status: StatusCode,
    pub status_line: String,
    /// Content type essence, without parameters.
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
    pub url: String,
    pub duration: Duration,
}

/// Why a transfer did not produce a usable response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransferFailure {
    #[error("{0}")]
    Engine(EngineError),
    #[error("{0}")]
    Http(HttpFailure),
    /// The multiplexer stopped before the transfer could run.
    #[error("multiplexer closed")]
    Closed,
}

impl TransferFailure {
    /// The HTTP status, for failures that got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransferFailure::Http(failure) => Some(failure.status),
            TransferFailure::Engine(_) | TransferFailure::Closed => None,
        }
    }
}

/// A response body after charset decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedBody {
    Text(String),
    /// Binary content types, unknown charsets and undecodable bytes.
    Binary(Bytes),
}

impl DecodedBody {
    pub fn is_empty(&self) -> bool {
        match self {
            DecodedBody::Text(text) => text.is_empty(),
            DecodedBody::Binary(bytes) => bytes.is_empty(),
        }
    }

    fn into_lossy_string(self) -> String {
        match self {
            DecodedBody::Text(text) => text,
            DecodedBody::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

/// A successful (2xx or ignored) transfer.
#[derive(Debug, Clone)]
pub struct TransferResponse {
    pub status: StatusCode,
    pub status_line: String,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    pub body: DecodedBody,
    pub url: String,
    pub duration: Duration,
}

/// Incremental response header parser.
///
/// Lines accumulate in a pending block; the blank line that ends a block
/// swaps it into the visible map in one step. With redirects every hop is
/// its own block, so the visible headers always belong to one response.
#[derive(Debug, Default)]
pub struct HeaderAccumulator {
    pending: HeaderMap,
    pending_status: Option<String>,
    visible: HeaderMap,
    status_line: Option<String>,
}

impl HeaderAccumulator {
    /// Feeds one raw header line, CRLF optional.
    pub fn push_line(&mut self, line: &[u8]) {
        let line = line.trim_ascii_end();
        if line.is_empty() {
            self.visible = std::mem::take(&mut self.pending);
            self.status_line = self.pending_status.take();
            return;
        }

        if line.starts_with(b"HTTP/") {
            self.pending.clear();
            // Header bytes are ISO-8859-1.
            self.pending_status = Some(line.iter().map(|&b| char::from(b)).collect());
            return;
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return;
        };
        let name = line[..colon].trim_ascii().to_ascii_lowercase();
        let value = line[colon + 1..].trim_ascii();
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(&name), HeaderValue::from_bytes(value)) {
            self.pending.append(name, value);
        }
    }

    /// Headers of the last completed block.
    pub fn visible(&self) -> &HeaderMap {
        &self.visible
    }

    /// Status line of the last completed block.
    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    fn into_parts(self) -> (Option<String>, HeaderMap) {
        (self.status_line, self.visible)
    }
}

#[derive(Debug, Clone, Copy)]
struct WireTrace {
    filter: DebugFilter,
}

impl WireTrace {
    fn enabled(self, flag: DebugFilter) -> bool {
        self.filter.contains(flag)
    }

    fn emit(self, flag: DebugFilter, prefix: &str, text: &str) {
        if !self.enabled(flag) {
            return;
        }
        for line in text.split(['\r', '\n']).filter(|line| !line.is_empty()) {
            tracing::debug!(target: "estransport::wire", "{prefix}{line}");
        }
    }

    fn text(self, text: &str) {
        self.emit(DebugFilter::TEXT, "   ", text);
    }

    fn tls_out(self, text: &str) {
        self.emit(DebugFilter::TLS, ">S ", text);
    }

    fn tls_in(self, text: &str) {
        self.emit(DebugFilter::TLS, "<S ", text);
    }

    fn request(self, request: &reqwest::Request) {
        if self.enabled(DebugFilter::HEADER) {
            let mut block = format!("{} {} {:?}", request.method(), request.url(), request.version());
            for (name, value) in request.headers() {
                block.push('\n');
                block.push_str(name.as_str());
                block.push_str(": ");
                if name == AUTHORIZATION {
                    block.push_str("<redacted>");
                } else {
                    block.push_str(&String::from_utf8_lossy(value.as_bytes()));
                }
            }
            self.emit(DebugFilter::HEADER, ">  ", &block);
        }
        if self.enabled(DebugFilter::DATA) {
            if let Some(body) = request.body().and_then(reqwest::Body::as_bytes) {
                self.emit(DebugFilter::DATA, ">> ", &String::from_utf8_lossy(body));
            }
        }
    }

    fn header_lines(self, lines: &[Vec<u8>]) {
        if self.enabled(DebugFilter::HEADER) {
            for line in lines {
                self.emit(DebugFilter::HEADER, "<  ", &String::from_utf8_lossy(line));
            }
        }
    }

    fn data_in(self, body: &[u8]) {
        if self.enabled(DebugFilter::DATA) {
            self.emit(DebugFilter::DATA, "<< ", &String::from_utf8_lossy(body));
        }
    }
}

/// One cluster node and the engine client configured to talk to it.
pub struct Connection {
    base_url: Url,
    http_client: reqwest::Client,
    auth: Auth,
    impersonate: Option<HeaderValue>,
    max_redirects: usize,
    /// TLS parameters announced before each `https` exchange.
    tls_summary: Option<String>,
    trace: WireTrace,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Builds a connection to `base_url`.
    ///
    /// TLS settings are only applied to `https` URLs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when certificate material cannot be
    /// loaded, the impersonation identity is not a valid header value, or the
    /// engine rejects the settings.
    pub fn new(base_url: Url, config: &ConnectionConfig) -> Result<Self> {
        let trace = WireTrace {
            filter: config.debug,
        };

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers)
            .redirect(reqwest::redirect::Policy::none())
            .gzip(true)
            .tcp_nodelay(config.tcp_nodelay)
            .tcp_keepalive(config.tcp_keepalive.then_some(TCP_KEEPALIVE));

        builder = match config.http_version {
            HttpVersion::Auto => builder,
            HttpVersion::Http1 => builder.http1_only(),
            HttpVersion::Http2 => builder.http2_prior_knowledge(),
        };

        let mut tls_summary = None;
        if base_url.scheme() == "https" {
            builder = configure_tls(builder, &config.tls)?.tls_info(trace.enabled(DebugFilter::TLS));
            tls_summary = Some(format!(
                "TLS handshake with {}: verify={} sni={} ca_bundle={} ca_directory={} client_cert={}",
                base_url.host_str().unwrap_or_default(),
                config.tls.verify,
                config.tls.sni,
                config.tls.ca_bundle.is_some(),
                config.tls.ca_certs_directory.is_some(),
                config.tls.client_cert.is_some(),
            ));
        }

        let http_client = builder.build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        let impersonate = config
            .impersonate
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|e| Error::Configuration(format!("Invalid impersonation identity: {e}")))?;

        Ok(Self {
            base_url,
            http_client,
            auth: config.auth.clone(),
            impersonate,
            max_redirects: config.max_redirects,
            tls_summary,
            trace,
        })
    }

    /// The node URL this connection talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `path` under the node URL's own path and appends `query`.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Url {
        let mut url = self.base_url.clone();
        let prefix = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        url
    }

    /// Runs one exchange, following redirects, bounded by `request.timeout`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when no final response could be obtained.
    /// HTTP error statuses are not errors at this stage.
    pub async fn perform(&self, request: &PreparedRequest) -> std::result::Result<RawExchange, EngineError> {
        let start = Instant::now();
        match tokio::time::timeout(request.timeout, self.exchange(request, start)).await {
            Ok(result) => result,
            Err(_) => {
                self.trace.text(&format!(
                    "Operation timed out after {} milliseconds",
                    request.timeout.as_millis()
                ));
                Err(EngineError::new(
                    EngineErrorKind::Timeout,
                    format!("operation timed out after {:?}", request.timeout),
                    &request.url,
                    start,
                ))
            }
        }
    }

    async fn exchange(
        &self,
        request: &PreparedRequest,
        start: Instant,
    ) -> std::result::Result<RawExchange, EngineError> {
        let mut url = request.url.clone();
        let mut headers = HeaderAccumulator::default();
        let mut redirects = 0;

        loop {
            self.trace.text(&format!("Trying {} {url}", request.method));
            let outgoing = self
                .build_request(request, &url)
                .map_err(|message| EngineError::new(EngineErrorKind::Request, message, &url, start))?;
            if let Some(summary) = self.tls_summary.as_deref().filter(|_| url.scheme() == "https") {
                self.trace.tls_out(summary);
            }
            self.trace.request(&outgoing);

            let mut response = self
                .http_client
                .execute(outgoing)
                .await
                .map_err(|e| EngineError::from_reqwest(&e, &url, start))?;

            if let Some(info) = response.extensions().get::<reqwest::tls::TlsInfo>() {
                self.trace.tls_in(&match info.peer_certificate() {
                    Some(der) => format!("TLS session established, peer certificate {} bytes", der.len()),
                    None => "TLS session established, no peer certificate".to_string(),
                });
            }

            let lines = header_lines(&response);
            self.trace.header_lines(&lines);
            for line in &lines {
                headers.push_line(line);
            }

            if let Some(next) = redirect_target(&response, &url) {
                if redirects >= self.max_redirects {
                    return Err(EngineError::new(
                        EngineErrorKind::Redirect,
                        format!("maximum ({}) redirects followed", self.max_redirects),
                        &url,
                        start,
                    ));
                }
                redirects += 1;
                self.trace.text(&format!("Issue another request to this URL: '{next}'"));
                url = next;
                continue;
            }

            let mut body = BytesMut::new();
            if request.method != Method::HEAD {
                while let Some(chunk) = response
                    .chunk()
                    .await
                    .map_err(|e| EngineError::from_reqwest(&e, &url, start))?
                {
                    body.extend_from_slice(&chunk);
                }
            }
            let body = body.freeze();
            self.trace.data_in(&body);

            let status = response.status();
            let (status_line, headers) = headers.into_parts();
            self.trace.text(&format!(
                "Completed {status} in {} ms",
                start.elapsed().as_millis()
            ));
            return Ok(RawExchange {
                status,
                status_line: status_line.unwrap_or_else(|| status.to_string()),
                headers,
                body,
                url,
                duration: start.elapsed(),
            });
        }
    }

    fn build_request(&self, request: &PreparedRequest, url: &Url) -> std::result::Result<reqwest::Request, String> {
        let mut headers = request.headers.clone();
        if !matches!(self.auth, Auth::None) {
            headers.remove(AUTHORIZATION);
        }
        if self.impersonate.is_some() {
            headers.remove(RUN_AS_HEADER);
        }

        let mut builder = self
            .http_client
            .request(request.method.clone(), url.clone())
            .headers(headers);

        builder = match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Negotiate(negotiate) => {
                let host = url.host_str().unwrap_or_default();
                match negotiate.provider.token(&negotiate.settings, host) {
                    Ok(token) => builder.header(AUTHORIZATION, format!("Negotiate {token}")),
                    Err(e) => {
                        // Sent without credentials; the node's 401 reports the failure.
                        tracing::warn!(host, error = %e, "No negotiate token, sending request unauthenticated");
                        self.trace.text(&format!("negotiate token unavailable: {e}"));
                        builder
                    }
                }
            }
        };

        if let Some(identity) = &self.impersonate {
            builder = builder.header(RUN_AS_HEADER, identity.clone());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder.build().map_err(|e| e.to_string())
    }

    /// Decodes an exchange and applies the success rule: 2xx or a status in
    /// `ignore`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferFailure::Http`] for any other status.
    pub fn resolve(exchange: RawExchange, ignore: &[u16]) -> std::result::Result<TransferResponse, TransferFailure> {
        let RawExchange {
            status,
            status_line,
            headers,
            body,
            url,
            duration,
        } = exchange;
        let (content_type, body) = decode_body(&headers, body);

        if status.is_success() || ignore.contains(&status.as_u16()) {
            Ok(TransferResponse {
                status,
                status_line,
                headers,
                content_type,
                body,
                url: url.to_string(),
                duration,
            })
        } else {
            Err(TransferFailure::Http(HttpFailure {
                status,
                status_line,
                content_type,
                headers,
                body: body.into_lossy_string(),
                url: url.to_string(),
                duration,
            }))
        }
    }
}

fn configure_tls(mut builder: reqwest::ClientBuilder, tls: &TlsConfig) -> Result<reqwest::ClientBuilder> {
    builder = builder
        .use_rustls_tls()
        .danger_accept_invalid_certs(!tls.verify)
        .tls_sni(tls.sni);

    if let Some(path) = &tls.ca_bundle {
        let certs = reqwest::Certificate::from_pem_bundle(&read_file(path)?).map_err(|e| {
            Error::Configuration(format!("Invalid CA bundle '{}': {e}", path.display()))
        })?;
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }
    if let Some(dir) = &tls.ca_certs_directory {
        for cert in read_cert_directory(dir)? {
            builder = builder.add_root_certificate(cert);
        }
    }

    match (&tls.client_cert, &tls.client_key) {
        (None, None) => {}
        (None, Some(_)) => {
            return Err(Error::Configuration(
                "client key given without a client certificate".to_string(),
            ))
        }
        (Some(cert_path), key_path) => {
            if tls.cert_format == CertFormat::Der || tls.key_format == CertFormat::Der {
                return Err(Error::Configuration(
                    "DER client identities are not supported, convert them to PEM".to_string(),
                ));
            }
            if tls.key_password.is_some() {
                return Err(Error::Configuration(
                    "encrypted client keys are not supported, provide an unencrypted PEM key"
                        .to_string(),
                ));
            }
            let mut pem = read_file(cert_path)?;
            if let Some(key_path) = key_path {
                pem.push(b'\n');
                pem.extend_from_slice(&read_file(key_path)?);
            }
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                Error::Configuration(format!("Invalid client identity '{}': {e}", cert_path.display()))
            })?;
            builder = builder.identity(identity);
        }
    }

    Ok(builder)
}

/// Loads every PEM certificate found in the regular files of `dir`.
///
/// Files without certificates are skipped, but the directory must yield at
/// least one.
fn read_cert_directory(dir: &Path) -> Result<Vec<reqwest::Certificate>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::Configuration(format!("Can't read CA directory '{}': {e}", dir.display()))
    })?;
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut certs = Vec::new();
    for path in paths {
        match reqwest::Certificate::from_pem_bundle(&read_file(&path)?) {
            Ok(found) => certs.extend(found),
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping non-certificate file"),
        }
    }
    if certs.is_empty() {
        return Err(Error::Configuration(format!(
            "No PEM certificates found in CA directory '{}'",
            dir.display()
        )));
    }
    Ok(certs)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::Configuration(format!("Can't read '{}': {e}", path.display())))
}

/// Rebuilds the raw header block of `response`.
///
/// The reason phrase is the one the server sent when it differs from the
/// canonical one, which the engine only keeps for HTTP/1.
fn header_lines(response: &reqwest::Response) -> Vec<Vec<u8>> {
    let status = response.status();
    let reason = match response.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => status.canonical_reason().unwrap_or_default().to_string(),
    };
    let status_line = format!("{:?} {} {reason}", response.version(), status.as_u16());

    let mut lines = Vec::with_capacity(response.headers().len() + 2);
    lines.push(status_line.trim_end().as_bytes().to_vec());
    for (name, value) in response.headers() {
        let mut line = Vec::with_capacity(name.as_str().len() + value.len() + 2);
        line.extend_from_slice(name.as_str().as_bytes());
        line.extend_from_slice(b": ");
        line.extend_from_slice(value.as_bytes());
        lines.push(line);
    }
    lines.push(Vec::new());
    lines
}

fn redirect_target(response: &reqwest::Response, current: &Url) -> Option<Url> {
    if !matches!(response.status().as_u16(), 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

/// Splits the content type off `headers` and decodes `raw` with its charset.
///
/// Without a content type the body is taken as UTF-8 text.
pub fn decode_body(headers: &HeaderMap, raw: Bytes) -> (Option<String>, DecodedBody) {
    let mime = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok());
    let Some(mime) = mime else {
        return (None, decode_utf8(raw));
    };

    let content_type = Some(mime.essence_str().to_string());
    if !is_textual(&mime) {
        return (content_type, DecodedBody::Binary(raw));
    }

    let charset = mime
        .get_param(mime::CHARSET)
        .map(|charset| charset.as_str().to_ascii_lowercase());
    let body = match charset.as_deref() {
        None | Some("utf-8" | "utf8" | "us-ascii" | "ascii") => decode_utf8(raw),
        Some("iso-8859-1" | "iso8859-1" | "latin1" | "latin-1") => {
            DecodedBody::Text(raw.iter().map(|&b| char::from(b)).collect())
        }
        Some(_) => DecodedBody::Binary(raw),
    };
    (content_type, body)
}

fn decode_utf8(raw: Bytes) -> DecodedBody {
    match std::str::from_utf8(&raw) {
        Ok(text) => DecodedBody::Text(text.to_owned()),
        Err(_) => DecodedBody::Binary(raw),
    }
}

fn is_textual(mime: &mime::Mime) -> bool {
    mime.type_() == mime::TEXT
        || mime.subtype() == mime::JSON
        || mime.suffix() == Some(mime::JSON)
        || mime.subtype() == mime::XML
        || mime.suffix() == Some(mime::XML)
        || matches!(mime.subtype().as_str(), "x-ndjson" | "yaml" | "x-yaml")
}
