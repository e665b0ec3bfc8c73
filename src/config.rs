//! Connection and transport configuration.
//!
//! [`ConnectionConfig`] holds the per-connection settings every transfer is
//! built from. [`TransportConfig`] is the flat, deserializable form of the
//! whole construction surface; feed it to
//! [`TransportBuilder::from_config`](crate::TransportBuilder::from_config).

use crate::{Error, Result};
use bitflags::bitflags;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Default User-Agent sent with every transfer.
pub const DEFAULT_USER_AGENT: &str = concat!("estransport/", env!("CARGO_PKG_VERSION"));

/// Header carrying the identity to impersonate.
pub const RUN_AS_HEADER: &str = "es-security-runas-user";

bitflags! {
    /// Selects which wire trace lines are emitted.
    ///
    /// Each flag toggles one family of lines independently. Lines go to the
    /// `estransport::wire` tracing target at debug level.
    ///
    /// ```
    /// use estransport::DebugFilter;
    ///
    /// let filter: DebugFilter = "header, data".parse().unwrap();
    /// assert!(filter.contains(DebugFilter::HEADER));
    /// assert!(!filter.contains(DebugFilter::TLS));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DebugFilter: u8 {
        /// Informational milestones (connecting, redirecting, completed).
        const TEXT   = 1 << 0;
        /// Request and response header lines.
        const HEADER = 1 << 1;
        /// Request and response bodies.
        const DATA   = 1 << 2;
        /// TLS session parameters.
        const TLS    = 1 << 3;
    }
}

impl FromStr for DebugFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut filter = DebugFilter::empty();
        for name in s.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            filter |= match name.to_ascii_lowercase().as_str() {
                "text" => DebugFilter::TEXT,
                "header" => DebugFilter::HEADER,
                "data" => DebugFilter::DATA,
                "tls" | "ssl" => DebugFilter::TLS,
                other => {
                    return Err(Error::Configuration(format!(
                        "Unknown debug filter: {other}"
                    )))
                }
            };
        }
        Ok(filter)
    }
}

/// Encoding of certificate and key files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CertFormat {
    #[default]
    #[serde(alias = "pem", alias = "PEM")]
    Pem,
    #[serde(alias = "der", alias = "DER")]
    Der,
}

/// HTTP protocol version pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum HttpVersion {
    /// Let the engine negotiate.
    #[default]
    #[serde(alias = "auto")]
    Auto,
    /// HTTP/1.1 only.
    #[serde(alias = "1.1", alias = "http1")]
    Http1,
    /// HTTP/2 with prior knowledge.
    #[serde(alias = "2", alias = "http2")]
    Http2,
}

/// What to do with a body attached to a `GET` or `HEAD` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GetBodyStrategy {
    /// Send the request as `POST` instead.
    #[default]
    Post,
    /// Move the body into the `source` query parameter.
    Source,
    /// Refuse the request.
    Reject,
}

/// TLS settings, applied when the node URL is `https`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Verify the server certificate chain and host name.
    pub verify: bool,
    /// Send the server name indication extension.
    pub sni: bool,
    /// Extra CA bundle to trust.
    pub ca_bundle: Option<PathBuf>,
    /// Directory whose PEM files are all trusted as CA certificates.
    pub ca_certs_directory: Option<PathBuf>,
    /// Client certificate for mutual TLS.
    pub client_cert: Option<PathBuf>,
    pub cert_format: CertFormat,
    /// Private key matching `client_cert`.
    pub client_key: Option<PathBuf>,
    pub key_format: CertFormat,
    /// Passphrase for an encrypted `client_key`.
    pub key_password: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify: true,
            sni: true,
            ca_bundle: None,
            ca_certs_directory: None,
            client_cert: None,
            cert_format: CertFormat::Pem,
            client_key: None,
            key_format: CertFormat::Pem,
            key_password: None,
        }
    }
}

/// Where Kerberos credentials come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KerberosSettings {
    pub principal: Option<String>,
    pub keytab: Option<PathBuf>,
    pub ccache: Option<String>,
}

/// Produces SPNEGO tokens for negotiate authentication.
///
/// The transport has no GSSAPI binding of its own; plug one in here.
pub trait NegotiateProvider: Send + Sync {
    /// Returns the base64 token to send as `Authorization: Negotiate <token>`.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic message when no token can be produced.
    fn token(&self, settings: &KerberosSettings, host: &str) -> std::result::Result<String, String>;
}

/// Negotiate settings paired with the provider that turns them into tokens.
#[derive(Clone)]
pub struct NegotiateAuth {
    pub settings: KerberosSettings,
    pub provider: Arc<dyn NegotiateProvider>,
}

impl fmt::Debug for NegotiateAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiateAuth")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Authentication attached to every transfer.
#[derive(Clone, Default)]
pub enum Auth {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer(String),
    Negotiate(NegotiateAuth),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Auth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Auth::Negotiate(negotiate) => fmt::Debug::fmt(negotiate, f),
        }
    }
}

/// Settings shared by every transfer of a connection.
///
/// Created once when the transport is built and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub tls: TlsConfig,
    pub auth: Auth,
    /// Identity sent in the run-as header.
    pub impersonate: Option<String>,
    pub user_agent: String,
    pub http_version: HttpVersion,
    pub tcp_keepalive: bool,
    pub tcp_nodelay: bool,
    pub debug: DebugFilter,
    /// Redirect hops followed before giving up.
    pub max_redirects: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            tls: TlsConfig::default(),
            auth: Auth::None,
            impersonate: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_version: HttpVersion::Auto,
            tcp_keepalive: true,
            tcp_nodelay: true,
            debug: DebugFilter::empty(),
            max_redirects: 5,
        }
    }
}

/// Deserializable form of the transport construction surface.
///
/// ```
/// use estransport::TransportConfig;
///
/// let config: TransportConfig = serde_json::from_str(r#"{
///     "urls": ["https://es1:9200", "https://es2:9200"],
///     "max_active": 4,
///     "timeout": "30s",
///     "retry_on_timeout": true,
///     "tls": { "ca_bundle": "/etc/ssl/cluster-ca.pem" }
/// }"#).unwrap();
///
/// assert_eq!(config.max_active, 4);
/// assert_eq!(config.max_retries, 3);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub urls: Vec<String>,
    pub max_active: usize,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Upper bound on one idle wait of the multiplexer loop.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    pub max_retries: usize,
    pub retry_on_timeout: bool,
    pub retry_on_status: Vec<u16>,
    pub get_body_strategy: GetBodyStrategy,
    pub http_version: HttpVersion,
    pub user_agent: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_file: Option<PathBuf>,
    pub bearer_token: Option<String>,
    pub bearer_token_file: Option<PathBuf>,
    pub impersonate: Option<String>,
    pub kerberos: Option<KerberosSettings>,
    pub tls: TlsConfig,
    pub debug: bool,
    /// Comma-separated [`DebugFilter`] names, used when `debug` is set.
    pub debug_filters: String,
    /// Discover cluster nodes and replace the configured URLs with them.
    pub sniff: bool,
    /// Age after which the node list is discovered again.
    #[serde(with = "humantime_serde")]
    pub sniff_interval: Duration,
    /// Timeout of one discovery request.
    #[serde(with = "humantime_serde")]
    pub sniff_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            max_active: 10,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            max_retries: 3,
            retry_on_timeout: false,
            retry_on_status: vec![502, 503, 504],
            get_body_strategy: GetBodyStrategy::Post,
            http_version: HttpVersion::Auto,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            username: None,
            password: None,
            password_file: None,
            bearer_token: None,
            bearer_token_file: None,
            impersonate: None,
            kerberos: None,
            tls: TlsConfig::default(),
            debug: false,
            debug_filters: "header,data,text".to_string(),
            sniff: false,
            sniff_interval: Duration::from_secs(60),
            sniff_timeout: Duration::from_secs(1),
        }
    }
}

impl TransportConfig {
    /// Resolves the configured authentication, reading secret files.
    ///
    /// Kerberos settings are returned separately because they need a
    /// [`NegotiateProvider`] before they can become an [`Auth`].
    ///
    /// # Errors
    ///
    /// Returns an error when both basic and Kerberos authentication are
    /// requested, or when a secret file cannot be read.
    pub fn resolve_auth(&self) -> Result<(Auth, Option<KerberosSettings>)> {
        let explicit_user =
            self.username.is_some() || self.password.is_some() || self.password_file.is_some();
        if explicit_user && self.kerberos.is_some() {
            return Err(Error::Configuration(
                "both kerberos and login/password authentication requested".to_string(),
            ));
        }

        if let Some(kerberos) = &self.kerberos {
            return Ok((Auth::None, Some(kerberos.clone())));
        }

        let password = match (&self.password, &self.password_file) {
            (Some(password), _) => Some(password.clone()),
            (None, Some(path)) => Some(read_secret(path)?),
            (None, None) => None,
        };
        if let (Some(username), Some(password)) = (&self.username, password) {
            return Ok((
                Auth::Basic {
                    username: username.clone(),
                    password,
                },
                None,
            ));
        }

        let token = match (&self.bearer_token, &self.bearer_token_file) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(path)) => Some(read_secret(path)?),
            (None, None) => None,
        };
        Ok((token.map_or(Auth::None, Auth::Bearer), None))
    }

    /// Returns the debug filter in effect.
    ///
    /// # Errors
    ///
    /// Returns an error when `debug_filters` names an unknown filter.
    pub fn debug_filter(&self) -> Result<DebugFilter> {
        if self.debug {
            self.debug_filters.parse()
        } else {
            Ok(DebugFilter::empty())
        }
    }
}

fn read_secret(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|secret| secret.trim_end_matches(['\r', '\n']).to_string())
        .map_err(|e| {
            Error::Configuration(format!("Can't read secret file '{}': {e}", path.display()))
        })
}
