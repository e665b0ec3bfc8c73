//! Cluster node discovery.
//!
//! A sniff asks one node for `GET /_nodes/_all/http` and turns every
//! HTTP-enabled node of the answer into a pool URL. The transport decides
//! when to sniff; this module only knows the response format.

use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Path of the node discovery request.
pub const SNIFF_PATH: &str = "/_nodes/_all/http";

/// When and how the transport discovers nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffSettings {
    /// Sniff before the first request, after connection failures, and once
    /// the node list is older than `interval`.
    pub enabled: bool,
    pub interval: Duration,
    /// Timeout of one discovery request.
    pub timeout: Duration,
}

impl Default for SniffSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Extracts node URLs from a `_nodes/http` response.
///
/// Scheme and path prefix come from `seed`, the node that answered. Nodes
/// without a published HTTP address and master-only nodes are left out. The
/// result is ordered by node id and free of duplicates.
///
/// ```
/// use estransport::sniff::node_urls;
/// use serde_json::json;
/// use url::Url;
///
/// let body = json!({"nodes": {
///     "a1": {"roles": ["data", "ingest"], "http": {"publish_address": "es-data-1/10.0.0.5:9200"}},
///     "m1": {"roles": ["master"], "http": {"publish_address": "10.0.0.9:9200"}},
/// }});
/// let urls = node_urls(&body, &Url::parse("https://es:9200/").unwrap());
/// assert_eq!(urls[0].as_str(), "https://es-data-1:9200/");
/// assert_eq!(urls.len(), 1);
/// ```
pub fn node_urls(body: &Value, seed: &Url) -> Vec<Url> {
    let Some(nodes) = body.get("nodes").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut urls: Vec<Url> = Vec::with_capacity(nodes.len());
    for (id, node) in nodes {
        if is_master_only(node) {
            tracing::debug!(node = %id, "Skipping master-only node");
            continue;
        }
        let Some(address) = node
            .get("http")
            .and_then(|http| http.get("publish_address"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        match node_url(address, seed) {
            Some(url) if !urls.contains(&url) => urls.push(url),
            Some(_) => {}
            None => tracing::warn!(node = %id, address, "Unusable publish address"),
        }
    }
    urls
}

fn is_master_only(node: &Value) -> bool {
    node.get("roles")
        .and_then(Value::as_array)
        .is_some_and(|roles| roles.len() == 1 && roles[0] == "master")
}

/// `host:port` or `hostname/ip:port` into a URL shaped like `seed`.
fn node_url(address: &str, seed: &Url) -> Option<Url> {
    let (hostname, address) = match address.split_once('/') {
        Some((hostname, ip)) => (Some(hostname).filter(|h| !h.is_empty()), ip),
        None => (None, address),
    };
    let (ip, port) = address.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    let host = hostname.unwrap_or(ip);

    let mut url = Url::parse(&format!("{}://{host}:{port}", seed.scheme())).ok()?;
    url.set_path(seed.path());
    Some(url)
}
