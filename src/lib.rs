//! # estransport - a bounded, retrying HTTP transport for Elasticsearch-style clusters
//!
//! estransport sends requests to a cluster over a pool of node connections.
//! Transfers run concurrently through a multiplexer that caps how many are in
//! flight and queues the rest in submission order. Failures are retried on the
//! next node and end up as one classified [`Error`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use estransport::{Payload, Request, Transport};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), estransport::Error> {
//!     let transport = Transport::builder()
//!         .base_urls(["http://es1:9200", "http://es2:9200"])?
//!         .max_active(8)
//!         .build()?;
//!
//!     if !transport.head("/books").await? {
//!         transport.put("/books", json!({"settings": {"number_of_shards": 1}})).await?;
//!     }
//!
//!     let response = transport
//!         .perform(Request::get("/books/_doc/1").with_query_param("ignore", "404"))
//!         .await?;
//!     if let Payload::Json(doc) = &response.data {
//!         println!("{doc}");
//!     }
//!
//!     transport.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every failure from the cluster or the network is classified exactly once:
//!
//! ```no_run
//! use estransport::{Error, ErrorKind, Transport};
//!
//! # async fn example(transport: Transport) {
//! match transport.delete("/books/_doc/42").await {
//!     Ok(_) => {}
//!     Err(Error::NotFound { message, .. }) => eprintln!("{message}"),
//!     Err(e) if e.kind() == ErrorKind::ConnectionTimeout => eprintln!("cluster too slow: {e}"),
//!     Err(e) => {
//!         eprintln!("failed: {e}");
//!         if let Some(body) = e.raw_response() {
//!             eprintln!("  response: {body}");
//!         }
//!     }
//! }
//! # }
//! ```
//!
//! ## Node discovery
//!
//! With [`TransportBuilder::sniff`] the configured URLs only seed the pool.
//! The transport asks the cluster for its HTTP nodes before the first
//! request, after a connection failure and whenever the list grows older than
//! the sniff interval.
//!
//! ## Wire tracing
//!
//! With a [`DebugFilter`] set, each connection logs the exchange line by line
//! under the `estransport::wire` tracing target at debug level.

pub mod classify;
mod config;
pub mod connection;
mod error;
pub mod multiplexer;
pub mod pool;
mod request;
mod response;
pub mod retry;
pub mod sniff;
mod transport;

pub use config::{
    Auth, CertFormat, ConnectionConfig, DebugFilter, GetBodyStrategy, HttpVersion,
    KerberosSettings, NegotiateAuth, NegotiateProvider, TlsConfig, TransportConfig,
    DEFAULT_USER_AGENT, RUN_AS_HEADER,
};
pub use error::{Error, ErrorKind, ErrorRecord, Result};
pub use request::{NormalizedRequest, Request, RequestBody, IGNORE_PARAM, REQUEST_TIMEOUT_PARAM};
pub use response::{Payload, Response};
pub use retry::{RetryPolicy, RetryPredicate};
pub use transport::{Transport, TransportBuilder};
