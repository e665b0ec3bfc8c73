//! Integration tests using wiremock to simulate cluster nodes.

use estransport::multiplexer::Multiplexer;
use estransport::{
    DebugFilter, Error, ErrorKind, GetBodyStrategy, KerberosSettings, NegotiateProvider, Payload,
    Request, RequestBody, RetryPredicate, Transport,
};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{
    basic_auth, body_json, body_string, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("estransport=debug")
        .with_test_writer()
        .try_init();
}

async fn transport_for(server: &MockServer) -> Transport {
    Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn test_successful_get_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_cluster/health"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "green"})))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    let response = transport.get("/_cluster/health").await.unwrap();

    assert_eq!(response.data, Payload::Json(json!({"status": "green"})));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
    assert_eq!(response.raw_body, r#"{"status":"green"}"#);
}

#[tokio::test]
async fn test_text_and_empty_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_cat/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("green 3 3\n"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/idx"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    let response = transport.get("/_cat/health").await.unwrap();
    assert_eq!(response.data, Payload::Text("green 3 3\n".to_string()));

    let response = transport.delete("/idx").await.unwrap();
    assert_eq!(response.data, Payload::Empty);
}

#[tokio::test]
async fn test_head_reports_existence() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/present"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/absent"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    assert!(transport.head("/present").await.unwrap());
    assert!(!transport.head("/absent").await.unwrap());

    // A 404 on HEAD is an answer, not a failure to retry.
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_not_found_classification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/idx/_doc/1"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"_index": "idx", "_id": "1", "found": false})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nowhere"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no handler"))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;

    match transport.get("/idx/_doc/1").await {
        Err(Error::NotFound { message, record }) => {
            assert_eq!(message, "Document 'idx/1' not found");
            assert_eq!(record.status, Some(StatusCode::NOT_FOUND));
            assert!(record.url.ends_with("/idx/_doc/1"));
        }
        other => panic!("Expected NotFound, got {other:?}"),
    }

    let err = transport.get("/nowhere").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpNotFound);
    assert_eq!(err.raw_response(), Some("no handler"));
}

#[tokio::test]
async fn test_batch_failures_from_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/idx/_update_by_query"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "total": 3,
            "failures": [
                {"index": "idx", "id": "a", "status": 409},
                {"index": "idx", "id": "b", "status": 409},
                {"index": "idx", "id": "c", "status": 409}
            ]
        })))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    let result = transport
        .post("/idx/_update_by_query", json!({"script": {"source": "ctx._source.n++"}}))
        .await;

    match result {
        Err(Error::Batch { count, first, .. }) => {
            assert_eq!(count, 3);
            assert_eq!(first["id"], "a");
        }
        other => panic!("Expected Batch, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_retry_ceiling_on_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/idx/_search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .max_retries(3)
        .build()
        .unwrap();

    let err = transport.get("/idx/_search").await.unwrap_err();
    match &err {
        Error::Http { status, .. } => assert_eq!(*status, StatusCode::SERVICE_UNAVAILABLE),
        other => panic!("Expected Http, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn test_non_retryable_status_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/idx/_search"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"type": "parsing_exception", "reason": "unknown query [mtch]"},
            "status": 400
        })))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    match transport.get("/idx/_search").await {
        Err(Error::Request { reason, .. }) => assert_eq!(reason, "unknown query [mtch]"),
        other => panic!("Expected Request, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_timeout_retries_then_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .timeout(Duration::from_millis(200))
        .max_retries(2)
        .retry_on_timeout(true)
        .build()
        .unwrap();

    match transport.get("/slow").await {
        Err(Error::ConnectionTimeout { record }) => {
            assert!(record.duration > Duration::ZERO);
            assert_eq!(record.status, None);
        }
        other => panic!("Expected ConnectionTimeout, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_timeout_not_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    let err = transport
        .perform(Request::get("/slow").with_query_param("request_timeout", "0.2"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionTimeout);
    assert_eq!(request_count(&server).await, 1);
}

struct CountingPredicate {
    calls: Arc<AtomicUsize>,
}

impl RetryPredicate for CountingPredicate {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        error.is_connection_level()
    }
}

#[tokio::test]
async fn test_connection_refused_uses_custom_predicate() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let calls = Arc::new(AtomicUsize::new(0));

    let transport = Transport::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .unwrap()
        .max_retries(2)
        .retry_predicate(Box::new(CountingPredicate {
            calls: Arc::clone(&calls),
        }))
        .build()
        .unwrap();

    match transport.get("/").await {
        Err(Error::Connection { record, .. }) => assert_eq!(record.status, None),
        other => panic!("Expected Connection, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(transport.live_nodes(), 0);
}

#[tokio::test]
async fn test_failover_to_next_node() {
    let down = MockServer::start().await;
    let up = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&down)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&up)
        .await;

    let transport = Transport::builder()
        .base_urls([down.uri(), up.uri()])
        .unwrap()
        .build()
        .unwrap();

    let response = transport.get("/").await.unwrap();
    assert_eq!(response.attempts, 2);
    assert_eq!(transport.live_nodes(), 1);

    // The dead node is skipped while a live one remains.
    for _ in 0..3 {
        assert_eq!(transport.get("/").await.unwrap().attempts, 1);
    }
    assert_eq!(request_count(&down).await, 1);
    assert_eq!(request_count(&up).await, 4);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"acknowledged": true}))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .max_active(5)
        .build()
        .unwrap();

    let calls = (0..20).map(|i| {
        let transport = transport.clone();
        async move { transport.get(format!("/idx-{i}")).await }
    });
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(Result::is_ok));

    let stats = transport.close().await.unwrap().unwrap();
    assert_eq!(stats.submitted, 20);
    assert_eq!(stats.completed, 20);
    assert_eq!(stats.succeeded, 20);
    assert!(stats.peak_active <= 5);
    assert!(stats.peak_waiting > 0);
    assert_eq!(request_count(&server).await, 20);
}

#[tokio::test]
async fn test_control_params_are_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/idx/_doc/missing"))
        .and(query_param("routing", "r1"))
        .and(query_param_is_missing("ignore"))
        .and(query_param_is_missing("request_timeout"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"found": false})))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    let response = transport
        .request(
            Method::GET,
            "/idx/_doc/missing",
            [("routing", "r1"), ("ignore", "404"), ("request_timeout", "3")],
            HeaderMap::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.data, Payload::Json(json!({"found": false})));
}

#[tokio::test]
async fn test_get_with_body_is_sent_as_post() {
    let server = MockServer::start().await;
    let query = json!({"query": {"term": {"user": "kimchy"}}});
    Mock::given(method("POST"))
        .and(path("/idx/_search"))
        .and(header("content-type", "application/json"))
        .and(body_json(&query))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {"total": 1}})))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    let response = transport
        .perform(Request::get("/idx/_search").with_body(query.clone()))
        .await
        .unwrap();
    assert_eq!(response.data.as_json().unwrap()["hits"]["total"], 1);
}

#[tokio::test]
async fn test_get_with_body_as_source_param() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/idx/_search"))
        .and(query_param("source", r#"{"size":0}"#))
        .and(query_param("source_content_type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {}})))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .get_body_strategy(GetBodyStrategy::Source)
        .build()
        .unwrap();
    let response = transport
        .perform(Request::get("/idx/_search").with_body(json!({"size": 0})))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_bulk_ndjson_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(header("content-type", "application/x-ndjson"))
        .and(body_string("{\"delete\":{\"_id\":\"1\"}}\n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": false})))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    let body = RequestBody::NdJson(vec![json!({"delete": {"_id": "1"}})]);
    let response = transport.post("/_bulk", body).await.unwrap();
    assert_eq!(response.data, Payload::Json(json!({"errors": false})));
}

#[tokio::test]
async fn test_auth_and_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_security/_authenticate"))
        .and(basic_auth("elastic", "changeme"))
        .and(header("x-opaque-id", "job-7"))
        .and(header("es-security-runas-user", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .basic_auth("elastic", "changeme")
        .impersonate("alice")
        .default_header("X-Opaque-Id", "job-7")
        .unwrap()
        .build()
        .unwrap();

    // Configured credentials win over a caller-supplied Authorization header.
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Bearer stale"));
    let response = transport
        .request(
            Method::GET,
            "/_security/_authenticate",
            Vec::<(String, String)>::new(),
            headers,
            None,
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized"})))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .bearer_token("expired")
        .build()
        .unwrap();
    let err = transport.get("/").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(request_count(&server).await, 1);
}

struct StaticNegotiate;

impl NegotiateProvider for StaticNegotiate {
    fn token(&self, settings: &KerberosSettings, host: &str) -> Result<String, String> {
        assert_eq!(settings.principal.as_deref(), Some("svc@EXAMPLE.COM"));
        assert_eq!(host, "127.0.0.1");
        Ok("YIIGhgYJKoZIhvcS".to_string())
    }
}

#[tokio::test]
async fn test_negotiate_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Negotiate YIIGhgYJKoZIhvcS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let settings = KerberosSettings {
        principal: Some("svc@EXAMPLE.COM".to_string()),
        ..KerberosSettings::default()
    };
    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .negotiate(settings, Arc::new(StaticNegotiate))
        .build()
        .unwrap();
    assert!(transport.get("/").await.is_ok());
}

#[tokio::test]
async fn test_redirect_shows_final_headers() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", "/new")
                .insert_header("x-hop", "first"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"moved": true})))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .debug_filter(DebugFilter::all())
        .build()
        .unwrap();
    let response = transport.get("/old").await.unwrap();
    assert_eq!(response.data, Payload::Json(json!({"moved": true})));
    assert!(response.header("location").is_none());
    assert!(response.header("x-hop").is_none());
}

#[tokio::test]
async fn test_redirect_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .max_redirects(2)
        .max_retries(0)
        .build()
        .unwrap();
    match transport.get("/loop").await {
        Err(Error::Connection { message, .. }) => assert!(message.contains("redirects")),
        other => panic!("Expected Connection, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_close_rejects_new_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    transport.get("/").await.unwrap();

    let stats = transport.close().await.unwrap().unwrap();
    assert_eq!(stats.completed, 1);
    assert!(transport.close().await.unwrap().is_none());

    let err = transport.get("/").await.unwrap_err();
    assert!(matches!(err, Error::Closed));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_transports_share_a_multiplexer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (multiplexer, handle) = Multiplexer::new(2).unwrap();
    let driver = tokio::spawn(multiplexer.drive(Duration::from_millis(100)));

    let first = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .multiplexer(handle.clone())
        .build()
        .unwrap();
    let second = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .multiplexer(handle.clone())
        .build()
        .unwrap();

    first.get("/a").await.unwrap();
    second.get("/b").await.unwrap();

    // Transports do not own a supplied multiplexer.
    assert!(first.close().await.unwrap().is_none());
    handle.stop();
    let stats = driver.await.unwrap();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 0);
}

struct NoTicket {
    calls: AtomicUsize,
}

impl NegotiateProvider for NoTicket {
    fn token(&self, _settings: &KerberosSettings, _host: &str) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("no kerberos ticket".to_string())
    }
}

#[tokio::test]
async fn test_negotiate_without_ticket_is_authentication_failure() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401)
                    .insert_header("www-authenticate", "Negotiate")
                    .set_body_json(json!({
                        "error": {"type": "security_exception", "reason": "missing authentication credentials"},
                        "status": 401
                    })),
            )
            .mount(server)
            .await;
    }

    let provider = Arc::new(NoTicket {
        calls: AtomicUsize::new(0),
    });
    let transport = Transport::builder()
        .base_urls([first.uri(), second.uri()])
        .unwrap()
        .negotiate(KerberosSettings::default(), provider.clone())
        .build()
        .unwrap();

    let err = transport.get("/").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(transport.live_nodes(), 2);

    let requests = first.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(request_count(&second).await, 0);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Indexes one document with `filter` set and returns the wire lines traced.
async fn traced_exchange(filter: DebugFilter) -> Vec<String> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/books/_doc"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": "created"})))
        .mount(&server)
        .await;

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("estransport::wire=debug")
        .with_ansi(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .debug_filter(filter)
        .build()
        .unwrap();
    transport.post("/books/_doc", json!({"title": "Dune"})).await.unwrap();
    transport.close().await.unwrap();

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    output
        .lines()
        .filter_map(|line| line.split_once("estransport::wire: "))
        .map(|(_, message)| message.to_string())
        .collect()
}

#[tokio::test]
async fn test_wire_trace_data_only() {
    let lines = traced_exchange(DebugFilter::DATA).await;
    assert!(lines.iter().any(|line| line == r#">> {"title":"Dune"}"#), "{lines:?}");
    assert!(lines.iter().any(|line| line == r#"<< {"result":"created"}"#), "{lines:?}");
    assert!(
        lines.iter().all(|line| line.starts_with(">> ") || line.starts_with("<< ")),
        "{lines:?}"
    );
}

#[tokio::test]
async fn test_wire_trace_headers_only() {
    let lines = traced_exchange(DebugFilter::HEADER).await;
    assert!(lines.iter().any(|line| line.starts_with(">  POST ")), "{lines:?}");
    assert!(lines.iter().any(|line| line == ">  content-type: application/json"), "{lines:?}");
    assert!(lines.iter().any(|line| line.starts_with("<  HTTP/1.1 201")), "{lines:?}");
    assert!(
        lines.iter().all(|line| line.starts_with(">  ") || line.starts_with("<  ")),
        "{lines:?}"
    );

    assert!(traced_exchange(DebugFilter::empty()).await.is_empty());
}

#[tokio::test]
async fn test_close_drains_queued_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"found": true}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .max_active(2)
        .build()
        .unwrap();

    let calls: Vec<_> = (0..8)
        .map(|i| {
            let transport = transport.clone();
            tokio::spawn(async move { transport.get(format!("/books/_doc/{i}")).await })
        })
        .collect();
    // Let every call reach the multiplexer; most of them are still queued.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = transport.close().await.unwrap().unwrap();
    for call in calls {
        assert!(call.await.unwrap().is_ok());
    }
    assert_eq!(stats.submitted, 8);
    assert_eq!(stats.succeeded, 8);
    assert_eq!(stats.rejected, 0);
    assert_eq!(stats.peak_active, 2);
    assert!(stats.peak_waiting > 0);
    assert_eq!(request_count(&server).await, 8);
}

fn nodes_body(addresses: &[String]) -> serde_json::Value {
    let nodes: serde_json::Map<String, serde_json::Value> = addresses
        .iter()
        .enumerate()
        .map(|(i, address)| {
            (
                format!("node-{i}"),
                json!({"roles": ["data"], "http": {"publish_address": address}}),
            )
        })
        .collect();
    json!({"cluster_name": "test", "nodes": nodes})
}

async fn sniff_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| {
        requests
            .iter()
            .filter(|request| request.url.path() == "/_nodes/_all/http")
            .count()
    })
}

#[tokio::test]
async fn test_sniff_on_start_replaces_seed_nodes() {
    let seed = MockServer::start().await;
    let data = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_all/http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body(&[data.address().to_string()])))
        .mount(&seed)
        .await;
    Mock::given(method("GET"))
        .and(path("/_cluster/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "green"})))
        .mount(&data)
        .await;

    let transport = Transport::builder()
        .base_url(seed.uri())
        .unwrap()
        .sniff(true)
        .sniff_interval(Duration::from_secs(3600))
        .build()
        .unwrap();

    for _ in 0..3 {
        transport.get("/_cluster/health").await.unwrap();
    }
    assert_eq!(transport.nodes(), 1);
    assert_eq!(request_count(&seed).await, 1);
    assert_eq!(sniff_count(&seed).await, 1);
    assert_eq!(request_count(&data).await, 3);
}

#[tokio::test]
async fn test_sniff_refresh_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_all/http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body(&[server.address().to_string()])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .sniff(true)
        .sniff_interval(Duration::ZERO)
        .build()
        .unwrap();
    transport.get("/").await.unwrap();
    transport.get("/").await.unwrap();
    assert_eq!(sniff_count(&server).await, 2);
    assert_eq!(transport.nodes(), 1);
}

#[tokio::test]
async fn test_sniff_after_connection_failure() {
    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let server = MockServer::start().await;
    let live = server.address().to_string();
    Mock::given(method("GET"))
        .and(path("/_nodes/_all/http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body(&[closed, live.clone()])))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_all/http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body(&[live])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/books/_count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 42})))
        .mount(&server)
        .await;

    let transport = Transport::builder()
        .base_url(server.uri())
        .unwrap()
        .sniff(true)
        .sniff_interval(Duration::from_secs(3600))
        .build()
        .unwrap();

    let response = transport.get("/books/_count").await.unwrap();
    assert_eq!(response.data, Payload::Json(json!({"count": 42})));
    assert_eq!(response.attempts, 2);
    assert_eq!(sniff_count(&server).await, 2);
    assert_eq!(transport.nodes(), 1);
    assert_eq!(transport.live_nodes(), 1);
}

#[tokio::test]
async fn test_failed_sniff_keeps_pool() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_all/http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nodes": {}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let transport = transport_for(&server).await;
    let err = transport.sniff().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(transport.nodes(), 1);
    assert!(transport.get("/").await.is_ok());
}

#[tokio::test]
async fn test_ping() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    assert!(transport_for(&server).await.ping().await);

    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let transport = Transport::builder()
        .base_url(format!("http://{closed}"))
        .unwrap()
        .max_retries(0)
        .build()
        .unwrap();
    assert!(!transport.ping().await);
}
