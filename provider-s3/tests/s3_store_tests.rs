//! Integration tests for the S3 marker store
//!
//! The real SDK client is pointed at a local fake S3 endpoint with
//! path-style addressing. The fake answers from a handler and records
//! every request so the tests can check what went over the wire:
//! - Exhaustive listing follows continuation tokens
//! - A window listing stops after one page
//! - HeadObject 404 means absent
//! - Markers are empty, AES256 encrypted and STANDARD_IA

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client;
use bridge_traits::error::BridgeError;
use bridge_traits::object_store::{KeyListing, MarkerObject, ObjectStore};
use provider_s3::S3ObjectStore;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const BUCKET: &str = "markers";

// ============================================================================
// Fake S3 endpoint
// ============================================================================

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Payload length before any aws-chunked framing.
    fn payload_length(&self) -> Option<&str> {
        self.header("x-amz-decoded-content-length")
            .or_else(|| self.header("content-length"))
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync>;

struct FakeS3 {
    endpoint: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    server: JoinHandle<()>,
}

impl FakeS3 {
    async fn start(
        handler: impl Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let recorded = requests.clone();
        let server = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, handler, recorded).await;
                });
            }
        });

        Self {
            endpoint,
            requests,
            server,
        }
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn store(&self) -> S3ObjectStore {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .endpoint_url(&self.endpoint)
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .build();

        S3ObjectStore::from_client(Client::from_conf(conf), BUCKET)
    }
}

impl Drop for FakeS3 {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Serve one request, then close the connection.
async fn serve(
    mut socket: TcpStream,
    handler: Handler,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target.clone(), HashMap::new()),
    };

    let request = RecordedRequest {
        method,
        path,
        query,
        headers,
    };

    // Drain the body so the client sees a clean exchange.
    let content_length: usize = request
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if content_length > 0
        && request
            .header("expect")
            .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"))
    {
        socket.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
    }
    let mut body_read = buf.len() - (head_end + 4);
    if request
        .header("transfer-encoding")
        .is_some_and(|v| v.contains("chunked"))
    {
        while find(&buf[head_end + 4..], b"0\r\n\r\n").is_none() {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    } else {
        while body_read < content_length {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body_read += n;
        }
    }

    let (status, body) = handler(&request);
    recorded.lock().unwrap().push(request.clone());

    let body = if request.method == "HEAD" {
        String::new()
    } else {
        body
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Status",
    }
}

fn list_page(keys: &[&str], next_token: Option<&str>) -> String {
    let contents: String = keys
        .iter()
        .map(|key| {
            format!(
                "<Contents><Key>{}</Key><Size>0</Size><StorageClass>STANDARD_IA</StorageClass></Contents>",
                key
            )
        })
        .collect();
    let truncation = match next_token {
        Some(token) => format!(
            "<IsTruncated>true</IsTruncated><NextContinuationToken>{}</NextContinuationToken>",
            token
        ),
        None => "<IsTruncated>false</IsTruncated>".to_string(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>{}</Name><KeyCount>{}</KeyCount>{}{}</ListBucketResult>"#,
        BUCKET,
        keys.len(),
        truncation,
        contents
    )
}

const ACCESS_DENIED: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>"#;

fn keys(list: &[&str]) -> HashSet<String> {
    list.iter().map(|k| k.to_string()).collect()
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_exhaustive_listing_follows_continuation_tokens() {
    let s3 = FakeS3::start(|req| match req.query("continuation-token") {
        None => (200, list_page(&["f1", "f2"], Some("page-2"))),
        Some("page-2") => (200, list_page(&["f3"], None)),
        Some(_) => (400, String::new()),
    })
    .await;

    let found = s3
        .store()
        .list_keys("", KeyListing::Exhaustive)
        .await
        .unwrap();

    assert_eq!(found, keys(&["f1", "f2", "f3"]));

    let requests = s3.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method == "GET"));
    assert!(requests.iter().all(|r| r.path == "/markers"));
    assert!(requests.iter().all(|r| r.query("list-type") == Some("2")));
    assert!(requests.iter().all(|r| r.query("max-keys").is_none()));
    assert_eq!(requests[1].query("continuation-token"), Some("page-2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_window_listing_reads_one_page() {
    let s3 = FakeS3::start(|_| (200, list_page(&["f1", "f2"], Some("page-2")))).await;

    let found = s3
        .store()
        .list_keys("", KeyListing::Window { max_keys: 2 })
        .await
        .unwrap();

    // Keys past the window stay unseen.
    assert_eq!(found, keys(&["f1", "f2"]));

    let requests = s3.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query("max-keys"), Some("2"));
    assert!(requests[0].query("continuation-token").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_listing_is_restricted_to_prefix() {
    let s3 = FakeS3::start(|_| (200, list_page(&["drive/f1"], None))).await;

    let found = s3
        .store()
        .list_keys("drive/", KeyListing::Exhaustive)
        .await
        .unwrap();

    assert_eq!(found, keys(&["drive/f1"]));
    let prefix = s3.requests()[0].query("prefix").map(str::to_string);
    assert!(matches!(prefix.as_deref(), Some("drive/") | Some("drive%2F")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_listing_denied_maps_to_status() {
    let s3 = FakeS3::start(|_| (403, ACCESS_DENIED.to_string())).await;

    let err = s3
        .store()
        .list_keys("", KeyListing::Exhaustive)
        .await
        .unwrap_err();

    match err {
        BridgeError::Status { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("ListObjectsV2"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

// ============================================================================
// Existence checks
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_head_object_404_means_absent() {
    let s3 = FakeS3::start(|req| match req.path.as_str() {
        "/markers/f1" => (200, String::new()),
        _ => (404, String::new()),
    })
    .await;
    let store = s3.store();

    assert!(store.exists("f1").await.unwrap());
    assert!(!store.exists("f2").await.unwrap());

    let requests = s3.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method == "HEAD"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_head_object_denied_is_an_error() {
    let s3 = FakeS3::start(|_| (403, String::new())).await;

    let err = s3.store().exists("f1").await.unwrap_err();
    assert!(matches!(err, BridgeError::Status { status: 403, .. }));
}

// ============================================================================
// Marker writes
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_put_marker_writes_empty_encrypted_infrequent_access_object() {
    let s3 = FakeS3::start(|_| (200, String::new())).await;

    s3.store()
        .put_marker(&MarkerObject::new("f2"))
        .await
        .unwrap();

    let requests = s3.requests();
    assert_eq!(requests.len(), 1);

    let put = &requests[0];
    assert_eq!(put.method, "PUT");
    assert_eq!(put.path, "/markers/f2");
    assert_eq!(put.header("x-amz-server-side-encryption"), Some("AES256"));
    assert_eq!(put.header("x-amz-storage-class"), Some("STANDARD_IA"));
    assert_eq!(put.payload_length(), Some("0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_put_marker_denied_is_an_error() {
    let s3 = FakeS3::start(|_| (403, ACCESS_DENIED.to_string())).await;

    let err = s3
        .store()
        .put_marker(&MarkerObject::new("f2"))
        .await
        .unwrap_err();

    match err {
        BridgeError::Status { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("PutObject"));
        }
        other => panic!("unexpected {:?}", other),
    }
}
