//! Google Drive API connector implementation
//!
//! Implements the `SourceProvider` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::source::{FolderMatch, SourceFile, SourceProvider};
use core_auth::CredentialProvider;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{FilesListResponse, FOLDER_MIME_TYPE};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum results per page (Google Drive API limit)
pub const MAX_PAGE_SIZE: usize = 1000;

const FOLDER_FIELDS: &str = "nextPageToken,files(id,name)";
const FILE_FIELDS: &str = "files(id,name,createdTime)";

/// Google Drive API connector
///
/// # Features
///
/// - Folder resolution by exact display name
/// - Newest-first listing of a folder's direct, non-trashed files
/// - Exponential backoff for rate limiting and server errors
/// - OAuth 2.0 bearer authentication via `CredentialProvider`
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::source::SourceProvider;
///
/// let connector = GoogleDriveConnector::new(http_client, credentials);
/// let folder = connector.resolve_folder("Invoices").await?;
/// let files = connector.list_files(folder.folder_id().unwrap(), 20).await?;
/// ```
pub struct GoogleDriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Supplies a fresh access token per request
    credentials: Arc<dyn CredentialProvider>,

    retry_policy: RetryPolicy,

    api_base: String,
}

impl GoogleDriveConnector {
    /// Create a new Google Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `credentials` - token source with at least `drive.metadata.readonly`
    pub fn new(http_client: Arc<dyn HttpClient>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http_client,
            credentials,
            retry_policy: RetryPolicy::default(),
            api_base: DRIVE_API_BASE.to_string(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Point the connector at a different API root (local fakes).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Quote a value for the Drive query language.
    ///
    /// Backslashes and single quotes must be escaped inside a quoted string.
    pub fn quote_query_value(value: &str) -> String {
        let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
        format!("'{}'", escaped)
    }

    fn files_url(&self, params: &[(&str, String)]) -> String {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}/files?{}", self.api_base, query)
    }

    /// Execute a GET with the connector's retry policy.
    ///
    /// 429, 5xx and transport failures are retried with backoff; any other
    /// non-2xx status fails immediately.
    #[instrument(skip(self, url))]
    async fn get_with_retry(&self, url: String) -> Result<HttpResponse> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let access_token = self.credentials.access_token().await?;

            let request = HttpRequest::new(HttpMethod::Get, url.clone())
                .bearer_token(access_token)
                .header("Accept", "application/json");

            // The connector owns the retry loop; the transport makes one attempt.
            match self
                .http_client
                .execute_with_retry(request, RetryPolicy::no_retry())
                .await
            {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, attempt, "API request succeeded");
                    return Ok(response);
                }
                Ok(response) if response.is_retryable() => {
                    if attempt >= max_attempts {
                        warn!(status = response.status, attempts = attempt, "API request failed");
                        if response.status == 429 {
                            return Err(GoogleDriveError::RateLimitExceeded { attempts: attempt });
                        }
                        return Err(GoogleDriveError::ApiError {
                            status_code: response.status,
                            message: format!("request failed after {} attempts", attempt),
                        });
                    }

                    let delay = self.retry_policy.delay_for(attempt);
                    warn!(
                        status = response.status,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "API request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) if response.status == 401 => {
                    return Err(GoogleDriveError::AuthenticationFailed(
                        String::from_utf8_lossy(&response.body).to_string(),
                    ));
                }
                Ok(response) => {
                    warn!(status = response.status, "API request rejected");
                    return Err(GoogleDriveError::ApiError {
                        status_code: response.status,
                        message: String::from_utf8_lossy(&response.body).to_string(),
                    });
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        warn!(error = %e, attempts = attempt, "API request failed");
                        return Err(e.into());
                    }

                    let delay = self.retry_policy.delay_for(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "API request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn fetch_page(&self, url: String) -> Result<FilesListResponse> {
        let response = self.get_with_retry(url).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse files list response: {}", e))
        })
    }

    /// Folder ids carrying `folder_name`, in API order, across all pages.
    async fn find_folders(&self, folder_name: &str) -> Result<Vec<String>> {
        let query = format!(
            "mimeType = '{}' and name = {} and trashed = false",
            FOLDER_MIME_TYPE,
            Self::quote_query_value(folder_name)
        );

        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.clone()),
                ("spaces", "drive".to_string()),
                ("fields", FOLDER_FIELDS.to_string()),
                ("pageSize", "100".to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let page = self.fetch_page(self.files_url(&params)).await?;
            ids.extend(page.files.into_iter().map(|f| f.id));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(ids)
    }

    async fn list_files_inner(&self, folder_id: &str, limit: usize) -> Result<Vec<SourceFile>> {
        let limit = limit.min(MAX_PAGE_SIZE);
        let query = format!(
            "{} in parents and mimeType != '{}' and trashed = false",
            Self::quote_query_value(folder_id),
            FOLDER_MIME_TYPE
        );

        let params = [
            ("q", query),
            ("spaces", "drive".to_string()),
            ("fields", FILE_FIELDS.to_string()),
            ("orderBy", "createdTime desc".to_string()),
            ("pageSize", limit.to_string()),
        ];

        let page = self.fetch_page(self.files_url(&params)).await?;
        if page.incomplete_search {
            warn!(folder_id, "Drive reported an incomplete search");
        }

        let mut files: Vec<SourceFile> = page
            .files
            .into_iter()
            .filter(|f| !f.is_folder())
            .map(|f| {
                let created_at = f.created_at();
                if created_at.is_none() {
                    debug!(file_id = %f.id, "File has no parseable createdTime");
                }
                SourceFile::new(f.id, f.name, created_at)
            })
            .collect();

        // Stable: files with equal timestamps keep the API's order.
        files.sort_by(SourceFile::newest_first);
        files.truncate(limit);

        Ok(files)
    }
}

#[async_trait]
impl SourceProvider for GoogleDriveConnector {
    #[instrument(skip(self))]
    async fn resolve_folder(&self, folder_name: &str) -> bridge_traits::error::Result<FolderMatch> {
        let ids = self.find_folders(folder_name).await?;
        let found = FolderMatch::from_candidates(ids);

        match &found {
            FolderMatch::NotFound => info!(folder_name, "No folder found"),
            FolderMatch::Unique(id) => info!(folder_name, folder_id = %id, "Resolved folder"),
            FolderMatch::Ambiguous { chosen, candidates } => info!(
                folder_name,
                folder_id = %chosen,
                candidates = candidates.len(),
                "Folder name is ambiguous"
            ),
        }

        Ok(found)
    }

    #[instrument(skip(self), fields(folder_id = %folder_id))]
    async fn list_files(
        &self,
        folder_id: &str,
        limit: usize,
    ) -> bridge_traits::error::Result<Vec<SourceFile>> {
        let files = self.list_files_inner(folder_id, limit).await?;
        info!(count = files.len(), limit, "Listed files from Google Drive");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    struct StaticToken {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialProvider for StaticToken {
        async fn access_token(&self) -> core_auth::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("test_token".to_string())
        }
    }

    struct NoToken;

    #[async_trait]
    impl CredentialProvider for NoToken {
        async fn access_token(&self) -> core_auth::Result<String> {
            Err(core_auth::AuthError::InteractionRequired(
                "no stored token".to_string(),
            ))
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryPolicy::default()
        }
    }

    fn connector(mock_http: MockHttpClient) -> GoogleDriveConnector {
        GoogleDriveConnector::new(
            Arc::new(mock_http),
            Arc::new(StaticToken {
                calls: AtomicUsize::new(0),
            }),
        )
        .with_retry_policy(fast_retry())
    }

    fn decoded(url: &str) -> String {
        urlencoding::decode(url).unwrap().into_owned()
    }

    #[test]
    fn test_quote_query_value() {
        assert_eq!(GoogleDriveConnector::quote_query_value("Invoices"), "'Invoices'");
        assert_eq!(
            GoogleDriveConnector::quote_query_value("Bob's \\ files"),
            "'Bob\\'s \\\\ files'"
        );
    }

    #[tokio::test]
    async fn test_resolve_folder_unique() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(
                req.headers.get("Authorization"),
                Some(&"Bearer test_token".to_string())
            );
            // The client-wide timeout applies.
            assert_eq!(req.timeout, None);
            let url = decoded(&req.url);
            assert!(url.contains(
                "mimeType = 'application/vnd.google-apps.folder' and name = 'Invoices' and trashed = false"
            ));
            assert!(url.contains("spaces=drive"));
            Ok(json_response(200, r#"{"files": [{"id": "folder1", "name": "Invoices"}]}"#))
        });

        let found = connector(mock_http).resolve_folder("Invoices").await.unwrap();
        assert_eq!(found, FolderMatch::Unique("folder1".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_folder_not_found() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(200, r#"{"files": []}"#)));

        let found = connector(mock_http).resolve_folder("Missing").await.unwrap();
        assert_eq!(found, FolderMatch::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_folder_ambiguous_across_pages() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(!req.url.contains("pageToken"));
                Ok(json_response(
                    200,
                    r#"{"files": [{"id": "a", "name": "Dup"}], "nextPageToken": "p2"}"#,
                ))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.contains("pageToken=p2"));
                Ok(json_response(200, r#"{"files": [{"id": "b", "name": "Dup"}]}"#))
            });

        let found = connector(mock_http).resolve_folder("Dup").await.unwrap();
        assert_eq!(
            found,
            FolderMatch::Ambiguous {
                chosen: "a".to_string(),
                candidates: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_list_files_sorts_newest_first_and_truncates() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            let url = decoded(&req.url);
            assert!(url.contains(
                "'folder1' in parents and mimeType != 'application/vnd.google-apps.folder' and trashed = false"
            ));
            assert!(url.contains("orderBy=createdTime desc"));
            assert!(url.contains("pageSize=2"));
            assert!(url.contains("fields=files(id,name,createdTime)"));

            // API order is deliberately not newest-first.
            Ok(json_response(
                200,
                r#"{"files": [
                    {"id": "old", "name": "old.txt", "createdTime": "2024-01-01T00:00:00Z"},
                    {"id": "undated", "name": "undated.txt"},
                    {"id": "new", "name": "new.txt", "createdTime": "2024-03-01T00:00:00Z"}
                ]}"#,
            ))
        });

        let files = connector(mock_http).list_files("folder1", 2).await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, "new");
        assert_eq!(
            files[0].created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(files[1].id, "old");
    }

    #[tokio::test]
    async fn test_list_files_skips_folders() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                200,
                r#"{"files": [
                    {"id": "sub", "name": "Sub", "mimeType": "application/vnd.google-apps.folder"},
                    {"id": "f1", "name": "a.txt", "createdTime": "2024-01-01T00:00:00Z"}
                ]}"#,
            ))
        });

        let files = connector(mock_http).list_files("folder1", 20).await.unwrap();
        assert_eq!(files, vec![SourceFile::new(
            "f1",
            "a.txt",
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        )]);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(503, "unavailable")));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::Timeout("read".to_string())));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(200, r#"{"files": []}"#)));

        let files = connector(mock_http).list_files("folder1", 20).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_budget() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(3)
            .returning(|_| Ok(json_response(429, "slow down")));

        let err = connector(mock_http).list_files("folder1", 20).await.unwrap_err();
        assert!(matches!(err, BridgeError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(404, "File not found: folder1")));

        let err = connector(mock_http).list_files("folder1", 20).await.unwrap_err();
        assert!(matches!(err, BridgeError::Status { status: 404, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_failure() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(401, "invalid_token")));

        let err = connector(mock_http).resolve_folder("x").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_make_no_request() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(0);

        let connector = GoogleDriveConnector::new(Arc::new(mock_http), Arc::new(NoToken));
        let err = connector.resolve_folder("x").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(200, "<html>")));

        let err = connector(mock_http).list_files("folder1", 20).await.unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }
}
