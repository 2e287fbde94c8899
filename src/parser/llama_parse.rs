//! Remote parser that delegates to the LlamaParse cloud API
//!
//! Flow: upload the file, poll the job until it reports `SUCCESS`, then fetch
//! the result in the configured format.

use super::{DocumentParser, mime_type_for};
use crate::config::{ParserConfig, ResultType};
use crate::error::{ConfigError, ParseError, RagError};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Deserialize)]
struct JobResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Clone)]
pub struct LlamaParseClient {
    client: Client,
    base_url: String,
    api_key: String,
    result_type: ResultType,
    poll_interval: Duration,
    max_timeout: Duration,
}

impl LlamaParseClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            result_type: ResultType::Markdown,
            poll_interval: Duration::from_secs(1),
            max_timeout: Duration::from_secs(2000),
        }
    }

    pub fn from_config(config: &ParserConfig) -> Result<Self, RagError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("LLAMA_CLOUD_API_KEY".to_string()))?;

        Ok(Self::new(config.base_url.clone(), api_key)
            .with_result_type(config.result_type)
            .with_polling(
                Duration::from_secs(config.poll_interval_secs),
                Duration::from_secs(config.max_timeout_secs),
            ))
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.max_timeout = max_timeout;
        self
    }

    async fn upload(&self, path: &Path) -> Result<String, RagError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_type_for(path))
            .map_err(|e| ParseError::ParseFailed {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let url = format!("{}/api/parsing/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(unavailable)?;

        let job: JobResponse = read_json(response, path).await?;
        tracing::debug!("LlamaParse job {} started for {:?}", job.id, path);
        Ok(job.id)
    }

    async fn wait_for_job(&self, job_id: &str, path: &Path) -> Result<(), RagError> {
        let started = Instant::now();
        let url = format!("{}/api/parsing/job/{}", self.base_url, job_id);

        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(unavailable)?;
            let job: JobResponse = read_json(response, path).await?;

            match job.status.as_deref().unwrap_or("PENDING") {
                "SUCCESS" => return Ok(()),
                "PENDING" => {}
                status => {
                    return Err(ParseError::JobFailed {
                        job_id: job_id.to_string(),
                        status: status.to_string(),
                    }
                    .into());
                }
            }

            if started.elapsed() >= self.max_timeout {
                return Err(ParseError::Timeout(job_id.to_string(), self.max_timeout.as_secs()).into());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn run_job(&self, path: &Path) -> Result<String, RagError> {
        let job_id = self.upload(path).await?;
        self.wait_for_job(&job_id, path).await?;
        self.fetch_result(&job_id, path).await
    }

    async fn fetch_result(&self, job_id: &str, path: &Path) -> Result<String, RagError> {
        let key = self.result_type.as_str();
        let url = format!(
            "{}/api/parsing/job/{}/result/{}",
            self.base_url, job_id, key
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(unavailable)?;

        let body: serde_json::Value = read_json(response, path).await?;
        body.get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ParseError::ParseFailed {
                    file: path.display().to_string(),
                    reason: format!("result has no '{}' field", key),
                }
                .into()
            })
    }
}

#[async_trait::async_trait]
impl DocumentParser for LlamaParseClient {
    async fn parse(&self, path: &Path) -> Result<String, RagError> {
        // Bounds a stalled upload or fetch as well as slow polling
        let text = tokio::time::timeout(self.max_timeout, self.run_job(path))
            .await
            .map_err(|_| {
                ParseError::Timeout(path.display().to_string(), self.max_timeout.as_secs())
            })??;
        tracing::info!("Parsed {:?} via LlamaParse ({} chars)", path, text.len());
        Ok(text)
    }

    fn result_type(&self) -> ResultType {
        self.result_type
    }
}

fn unavailable(err: reqwest::Error) -> RagError {
    ParseError::ServiceUnavailable(err.to_string()).into()
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    path: &Path,
) -> Result<T, RagError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ParseError::ParseFailed {
            file: path.display().to_string(),
            reason: format!("LlamaParse returned {}: {}", status, body),
        }
        .into());
    }
    response.json().await.map_err(|e| {
        ParseError::ParseFailed {
            file: path.display().to_string(),
            reason: format!("invalid LlamaParse response: {}", e),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::{Path as UrlPath, State};
    use axum::http::{HeaderMap, HeaderName, header};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Upload {
        authorization: String,
        content_type: String,
        body: Vec<u8>,
    }

    /// In-process stand-in for the LlamaParse job API
    struct FakeLlamaParse {
        /// Status reported by successive polls; the last one repeats
        statuses: Vec<&'static str>,
        polls: AtomicUsize,
        upload_delay: Duration,
        omit_result_field: bool,
        uploads: Mutex<Vec<Upload>>,
    }

    impl FakeLlamaParse {
        fn new(statuses: &[&'static str]) -> Self {
            Self {
                statuses: statuses.to_vec(),
                polls: AtomicUsize::new(0),
                upload_delay: Duration::ZERO,
                omit_result_field: false,
                uploads: Mutex::new(Vec::new()),
            }
        }
    }

    async fn upload(
        State(state): State<Arc<FakeLlamaParse>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Json<Value> {
        tokio::time::sleep(state.upload_delay).await;
        let header_value = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        state.uploads.lock().unwrap().push(Upload {
            authorization: header_value(header::AUTHORIZATION),
            content_type: header_value(header::CONTENT_TYPE),
            body: body.to_vec(),
        });
        Json(json!({"id": "job-1", "status": "PENDING"}))
    }

    async fn job_status(
        State(state): State<Arc<FakeLlamaParse>>,
        UrlPath(id): UrlPath<String>,
    ) -> Json<Value> {
        let poll = state.polls.fetch_add(1, Ordering::SeqCst);
        let status = state
            .statuses
            .get(poll)
            .or(state.statuses.last())
            .copied()
            .unwrap_or("SUCCESS");
        Json(json!({"id": id, "status": status}))
    }

    async fn job_result(
        State(state): State<Arc<FakeLlamaParse>>,
        UrlPath((id, kind)): UrlPath<(String, String)>,
    ) -> Json<Value> {
        if state.omit_result_field {
            return Json(json!({"job_metadata": {"job_id": id}}));
        }
        let mut body = serde_json::Map::new();
        body.insert(kind.clone(), Value::String(format!("{} of {}", kind, id)));
        Json(Value::Object(body))
    }

    async fn spawn_fake(state: Arc<FakeLlamaParse>) -> String {
        let router = Router::new()
            .route("/api/parsing/upload", post(upload))
            .route("/api/parsing/job/:id", get(job_status))
            .route("/api/parsing/job/:id/result/:kind", get(job_result))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn report_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.docx");
        std::fs::write(&path, b"docx bytes").unwrap();
        (dir, path)
    }

    fn fast_client(base_url: String) -> LlamaParseClient {
        LlamaParseClient::new(base_url, "llx-test")
            .with_polling(Duration::from_millis(10), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_parse_uploads_polls_and_fetches_markdown() {
        let state = Arc::new(FakeLlamaParse::new(&["PENDING", "PENDING", "SUCCESS"]));
        let base_url = spawn_fake(Arc::clone(&state)).await;
        let (_dir, path) = report_file();

        let text = fast_client(base_url).parse(&path).await.unwrap();
        assert_eq!(text, "markdown of job-1");
        assert_eq!(state.polls.load(Ordering::SeqCst), 3);

        let uploads = state.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].authorization, "Bearer llx-test");
        assert!(uploads[0].content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&uploads[0].body);
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"report.docx\""));
        assert!(body.contains("docx bytes"));
    }

    #[tokio::test]
    async fn test_parse_fetches_text_result() {
        let state = Arc::new(FakeLlamaParse::new(&["SUCCESS"]));
        let base_url = spawn_fake(state).await;
        let (_dir, path) = report_file();

        let client = fast_client(base_url).with_result_type(ResultType::Text);
        assert_eq!(client.parse(&path).await.unwrap(), "text of job-1");
    }

    #[tokio::test]
    async fn test_failed_and_canceled_jobs() {
        for status in ["ERROR", "CANCELED"] {
            let state = Arc::new(FakeLlamaParse::new(&["PENDING", status]));
            let base_url = spawn_fake(state).await;
            let (_dir, path) = report_file();

            match fast_client(base_url).parse(&path).await {
                Err(RagError::Parse(ParseError::JobFailed { job_id, status: got })) => {
                    assert_eq!(job_id, "job-1");
                    assert_eq!(got, status);
                }
                other => panic!("expected JobFailed for {}, got {:?}", status, other),
            }
        }
    }

    #[tokio::test]
    async fn test_job_that_never_finishes_times_out() {
        let state = Arc::new(FakeLlamaParse::new(&["PENDING"]));
        let base_url = spawn_fake(Arc::clone(&state)).await;
        let (_dir, path) = report_file();

        let client = LlamaParseClient::new(base_url, "llx-test")
            .with_polling(Duration::from_millis(20), Duration::from_millis(300));
        let result = client.parse(&path).await;
        assert!(matches!(
            result,
            Err(RagError::Parse(ParseError::Timeout(..)))
        ));
        assert!(state.polls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_stalled_upload_is_bounded() {
        let mut fake = FakeLlamaParse::new(&["SUCCESS"]);
        fake.upload_delay = Duration::from_secs(10);
        let base_url = spawn_fake(Arc::new(fake)).await;
        let (_dir, path) = report_file();

        let client = LlamaParseClient::new(base_url, "llx-test")
            .with_polling(Duration::from_millis(10), Duration::from_millis(300));
        let started = Instant::now();
        let result = client.parse(&path).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        let err = result.unwrap_err();
        assert!(err.is_upstream());
        assert!(matches!(err, RagError::Parse(ParseError::Timeout(..))));
    }

    #[tokio::test]
    async fn test_result_without_expected_field() {
        let mut fake = FakeLlamaParse::new(&["SUCCESS"]);
        fake.omit_result_field = true;
        let base_url = spawn_fake(Arc::new(fake)).await;
        let (_dir, path) = report_file();

        let result = fast_client(base_url).parse(&path).await;
        match result {
            Err(RagError::Parse(ParseError::ParseFailed { reason, .. })) => {
                assert!(reason.contains("'markdown'"));
            }
            other => panic!("expected ParseFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = ParserConfig::default();
        assert!(matches!(
            LlamaParseClient::from_config(&config),
            Err(RagError::Config(ConfigError::MissingRequired(_)))
        ));

        let blank = ParserConfig {
            api_key: Some("  ".to_string()),
            ..ParserConfig::default()
        };
        assert!(LlamaParseClient::from_config(&blank).is_err());
    }

    #[test]
    fn test_from_config_copies_settings() {
        let config = ParserConfig {
            api_key: Some("llx-test".to_string()),
            base_url: "https://parse.example.com/".to_string(),
            result_type: ResultType::Text,
            poll_interval_secs: 3,
            max_timeout_secs: 30,
            ..ParserConfig::default()
        };
        let client = LlamaParseClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://parse.example.com");
        assert_eq!(client.result_type(), ResultType::Text);
        assert_eq!(client.poll_interval, Duration::from_secs(3));
        assert_eq!(client.max_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_job_response_parsing() {
        let job: JobResponse =
            serde_json::from_str(r#"{"id": "job-1", "status": "PENDING"}"#).unwrap();
        assert_eq!(job.id, "job-1");
        assert_eq!(job.status.as_deref(), Some("PENDING"));

        let job: JobResponse = serde_json::from_str(r#"{"id": "job-2"}"#).unwrap();
        assert!(job.status.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.docx");
        std::fs::write(&path, b"bytes").unwrap();

        // Port 9 (discard) on localhost is not expected to run an HTTP server
        let client = LlamaParseClient::new("http://127.0.0.1:9", "llx-test");
        let result = client.parse(&path).await;
        assert!(matches!(
            result,
            Err(RagError::Parse(ParseError::ServiceUnavailable(_)))
        ));
    }
}
