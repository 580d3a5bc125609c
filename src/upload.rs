//! Upload client for the classification endpoint.
//!
//! Each image is posted as a multipart form. Whatever happens on the wire, an
//! upload settles into exactly one [`ResultRecord`]:
//! - 2xx: success, with the label/percentage pairs of the JSON body
//! - other status: failure with the status (or 400 when the message says so)
//! - no response at all: failure with an `Unknown` code
//!
//! # Configuration
//!
//! Upload settings can be configured via environment variables:
//! - `CATEYE_API_URL`: classification endpoint
//! - `CATEYE_COOKIE`: cookie header
//! - `CATEYE_UPLOAD_FIELD`: multipart field name
//! - `CATEYE_TIMEOUT_MS`: request timeout
//! - `CATEYE_REQUEST_DELAY_MS`: pause before each request

use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use std::time::{Duration, Instant};

use crate::config;
use crate::error_message::mentions_code;
use crate::harness::{HarnessError, HarnessResult};
use crate::runner::{Attempt, Confidence, ErrorCode, ResultRecord};
use crate::scan::ImageFile;

/// Message recorded when a rejected response carries no message of its own
pub const NO_ERROR_MESSAGE: &str = "No error message";

/// Code the endpoint uses for a species mismatch
pub const MISMATCH_CODE: u16 = 400;

/// Configuration for the upload client
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Endpoint URL, including any query string
    pub endpoint: String,
    /// Cookie header value sent with every request
    pub cookie: Option<String>,
    /// Multipart field carrying the image
    pub field_name: String,
    /// Total request timeout (milliseconds)
    pub timeout_ms: u64,
    /// Pause before each request (milliseconds), not counted in the response time
    pub request_delay_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            endpoint: cfg.upload.endpoint.clone(),
            cookie: cfg.upload.cookie.clone(),
            field_name: cfg.upload.field_name.clone(),
            timeout_ms: cfg.upload.timeout_ms,
            request_delay_ms: cfg.upload.request_delay_ms,
        }
    }
}

impl UploadConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn request_delay_ms(mut self, request_delay_ms: u64) -> Self {
        self.request_delay_ms = request_delay_ms;
        self
    }
}

/// Why an upload did not produce an accepted response
#[derive(Debug)]
enum Rejection {
    /// The server answered with a non-success status
    Status { status: u16, message: String },
    /// No usable response (connection refused, timeout, unreadable file)
    Transport(String),
}

impl Rejection {
    /// Error code and message recorded for this rejection
    fn classify(self) -> (ErrorCode, String) {
        match self {
            Rejection::Status { status, message } => {
                let code = if mentions_code(&message, MISMATCH_CODE) {
                    MISMATCH_CODE
                } else {
                    status
                };
                (ErrorCode::Status(code), message)
            }
            Rejection::Transport(message) => (ErrorCode::Unknown, message),
        }
    }
}

/// Client posting images to the classification endpoint
#[derive(Debug, Clone)]
pub struct Uploader {
    client: reqwest::Client,
    config: UploadConfig,
}

impl Uploader {
    pub fn new(config: UploadConfig) -> HarnessResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| HarnessError::Config(format!("invalid cookie header: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload one image and settle the attempt into a record
    pub async fn upload(&self, image: &ImageFile) -> ResultRecord {
        if self.config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }

        let started = Instant::now();
        let outcome = self.post(image).await;
        let attempt = Attempt::new(&image.name, &image.extension, image.size_bytes, started.elapsed())
            .with_path(&image.path);

        match outcome {
            Ok(response_data) => {
                tracing::debug!(image = %image.name, time = %attempt.response_time, "upload accepted");
                attempt.succeeded(response_data)
            }
            Err(rejection) => {
                let (code, message) = rejection.classify();
                tracing::warn!(image = %image.name, code = %code, "upload failed: {}", message);
                attempt.failed(code, message)
            }
        }
    }

    async fn post(&self, image: &ImageFile) -> Result<Vec<Confidence>, Rejection> {
        let bytes = tokio::fs::read(&image.path)
            .await
            .map_err(|e| Rejection::Transport(format!("failed to read {}: {}", image.path.display(), e)))?;

        let part = Part::bytes(bytes)
            .file_name(image.file_name().to_string())
            .mime_str(image.mime_type())
            .map_err(|e| Rejection::Transport(e.to_string()))?;
        let form = Form::new().part(self.config.field_name.clone(), part);

        let response = self
            .client
            .post(&self.config.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Rejection::Transport(e.to_string()))?;

        let status = response.status();
        // A body cut off by the timeout is a transport failure even after a 2xx status line
        let body = response
            .text()
            .await
            .map_err(|e| Rejection::Transport(e.to_string()))?;

        if status.is_success() {
            Ok(parse_confidences(&body))
        } else {
            Err(Rejection::Status {
                status: status.as_u16(),
                message: rejection_message(&body),
            })
        }
    }
}

/// Label/percentage pairs of a success body, in body order.
/// Non-numeric values are skipped; a body that is not a JSON object yields none.
pub fn parse_confidences(body: &str) -> Vec<Confidence> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(label, value)| value.as_f64().map(|p| Confidence::new(label, p)))
            .collect(),
        _ => {
            tracing::warn!("success response is not a JSON object of label percentages");
            Vec::new()
        }
    }
}

/// `message` field of an error body, or [`NO_ERROR_MESSAGE`]
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["message"].as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| NO_ERROR_MESSAGE.to_string())
}

/// Check if the endpoint's host accepts connections.
///
/// Any HTTP response counts as reachable; only a transport failure does not.
pub async fn check_health(endpoint: &str, timeout_secs: u64) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    client.head(endpoint).send().await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::path::Path;

    fn image_in(dir: &Path, name: &str, bytes: &[u8]) -> ImageFile {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        ImageFile::from_path(&path).unwrap()
    }

    fn uploader(endpoint: String) -> Uploader {
        Uploader::new(UploadConfig::new(endpoint).request_delay_ms(0).timeout_ms(2000)).unwrap()
    }

    #[test]
    fn test_upload_config_builder() {
        let config = UploadConfig::new("http://localhost:9000/ai/eye")
            .cookie("JSESSIONID=abc")
            .field_name("Image")
            .timeout_ms(1500)
            .request_delay_ms(0);

        assert_eq!(config.endpoint, "http://localhost:9000/ai/eye");
        assert_eq!(config.cookie.as_deref(), Some("JSESSIONID=abc"));
        assert_eq!(config.field_name, "Image");
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.request_delay_ms, 0);
    }

    #[test]
    fn test_invalid_cookie_is_config_error() {
        let result = Uploader::new(UploadConfig::new("http://localhost").cookie("bad\nvalue"));
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_parse_confidences_keeps_body_order() {
        let data = parse_confidences(r#"{"zeta": 12.5, "alpha": 87.5, "note": "x"}"#);
        assert_eq!(data, vec![Confidence::new("zeta", 12.5), Confidence::new("alpha", 87.5)]);
        assert!(parse_confidences("[1, 2]").is_empty());
        assert!(parse_confidences("not json").is_empty());
    }

    #[test]
    fn test_rejection_classification() {
        let (code, msg) = Rejection::Status {
            status: 422,
            message: "Species mismatch (400) dog_prob: 0.9".into(),
        }
        .classify();
        assert_eq!(code, ErrorCode::Status(400));
        assert!(msg.starts_with("Species mismatch"));

        let (code, _) = Rejection::Status {
            status: 503,
            message: NO_ERROR_MESSAGE.into(),
        }
        .classify();
        assert_eq!(code, ErrorCode::Status(503));

        let (code, _) = Rejection::Transport("timed out".into()).classify();
        assert_eq!(code, ErrorCode::Unknown);
    }

    #[tokio::test]
    async fn test_upload_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ai/eye")
            .match_query(Matcher::UrlEncoded("PetType".into(), "cat".into()))
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .match_body(Matcher::Regex("name=\"AnimalImage\"".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"cat": 99.5, "dog": 0.5}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = image_in(dir.path(), "a.jpg", &[0u8; 1024]);
        let up = Uploader::new(
            UploadConfig::new(format!("{}/ai/eye?PetType=cat", server.url()))
                .field_name("AnimalImage")
                .request_delay_ms(0),
        )
        .unwrap();

        let record = up.upload(&image).await;
        mock.assert_async().await;

        assert!(record.is_success());
        assert_eq!(record.image_name, "a.jpg");
        assert_eq!(record.file_path, dir.path().join("a.jpg"));
        assert_eq!(record.extension, "jpg");
        assert_eq!(record.size, "1.00 KB");
        assert!(record.response_time.ends_with(" ms"));
        match record.outcome {
            crate::runner::Outcome::Success { response_data } => {
                assert_eq!(response_data[0], Confidence::new("cat", 99.5));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_sends_cookie() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/eye")
            .match_header("cookie", "JSESSIONID=xyz")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = image_in(dir.path(), "b.png", b"png");
        let up = Uploader::new(
            UploadConfig::new(format!("{}/eye", server.url()))
                .cookie("JSESSIONID=xyz")
                .request_delay_ms(0),
        )
        .unwrap();

        assert!(up.upload(&image).await.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_mismatch_maps_to_400() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/eye")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "400 species mismatch dog_prob: 0.93, cat_prob: 0.07"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = image_in(dir.path(), "dog.webp", b"webp");
        let record = uploader(format!("{}/eye", server.url())).upload(&image).await;

        assert_eq!(record.error_code(), Some(ErrorCode::Status(400)));
        assert_eq!(
            record.message_label(),
            "400 species mismatch dog_prob: 0.93, cat_prob: 0.07"
        );
    }

    #[tokio::test]
    async fn test_upload_server_error_without_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/eye")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = image_in(dir.path(), "c.jpeg", b"jpeg");
        let record = uploader(format!("{}/eye", server.url())).upload(&image).await;

        assert_eq!(record.error_code(), Some(ErrorCode::Status(502)));
        assert_eq!(record.message_label(), NO_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_upload_connection_refused_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let image = image_in(dir.path(), "d.jpg", b"jpg");
        // Port 9 (discard) is closed on test machines
        let record = uploader("http://127.0.0.1:9/eye".to_string()).upload(&image).await;

        assert!(!record.is_success());
        assert_eq!(record.error_code(), Some(ErrorCode::Unknown));
        assert_eq!(record.status_label(), "Error (Unknown)");
    }

    #[tokio::test]
    async fn test_body_stalled_after_ok_status_is_unknown_failure() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request.ends_with(b"--\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"cat\": 9")
                .await
                .unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let dir = tempfile::tempdir().unwrap();
        let image = image_in(dir.path(), "slow.jpg", b"jpg");
        let up = Uploader::new(
            UploadConfig::new(format!("http://{}/eye", addr))
                .request_delay_ms(0)
                .timeout_ms(700),
        )
        .unwrap();

        let record = up.upload(&image).await;
        server.abort();

        assert!(!record.is_success());
        assert_eq!(record.error_code(), Some(ErrorCode::Unknown));
        assert_ne!(record.message_label(), NO_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_check_health() {
        let mut server = mockito::Server::new_async().await;
        server.mock("HEAD", "/eye").with_status(405).create_async().await;

        assert!(check_health(&format!("{}/eye", server.url()), 2).await);
        assert!(!check_health("http://127.0.0.1:9/eye", 1).await);
    }
}
