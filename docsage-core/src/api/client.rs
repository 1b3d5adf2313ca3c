//! HTTP client for the analysis service REST API
//!
//! One method per endpoint, each returning a typed response or a curated
//! [`Error`]. Transport failures become [`Error::Http`]; non-2xx responses
//! become [`Error::Api`] carrying the status and the `detail` string the
//! service puts in error bodies, when one is present.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::session::SessionHandle;
use crate::types::{DocumentSummary, FileKind, QueryRequest, UserIdentity};

/// Response from POST /auth/login and /auth/register
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    pub token: String,
    pub user: UserIdentity,
}

/// Response from POST /documents/upload
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    pub document_id: String,
    pub filename: String,
    pub chunks_count: u32,
    pub file_type: String,
}

/// Response from POST /query
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    /// Documents attributed as evidence, in ranking order
    #[serde(default)]
    pub sources: Vec<String>,
    /// Retrieved passages the answer was synthesized from
    #[serde(default)]
    pub context_used: Vec<String>,
}

/// Response from POST /reports/generate
///
/// Transient: `excel_data` is decoded to bytes and written to disk, then the
/// payload is dropped. The service echoes the query/answer alongside; only
/// these fields are consumed.
#[derive(Debug, Deserialize)]
pub struct ReportPayload {
    #[serde(default)]
    pub message: String,
    /// Base64-encoded spreadsheet bytes
    pub excel_data: String,
    /// Server-suggested filename for the saved report
    pub filename: String,
}

/// HTTP client for the analysis service
pub struct ApiClient {
    http_client: reqwest::Client,
    api_base: String,
    session: SessionHandle,
}

impl ApiClient {
    /// Create a client from configuration and the shared session.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &BackendConfig, session: SessionHandle) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: config.api_base(),
            session,
        })
    }

    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let url = format!("{}/auth/login", self.api_base);
        let request = LoginRequest { email, password };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP request failed: {}", e)))?;

        parse_json(check_status(response).await?).await
    }

    /// Create an account; the service signs the new user in directly.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let url = format!("{}/auth/register", self.api_base);
        let request = RegisterRequest {
            email,
            password,
            name,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP request failed: {}", e)))?;

        parse_json(check_status(response).await?).await
    }

    /// Fetch the full document list for the signed-in user.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let url = format!("{}/documents", self.api_base);

        let response = self
            .authorized(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP request failed: {}", e)))?;

        parse_json(check_status(response).await?).await
    }

    /// Upload one file for ingestion.
    ///
    /// The file kind is validated locally first; unsupported kinds never
    /// produce a request.
    pub async fn upload_document(&self, path: &Path) -> Result<UploadResponse> {
        let kind = FileKind::validate_path(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Validation(format!("path has no filename: {:?}", path)))?;

        let bytes = tokio::fs::read(path).await?;
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(mime_for(kind, &filename))
            .map_err(|e| Error::Http(format!("failed to build multipart body: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/documents/upload", self.api_base);
        let response = self
            .authorized(self.http_client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP request failed: {}", e)))?;

        parse_json(check_status(response).await?).await
    }

    /// Delete one document by id.
    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let url = format!(
            "{}/documents/{}",
            self.api_base,
            urlencoding::encode(document_id)
        );

        let response = self
            .authorized(self.http_client.delete(&url))
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP request failed: {}", e)))?;

        let _: serde_json::Value = parse_json(check_status(response).await?).await?;
        Ok(())
    }

    /// Ask a natural-language question against the ingested corpus.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let url = format!("{}/query", self.api_base);
        let body = AnalysisRequest {
            query: &request.query,
            language: request.language.as_str(),
        };

        let response = self
            .authorized(self.http_client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP request failed: {}", e)))?;

        parse_json(check_status(response).await?).await
    }

    /// Request a spreadsheet report for a previously answered query.
    pub async fn generate_report(&self, request: &QueryRequest) -> Result<ReportPayload> {
        let url = format!("{}/reports/generate", self.api_base);
        let body = AnalysisRequest {
            query: &request.query,
            language: request.language.as_str(),
        };

        let response = self
            .authorized(self.http_client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP request failed: {}", e)))?;

        parse_json(check_status(response).await?).await
    }

    /// Check whether the service is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.api_base);

        match self.http_client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Attach the current bearer token, read at call time. Requests built
    /// after a logout carry no token regardless of when the operation began.
    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Request body for POST /auth/login
#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Request body for POST /auth/register
#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

/// Request body for POST /query and POST /reports/generate
#[derive(Serialize)]
struct AnalysisRequest<'a> {
    query: &'a str,
    language: &'a str,
}

/// Map non-2xx responses to [`Error::Api`], extracting the service's
/// `detail` field when the body carries one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        detail: extract_detail(&body),
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::Http(format!("failed to parse response: {}", e)))
}

/// Pull a human-readable message out of an error body.
///
/// The service reports failures as `{"detail": "..."}`; request validation
/// failures arrive as `{"detail": [{loc, msg, type}, ...]}`. Anything else
/// yields `None` and display falls back to a generic localized message.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(|m| m.as_str()))
            .map(str::to_string),
        _ => None,
    }
}

/// Content type for the multipart file part, by extension.
fn mime_for(kind: FileKind, filename: &str) -> &'static str {
    match kind {
        FileKind::Json => "application/json",
        FileKind::Spreadsheet if filename.to_ascii_lowercase().ends_with(".xls") => {
            "application/vnd.ms-excel"
        }
        FileKind::Spreadsheet => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_valid_config() {
        let config = BackendConfig {
            base_url: "not-a-url".to_string(),
            ..Default::default()
        };
        assert!(ApiClient::new(&config, SessionHandle::new()).is_err());
    }

    #[test]
    fn test_client_with_valid_config() {
        let config = BackendConfig::default();
        let client = ApiClient::new(&config, SessionHandle::new()).unwrap();
        assert_eq!(client.api_base, "http://localhost:8000/api");
    }

    #[test]
    fn test_extract_detail_string() {
        assert_eq!(
            extract_detail(r#"{"detail": "Document not found"}"#),
            Some("Document not found".to_string())
        );
        assert_eq!(
            extract_detail(r#"{"detail": "  padded  "}"#),
            Some("padded".to_string())
        );
    }

    #[test]
    fn test_extract_detail_validation_list() {
        let body = r#"{"detail": [{"loc": ["body", "query"], "msg": "field required", "type": "value_error.missing"}]}"#;
        assert_eq!(extract_detail(body), Some("field required".to_string()));
    }

    #[test]
    fn test_extract_detail_absent_or_unusable() {
        assert_eq!(extract_detail(""), None);
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(r#"{"message": "nope"}"#), None);
        assert_eq!(extract_detail(r#"{"detail": ""}"#), None);
        assert_eq!(extract_detail(r#"{"detail": 42}"#), None);
    }

    #[test]
    fn test_mime_for_extensions() {
        assert_eq!(mime_for(FileKind::Json, "data.json"), "application/json");
        assert_eq!(
            mime_for(FileKind::Spreadsheet, "legacy.XLS"),
            "application/vnd.ms-excel"
        );
        assert_eq!(
            mime_for(FileKind::Spreadsheet, "sales.xlsx"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }
}
