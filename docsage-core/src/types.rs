//! Core domain types for docsage
//!
//! These types mirror the analysis service's REST contract plus the transient
//! per-operation state the client keeps around it.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Document** | An uploaded spreadsheet/JSON file the service has ingested |
//! | **Chunk** | A unit of processed document content used by retrieval; opaque here beyond its count |
//! | **Source** | A document name the service attributes as evidence for an answer |
//! | **Language** | The answer language requested for queries and reports (English or Indonesian) |

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::error::Error;

// ============================================
// Language
// ============================================

/// Answer language for queries and generated reports.
///
/// Also selects the generic fallback message shown when a failure carries no
/// server detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    En,
    /// Bahasa Indonesia
    Id,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Id => "id",
        }
    }

    /// Human-friendly name for panel chrome.
    pub fn label(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Id => "Indonesia",
        }
    }

    /// Generic error text used when a failure carries no server detail.
    pub fn fallback_error(&self) -> &'static str {
        match self {
            Language::En => "Something went wrong. Please try again.",
            Language::Id => "Terjadi kesalahan. Silakan coba lagi.",
        }
    }

    pub fn toggle(&self) -> Language {
        match self {
            Language::En => Language::Id,
            Language::Id => Language::En,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Language::En),
            "id" => Ok(Language::Id),
            _ => Err(format!("unknown language: {}", s)),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Users and documents
// ============================================

/// The signed-in account, as reported by the auth endpoints.
///
/// Opaque to this client beyond display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// One ingested document, as listed by the service.
///
/// Created server-side on upload and never mutated by this client.
/// `processed` may flip false to true between refreshes; ingestion is
/// asynchronous server-side and the client does no polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    /// Server-detected kind ("excel" or "json")
    pub file_type: String,
    #[serde(default)]
    pub chunks_count: u32,
    #[serde(default)]
    pub processed: bool,
    #[serde(deserialize_with = "deserialize_server_time")]
    pub uploaded_at: DateTime<Utc>,
}

/// Server timestamps arrive as ISO 8601, with or without a UTC offset
/// depending on how the service serialized them. Naive values are UTC.
fn deserialize_server_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

// ============================================
// Uploads
// ============================================

/// File kinds the upload panel accepts.
///
/// Anything else is rejected locally; no request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// .xlsx / .xls
    Spreadsheet,
    /// .json
    Json,
}

impl FileKind {
    /// Classify by extension, case-insensitive. `None` means unsupported.
    pub fn from_path(path: &Path) -> Option<FileKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xls" => Some(FileKind::Spreadsheet),
            "json" => Some(FileKind::Json),
            _ => None,
        }
    }

    /// Classify by extension, turning an unsupported kind into the
    /// validation error shown to the user.
    pub fn validate_path(path: &Path) -> Result<FileKind, Error> {
        FileKind::from_path(path).ok_or_else(|| {
            Error::Validation(format!(
                "unsupported file type: {:?} (expected .xlsx, .xls, or .json)",
                path
            ))
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Spreadsheet => "spreadsheet",
            FileKind::Json => "json",
        }
    }
}

/// Result of one upload attempt. Transient: lives until the next attempt
/// replaces it, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub success: bool,
    pub message: String,
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub chunks_count: Option<u32>,
}

impl UploadOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        UploadOutcome {
            success: false,
            message: message.into(),
            filename: None,
            file_type: None,
            chunks_count: None,
        }
    }
}

// ============================================
// Queries
// ============================================

/// A validated question for the analysis endpoint.
///
/// Construction trims the raw input and rejects empty queries, so holding a
/// `QueryRequest` means there is something to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub language: Language,
}

impl QueryRequest {
    /// `None` when the query is empty after trimming.
    pub fn new(raw: &str, language: Language) -> Option<QueryRequest> {
        let query = raw.trim();
        if query.is_empty() {
            return None;
        }
        Some(QueryRequest {
            query: query.to_string(),
            language,
        })
    }
}

/// The current query outcome. Success and failure flow through the same slot;
/// `error` decides which fields are meaningful and gates report export.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub error: bool,
    pub answer: Option<String>,
    /// Documents attributed as evidence, in the order the service returned
    pub sources: Vec<String>,
    /// Retrieved passages the answer was synthesized from
    pub context_used: Vec<String>,
    pub message: Option<String>,
}
