//! Report export: decode the generated spreadsheet and save it locally

use std::path::{Path, PathBuf};

use base64::Engine;

use super::{failure_message, OpSlot, OpTicket};
use crate::api::ReportPayload;
use crate::error::{Error, Result};
use crate::types::Language;

/// A report written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedReport {
    pub path: PathBuf,
    /// Decoded size, byte for byte what the service generated
    pub bytes: usize,
}

/// Visible result of one export attempt, success or failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    pub success: bool,
    pub message: String,
    pub path: Option<PathBuf>,
}

/// Tracks the one report export allowed to be visible at a time.
///
/// Export is only started for a query that already produced a non-error
/// answer; the caller takes the recorded request from
/// [`QueryController::exportable`](super::QueryController::exportable) so
/// the report always carries the same query string and language.
#[derive(Debug, Default)]
pub struct ReportExporter {
    slot: OpSlot<ReportOutcome>,
}

impl ReportExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an export. The previous outcome disappears immediately.
    pub fn begin(&mut self) -> OpTicket {
        self.slot.begin()
    }

    pub fn exporting(&self) -> bool {
        self.slot.in_flight()
    }

    pub fn outcome(&self) -> Option<&ReportOutcome> {
        self.slot.result()
    }

    /// Apply the result of the export started with `ticket`.
    ///
    /// Failures become a visible outcome like any other workflow here; an
    /// export that fails is not allowed to fail silently.
    pub fn finish(
        &mut self,
        ticket: OpTicket,
        result: Result<SavedReport>,
        language: Language,
    ) -> bool {
        let outcome = match result {
            Ok(saved) => {
                let message = match language {
                    Language::En => format!("Report saved to {}", saved.path.display()),
                    Language::Id => format!("Laporan tersimpan di {}", saved.path.display()),
                };
                ReportOutcome {
                    success: true,
                    message,
                    path: Some(saved.path),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Report export failed");
                ReportOutcome {
                    success: false,
                    message: failure_message(&e, language),
                    path: None,
                }
            }
        };
        self.slot.finish(ticket, outcome)
    }

    /// Forget everything, invalidating any in-flight export. Used on logout.
    pub fn clear(&mut self) {
        self.slot.clear();
    }
}

/// Decode the base64 spreadsheet payload to raw bytes.
///
/// Strict round-trip: the returned bytes are exactly what the service
/// encoded, with no normalization of any kind.
pub fn decode_excel_data(excel_data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(excel_data)
        .map_err(|e| Error::Decode(format!("invalid base64 report payload: {}", e)))
}

/// Reduce a server-suggested filename to a bare file name.
///
/// The suggestion is untrusted input; path separators and dot-only names
/// must not steer the write outside the download directory.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        return "report.xlsx".to_string();
    }
    base.to_string()
}

/// Decode `payload` and write it under `dir`, keeping the suggested
/// filename but never overwriting an existing file.
pub async fn save_report(payload: &ReportPayload, dir: &Path) -> Result<SavedReport> {
    let bytes = decode_excel_data(&payload.excel_data)?;
    tokio::fs::create_dir_all(dir).await?;

    let path = available_path(dir, &sanitize_filename(&payload.filename)).await;
    tokio::fs::write(&path, &bytes).await?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Report saved");
    Ok(SavedReport {
        path,
        bytes: bytes.len(),
    })
}

/// First free path for `name` in `dir`: the name itself, then
/// "name (1).ext", "name (2).ext", ...
async fn available_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut counter = 1u32;
    loop {
        let renamed = match extension {
            Some(ext) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", stem, counter),
        };
        let candidate = dir.join(renamed);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        counter += 1;
    }
}
