//! Client-side cache of the ingested document list

use chrono::{DateTime, Utc};

use super::{failure_message, OpSlot, OpTicket};
use crate::error::Error;
use crate::types::{DocumentSummary, Language};

/// How the most recent completed refresh went.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshStatus {
    pub completed_at: DateTime<Utc>,
    /// Present when the refresh failed and the cached list is stale
    pub error: Option<String>,
}

/// Visible result of one delete attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub success: bool,
    pub message: String,
}

/// Cache of the user's documents.
///
/// The list is replaced wholesale on each successful refresh; a reader
/// never observes a partial list. A failed refresh keeps the previous list
/// (stale but available) and records the failure so the panel can say so.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: Vec<DocumentSummary>,
    refresh: OpSlot<RefreshStatus>,
    delete: OpSlot<DeleteOutcome>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    /// Start a refresh. The cached list stays visible while it runs.
    pub fn begin_refresh(&mut self) -> OpTicket {
        self.refresh.begin()
    }

    pub fn refreshing(&self) -> bool {
        self.refresh.in_flight()
    }

    /// Generation of the refresh slot: advances exactly once per begun
    /// refresh (and on `clear`), whether or not it has completed.
    pub fn refresh_generation(&self) -> u64 {
        self.refresh.generation()
    }

    /// Status of the last completed refresh, if any finished since the
    /// registry was last cleared.
    pub fn last_refresh(&self) -> Option<&RefreshStatus> {
        self.refresh.result()
    }

    /// Apply the result of the refresh started with `ticket`.
    ///
    /// Returns whether it was applied; a superseded ticket changes nothing.
    pub fn finish_refresh(
        &mut self,
        ticket: OpTicket,
        result: Result<Vec<DocumentSummary>, Error>,
        language: Language,
    ) -> bool {
        match result {
            Ok(documents) => {
                let status = RefreshStatus {
                    completed_at: Utc::now(),
                    error: None,
                };
                if !self.refresh.finish(ticket, status) {
                    return false;
                }
                self.documents = documents;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Document list refresh failed, keeping cached list");
                let status = RefreshStatus {
                    completed_at: Utc::now(),
                    error: Some(failure_message(&e, language)),
                };
                self.refresh.finish(ticket, status)
            }
        }
    }

    /// Start a delete. One at a time; the panel blocks while this is true.
    pub fn begin_delete(&mut self) -> OpTicket {
        self.delete.begin()
    }

    pub fn deleting(&self) -> bool {
        self.delete.in_flight()
    }

    pub fn delete_outcome(&self) -> Option<&DeleteOutcome> {
        self.delete.result()
    }

    /// Apply the result of the delete started with `ticket`.
    ///
    /// Returns whether it was applied. Callers refresh the list only when
    /// this returns true and the delete succeeded.
    pub fn finish_delete(
        &mut self,
        ticket: OpTicket,
        result: Result<(), Error>,
        language: Language,
    ) -> bool {
        let outcome = match result {
            Ok(()) => DeleteOutcome {
                success: true,
                message: match language {
                    Language::En => "Document removed".to_string(),
                    Language::Id => "Dokumen dihapus".to_string(),
                },
            },
            Err(e) => {
                tracing::warn!(error = %e, "Document delete failed");
                DeleteOutcome {
                    success: false,
                    message: failure_message(&e, language),
                }
            }
        };
        self.delete.finish(ticket, outcome)
    }

    /// Drop the cache and invalidate in-flight refreshes and deletes.
    /// Used on logout.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.refresh.clear();
        self.delete.clear();
    }
}
