//! Upload workflow state

use super::{failure_message, OpSlot, OpTicket};
use crate::api::UploadResponse;
use crate::error::Error;
use crate::types::{Language, UploadOutcome};

/// Tracks the one upload that is allowed to be visible at a time.
///
/// The controller never touches the network itself; the caller starts the
/// request with the ticket from [`begin`](UploadController::begin) and hands
/// the result back to [`finish`](UploadController::finish).
#[derive(Debug, Default)]
pub struct UploadController {
    slot: OpSlot<UploadOutcome>,
}

impl UploadController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a submission. The previous outcome disappears immediately so a
    /// stale result is never shown as if it were current.
    pub fn begin(&mut self) -> OpTicket {
        self.slot.begin()
    }

    pub fn uploading(&self) -> bool {
        self.slot.in_flight()
    }

    pub fn outcome(&self) -> Option<&UploadOutcome> {
        self.slot.result()
    }

    /// Apply the result of the upload started with `ticket`.
    ///
    /// Returns whether it was applied; a superseded ticket changes nothing.
    /// Callers trigger the document-list refresh only when this returns true
    /// and the outcome succeeded.
    pub fn finish(
        &mut self,
        ticket: OpTicket,
        result: Result<UploadResponse, Error>,
        language: Language,
    ) -> bool {
        let outcome = match result {
            Ok(response) => UploadOutcome {
                success: true,
                message: response.message,
                filename: Some(response.filename),
                file_type: Some(response.file_type),
                chunks_count: Some(response.chunks_count),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Upload failed");
                UploadOutcome::failed(failure_message(&e, language))
            }
        };
        self.slot.finish(ticket, outcome)
    }

    /// Record a submission rejected before any request was started, replacing
    /// the previous outcome. The controller is idle again on return; a
    /// locally refused file never shows as uploading.
    pub fn reject(&mut self, error: Error, language: Language) {
        let ticket = self.slot.begin();
        self.finish(ticket, Err(error), language);
    }

    /// Forget everything, invalidating any in-flight upload. Used on logout.
    pub fn clear(&mut self) {
        self.slot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_response(filename: &str, chunks: u32, file_type: &str) -> UploadResponse {
        UploadResponse {
            message: "ok".to_string(),
            document_id: "665f1c2ab7".to_string(),
            filename: filename.to_string(),
            chunks_count: chunks,
            file_type: file_type.to_string(),
        }
    }

    #[test]
    fn test_happy_path_outcome() {
        let mut controller = UploadController::new();
        let ticket = controller.begin();
        assert!(controller.uploading());

        let applied = controller.finish(
            ticket,
            Ok(ok_response("sales.xlsx", 3, "xlsx")),
            Language::En,
        );
        assert!(applied);
        assert!(!controller.uploading());

        let outcome = controller.outcome().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.filename.as_deref(), Some("sales.xlsx"));
        assert_eq!(outcome.chunks_count, Some(3));
        assert_eq!(outcome.file_type.as_deref(), Some("xlsx"));
    }

    #[test]
    fn test_begin_discards_previous_outcome_immediately() {
        let mut controller = UploadController::new();
        let first = controller.begin();
        controller.finish(first, Ok(ok_response("a.xlsx", 1, "xlsx")), Language::En);
        assert!(controller.outcome().is_some());

        controller.begin();
        // Cleared before the new attempt resolves
        assert_eq!(controller.outcome(), None);
        assert!(controller.uploading());
    }

    #[test]
    fn test_superseded_upload_never_wins() {
        let mut controller = UploadController::new();
        let a = controller.begin();
        let b = controller.begin();

        // Order 1: A arrives late, after B
        assert!(controller.finish(b, Ok(ok_response("b.xlsx", 2, "xlsx")), Language::En));
        assert!(!controller.finish(a, Ok(ok_response("a.xlsx", 1, "xlsx")), Language::En));
        assert_eq!(
            controller.outcome().unwrap().filename.as_deref(),
            Some("b.xlsx")
        );

        // Order 2: A arrives first, then B
        let a = controller.begin();
        let b = controller.begin();
        assert!(!controller.finish(a, Ok(ok_response("a.xlsx", 1, "xlsx")), Language::En));
        assert!(controller.finish(b, Ok(ok_response("b.xlsx", 2, "xlsx")), Language::En));
        assert_eq!(
            controller.outcome().unwrap().filename.as_deref(),
            Some("b.xlsx")
        );
    }

    #[test]
    fn test_failure_uses_detail_then_fallback() {
        let mut controller = UploadController::new();
        let ticket = controller.begin();
        controller.finish(
            ticket,
            Err(Error::Api {
                status: 400,
                detail: Some("Unsupported file type. Please upload Excel or JSON files.".to_string()),
            }),
            Language::En,
        );
        let outcome = controller.outcome().unwrap();
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Unsupported file type. Please upload Excel or JSON files."
        );

        let ticket = controller.begin();
        controller.finish(
            ticket,
            Err(Error::Http("connection refused".to_string())),
            Language::Id,
        );
        assert_eq!(
            controller.outcome().unwrap().message,
            "Terjadi kesalahan. Silakan coba lagi."
        );
    }

    #[test]
    fn test_reject_records_failure_without_uploading() {
        let mut controller = UploadController::new();
        controller.reject(
            Error::Validation("unsupported file type: \"notes.pdf\"".to_string()),
            Language::En,
        );

        assert!(!controller.uploading());
        let outcome = controller.outcome().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "unsupported file type: \"notes.pdf\"");

        // A rejection also supersedes whatever was in flight
        let stale = controller.begin();
        controller.reject(
            Error::Validation("unsupported file type: \"x.txt\"".to_string()),
            Language::En,
        );
        assert!(!controller.finish(stale, Ok(ok_response("x.xlsx", 1, "xlsx")), Language::En));
        assert_eq!(
            controller.outcome().unwrap().message,
            "unsupported file type: \"x.txt\""
        );
    }

    #[test]
    fn test_clear_invalidates_in_flight() {
        let mut controller = UploadController::new();
        let ticket = controller.begin();
        controller.clear();

        assert!(!controller.finish(ticket, Ok(ok_response("late.xlsx", 1, "xlsx")), Language::En));
        assert_eq!(controller.outcome(), None);
    }
}
