//! Query workflow state

use super::{failure_message, OpSlot, OpTicket};
use crate::api::QueryResponse;
use crate::error::Error;
use crate::types::{Language, QueryRequest, QueryResult};

/// Holds the latest answer state and remembers which request produced it.
///
/// Success and failure share one current-result slot; the `error` flag on
/// [`QueryResult`] decides which it is and gates report export. Empty
/// queries never reach this controller: [`QueryRequest::new`] refuses to
/// construct them, so there is nothing to submit.
#[derive(Debug, Default)]
pub struct QueryController {
    slot: OpSlot<QueryResult>,
    in_flight_request: Option<QueryRequest>,
    answered_request: Option<QueryRequest>,
}

impl QueryController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a query. Replaces any previous result immediately.
    pub fn begin(&mut self, request: QueryRequest) -> OpTicket {
        let ticket = self.slot.begin();
        self.in_flight_request = Some(request);
        ticket
    }

    pub fn loading(&self) -> bool {
        self.slot.in_flight()
    }

    /// The request currently in flight, for building the actual call.
    pub fn in_flight_request(&self) -> Option<&QueryRequest> {
        self.in_flight_request.as_ref()
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.slot.result()
    }

    /// The request to hand to report generation: present only while the
    /// current result is a non-error answer, and always exactly the query
    /// string and language that produced it.
    pub fn exportable(&self) -> Option<&QueryRequest> {
        match self.slot.result() {
            Some(result) if !result.error => self.answered_request.as_ref(),
            _ => None,
        }
    }

    /// Apply the result of the query started with `ticket`.
    ///
    /// Returns whether it was applied; a superseded ticket changes nothing.
    pub fn finish(
        &mut self,
        ticket: OpTicket,
        result: Result<QueryResponse, Error>,
        language: Language,
    ) -> bool {
        let query_result = match result {
            Ok(response) => QueryResult {
                error: false,
                answer: Some(response.answer),
                sources: response.sources,
                context_used: response.context_used,
                message: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Query failed");
                QueryResult {
                    error: true,
                    answer: None,
                    sources: Vec::new(),
                    context_used: Vec::new(),
                    message: Some(failure_message(&e, language)),
                }
            }
        };

        if !self.slot.finish(ticket, query_result) {
            return false;
        }
        self.answered_request = self.in_flight_request.take();
        true
    }

    /// Forget everything, invalidating any in-flight query. Used on logout.
    pub fn clear(&mut self) {
        self.slot.clear();
        self.in_flight_request = None;
        self.answered_request = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str, language: Language) -> QueryRequest {
        QueryRequest::new(query, language).unwrap()
    }

    fn answer(text: &str, sources: &[&str]) -> QueryResponse {
        QueryResponse {
            answer: text.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            context_used: vec!["row 1".to_string()],
        }
    }

    #[test]
    fn test_success_stores_result_and_unlocks_export() {
        let mut controller = QueryController::new();
        let req = request("total sales this month", Language::En);
        let ticket = controller.begin(req.clone());
        assert!(controller.loading());
        assert_eq!(controller.exportable(), None);

        assert!(controller.finish(ticket, Ok(answer("42 units", &["sales.xlsx"])), Language::En));
        assert!(!controller.loading());

        let result = controller.result().unwrap();
        assert!(!result.error);
        assert_eq!(result.answer.as_deref(), Some("42 units"));
        assert_eq!(result.sources, vec!["sales.xlsx".to_string()]);

        // Export gets exactly the request that produced this answer
        let exportable = controller.exportable().unwrap();
        assert_eq!(exportable, &req);
        assert_eq!(exportable.query, "total sales this month");
        assert_eq!(exportable.language, Language::En);
    }

    #[test]
    fn test_failure_blocks_export() {
        let mut controller = QueryController::new();
        let ticket = controller.begin(request("anything", Language::En));
        controller.finish(
            ticket,
            Err(Error::Api {
                status: 500,
                detail: Some("Error generating answer".to_string()),
            }),
            Language::En,
        );

        let result = controller.result().unwrap();
        assert!(result.error);
        assert_eq!(result.message.as_deref(), Some("Error generating answer"));
        assert_eq!(controller.exportable(), None);
    }

    #[test]
    fn test_failure_replacing_success_revokes_export() {
        let mut controller = QueryController::new();
        let ticket = controller.begin(request("first", Language::En));
        controller.finish(ticket, Ok(answer("answer", &[])), Language::En);
        assert!(controller.exportable().is_some());

        let ticket = controller.begin(request("second", Language::En));
        assert_eq!(controller.exportable(), None);
        controller.finish(ticket, Err(Error::Http("timeout".to_string())), Language::En);
        assert_eq!(controller.exportable(), None);
    }

    #[test]
    fn test_superseded_query_never_wins() {
        let mut controller = QueryController::new();
        let a = controller.begin(request("old question", Language::En));
        let b = controller.begin(request("new question", Language::Id));

        assert!(controller.finish(b, Ok(answer("new answer", &[])), Language::Id));
        assert!(!controller.finish(a, Ok(answer("old answer", &[])), Language::En));

        assert_eq!(
            controller.result().unwrap().answer.as_deref(),
            Some("new answer")
        );
        let exportable = controller.exportable().unwrap();
        assert_eq!(exportable.query, "new question");
        assert_eq!(exportable.language, Language::Id);
    }

    #[test]
    fn test_clear_wipes_result_and_export() {
        let mut controller = QueryController::new();
        let ticket = controller.begin(request("question", Language::En));
        controller.finish(ticket, Ok(answer("answer", &[])), Language::En);

        controller.clear();
        assert_eq!(controller.result(), None);
        assert_eq!(controller.exportable(), None);
        assert!(!controller.loading());
    }
}
