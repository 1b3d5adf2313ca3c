//! Per-workflow controller state machines
//!
//! Each panel of the UI is backed by one controller here: upload, query,
//! report export, and the document list. Controllers are plain synchronous
//! state; the network half of an operation runs elsewhere (a spawned task)
//! and delivers its result back through `finish`-style methods.
//!
//! ## Single-flight
//!
//! ```text
//! begin() ──► OpTicket(n)          task for n runs
//! begin() ──► OpTicket(n+1)        task for n+1 runs, n is superseded
//!
//! finish(OpTicket(n), ..)   ──► discarded, state untouched
//! finish(OpTicket(n+1), ..) ──► applied, becomes the visible result
//! ```
//!
//! At most one operation per controller is authoritative. Starting a new one
//! clears the visible result immediately and hands out a fresh ticket; a
//! completion is applied only if its ticket is still the newest. Superseded
//! requests are never cancelled, their results just never land. The same
//! mechanism covers logout: clearing a controller invalidates every
//! outstanding ticket.
//!
//! Failures collapse at this boundary into display-safe values (an outcome
//! struct or message string); nothing above the controllers ever sees a raw
//! transport error.

mod documents;
mod query;
mod report;
mod upload;

pub use documents::{DeleteOutcome, DocumentRegistry, RefreshStatus};
pub use query::QueryController;
pub use report::{
    decode_excel_data, sanitize_filename, save_report, ReportExporter, ReportOutcome, SavedReport,
};
pub use upload::UploadController;

use crate::error::Error;
use crate::types::Language;

/// Proof of having started a particular operation. Completions must present
/// it back; only the newest ticket per slot is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpTicket(u64);

/// Holder for one operation kind's current state: a monotonically increasing
/// sequence, an in-flight flag, and the latest applied result.
#[derive(Debug)]
pub struct OpSlot<T> {
    seq: u64,
    in_flight: bool,
    result: Option<T>,
}

impl<T> Default for OpSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OpSlot<T> {
    pub fn new() -> Self {
        OpSlot {
            seq: 0,
            in_flight: false,
            result: None,
        }
    }

    /// Start a new operation: the previous result disappears now, not when
    /// the new one resolves, and any outstanding ticket is superseded.
    pub fn begin(&mut self) -> OpTicket {
        self.seq += 1;
        self.in_flight = true;
        self.result = None;
        OpTicket(self.seq)
    }

    /// Apply a completion. Returns false, leaving state untouched, when the
    /// ticket has been superseded by a newer `begin` or a `clear`.
    pub fn finish(&mut self, ticket: OpTicket, result: T) -> bool {
        if ticket.0 != self.seq {
            return false;
        }
        self.in_flight = false;
        self.result = Some(result);
        true
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Sequence number of the newest `begin` or `clear`; advances exactly
    /// once per started operation.
    pub fn generation(&self) -> u64 {
        self.seq
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Wipe the slot and invalidate every outstanding ticket. Used on
    /// logout so in-flight completions from the old session cannot land.
    pub fn clear(&mut self) {
        self.seq += 1;
        self.in_flight = false;
        self.result = None;
    }
}

/// Collapse an error into the string a panel may display: the server's
/// detail when it sent one, the local validation message, or the generic
/// fallback for the active language.
///
/// Controllers apply this internally; it is public for failure paths that
/// do not run through a controller, such as login.
pub fn failure_message(error: &Error, language: Language) -> String {
    match error {
        Error::Validation(msg) => msg.clone(),
        _ => match error.detail() {
            Some(detail) => detail.to_string(),
            None => language.fallback_error().to_string(),
        },
    }
}
