//! REST client for the analysis service
//!
//! Everything the client talks to lives behind `{origin}/api`: auth,
//! document ingestion, natural-language queries, and report generation.
//! Parsing, chunking, retrieval, and report rendering are all server-side;
//! this module only speaks the request/response contracts.
//!
//! ## Authentication
//!
//! Authenticated endpoints take `Authorization: Bearer <token>`. The client
//! holds a [`SessionHandle`](crate::session::SessionHandle) and reads the
//! current token while building each request, so login and logout take
//! effect for every subsequent call without rebuilding the client.

mod client;

pub use client::{ApiClient, AuthResponse, QueryResponse, ReportPayload, UploadResponse};
