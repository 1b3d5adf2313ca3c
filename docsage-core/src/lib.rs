//! # docsage-core
//!
//! Core library for docsage - a terminal client for a document-analysis
//! service.
//!
//! This library provides:
//! - Domain types for sessions, documents, queries, and reports
//! - The REST client for the service's `/api` endpoints
//! - Session lifecycle with an on-disk token store
//! - Per-workflow controllers with single-flight semantics
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! The UI owns the controllers and drives them synchronously; network calls
//! run as spawned tasks against [`api::ApiClient`] and deliver results back
//! through each controller's `finish` method, guarded by operation tickets
//! so a superseded request can never overwrite a newer one.
//!
//! ## Example
//!
//! ```rust,no_run
//! use docsage_core::{ApiClient, Config, SessionManager, TokenStore};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Restore any persisted session and build the client around it
//! let sessions = SessionManager::new(TokenStore::new(Config::session_path()));
//! sessions.restore();
//! let client = ApiClient::new(&config.backend, sessions.handle())
//!     .expect("failed to create API client");
//! ```

// Re-export commonly used items at the crate root
pub use api::ApiClient;
pub use config::Config;
pub use error::{Error, Result};
pub use session::{Session, SessionHandle, SessionManager, TokenStore};
pub use types::*;

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod ops;
pub mod session;
pub mod types;
