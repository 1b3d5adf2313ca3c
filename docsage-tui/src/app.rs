//! Application state and event handling.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use docsage_core::api::{ApiClient, AuthResponse, QueryResponse, UploadResponse};
use docsage_core::ops::{
    failure_message, save_report, DocumentRegistry, OpTicket, QueryController, ReportExporter,
    SavedReport, UploadController,
};
use docsage_core::{
    DocumentSummary, Error, FileKind, Language, QueryRequest, SessionManager, UserIdentity,
};
use ratatui::widgets::TableState;
use tokio::runtime::Handle;

use crate::input::InputField;

// ============================================================================
// Events
// ============================================================================

/// Completion message sent back from a spawned operation.
///
/// Each authenticated operation carries the ticket minted when it began; the
/// controllers discard completions whose ticket has been superseded. Auth has
/// no ticket because the submit path refuses to overlap itself.
pub enum AppEvent {
    AuthFinished {
        result: Result<AuthResponse, Error>,
    },
    DocumentsRefreshed {
        ticket: OpTicket,
        result: Result<Vec<DocumentSummary>, Error>,
    },
    UploadFinished {
        ticket: OpTicket,
        result: Result<UploadResponse, Error>,
    },
    QueryFinished {
        ticket: OpTicket,
        result: Result<QueryResponse, Error>,
    },
    DocumentDeleted {
        ticket: OpTicket,
        result: Result<(), Error>,
    },
    ReportSaved {
        ticket: OpTicket,
        result: Result<SavedReport, Error>,
    },
    HealthChecked {
        online: bool,
    },
}

// ============================================================================
// Screens and focus
// ============================================================================

/// Which screen is visible. Derived from the session on every use, never
/// stored, so an expired session can never leave the dashboard on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Dashboard,
}

/// Dashboard panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Upload,
    Query,
    Documents,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Upload => "Upload",
            Tab::Query => "Query",
            Tab::Documents => "Documents",
        }
    }

    pub fn next(&self) -> Tab {
        match self {
            Tab::Upload => Tab::Query,
            Tab::Query => Tab::Documents,
            Tab::Documents => Tab::Upload,
        }
    }

    pub fn previous(&self) -> Tab {
        match self {
            Tab::Upload => Tab::Documents,
            Tab::Query => Tab::Upload,
            Tab::Documents => Tab::Query,
        }
    }
}

/// Auth screen mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// Which auth form field has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthField {
    #[default]
    Email,
    Password,
    Name,
}

// ============================================================================
// App
// ============================================================================

/// Top-level application state.
pub struct App {
    sessions: SessionManager,
    client: Arc<ApiClient>,
    runtime: Handle,
    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,

    /// Answer language for queries and reports; Ctrl+L toggles it
    pub language: Language,
    download_dir: PathBuf,

    // One controller per workflow
    pub registry: DocumentRegistry,
    pub upload: UploadController,
    pub query: QueryController,
    pub exporter: ReportExporter,

    // Auth screen
    pub auth_mode: AuthMode,
    pub auth_focus: AuthField,
    pub email: InputField,
    pub password: InputField,
    pub display_name: InputField,
    pub auth_busy: bool,
    pub auth_error: Option<String>,

    // Dashboard
    pub active_tab: Tab,
    pub upload_path: InputField,
    pub question: InputField,
    pub document_table: TableState,

    /// Result of the startup health probe; None until it answers
    pub backend_online: Option<bool>,

    pub should_quit: bool,
}

impl App {
    pub fn new(
        sessions: SessionManager,
        client: ApiClient,
        runtime: Handle,
        language: Language,
        download_dir: PathBuf,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            sessions,
            client: Arc::new(client),
            runtime,
            events_tx,
            events_rx,
            language,
            download_dir,
            registry: DocumentRegistry::new(),
            upload: UploadController::new(),
            query: QueryController::new(),
            exporter: ReportExporter::new(),
            auth_mode: AuthMode::default(),
            auth_focus: AuthField::default(),
            email: InputField::new(),
            password: InputField::new(),
            display_name: InputField::new(),
            auth_busy: false,
            auth_error: None,
            active_tab: Tab::default(),
            upload_path: InputField::new(),
            question: InputField::new(),
            document_table: TableState::default(),
            backend_online: None,
            should_quit: false,
        }
    }

    /// Kick off startup work: the health probe, and the first document
    /// refresh when a persisted session was restored.
    pub fn bootstrap(&mut self) {
        self.spawn_health_probe();
        if self.sessions.is_authenticated() {
            self.refresh_documents();
        }
    }

    pub fn screen(&self) -> Screen {
        if self.sessions.is_authenticated() {
            Screen::Dashboard
        } else {
            Screen::Auth
        }
    }

    /// Signed-in user, when the server has told us who that is. A restored
    /// session has a token but no identity until the next login.
    pub fn user(&self) -> Option<UserIdentity> {
        self.sessions.user()
    }

    // ------------------------------------------------------------------
    // Event application
    // ------------------------------------------------------------------

    /// Apply every completion that arrived since the last tick.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AuthFinished { result } => self.apply_auth(result),
            AppEvent::DocumentsRefreshed { ticket, result } => {
                if self.expire_session_on_rejection(&result) {
                    return;
                }
                self.registry.finish_refresh(ticket, result, self.language);
                self.clamp_document_selection();
            }
            AppEvent::UploadFinished { ticket, result } => {
                if self.expire_session_on_rejection(&result) {
                    return;
                }
                let applied = self.upload.finish(ticket, result, self.language);
                let succeeded = self.upload.outcome().map(|o| o.success).unwrap_or(false);
                if applied && succeeded {
                    self.upload_path.clear();
                    self.refresh_documents();
                }
            }
            AppEvent::QueryFinished { ticket, result } => {
                if self.expire_session_on_rejection(&result) {
                    return;
                }
                self.query.finish(ticket, result, self.language);
            }
            AppEvent::DocumentDeleted { ticket, result } => {
                if self.expire_session_on_rejection(&result) {
                    return;
                }
                let applied = self.registry.finish_delete(ticket, result, self.language);
                let succeeded = self
                    .registry
                    .delete_outcome()
                    .map(|o| o.success)
                    .unwrap_or(false);
                if applied && succeeded {
                    self.refresh_documents();
                }
            }
            AppEvent::ReportSaved { ticket, result } => {
                if self.expire_session_on_rejection(&result) {
                    return;
                }
                self.exporter.finish(ticket, result, self.language);
            }
            AppEvent::HealthChecked { online } => {
                self.backend_online = Some(online);
            }
        }
    }

    fn apply_auth(&mut self, result: Result<AuthResponse, Error>) {
        self.auth_busy = false;
        match result {
            Ok(response) => {
                self.sessions.complete_login(response.user, response.token);
                self.password.clear();
                self.auth_error = None;
                self.refresh_documents();
            }
            Err(e) => {
                tracing::warn!(error = %e, "authentication failed");
                self.auth_error = Some(failure_message(&e, self.language));
            }
        }
    }

    /// A 401 on any authenticated call means the token is dead: end the
    /// session and drop the completion entirely.
    fn expire_session_on_rejection<T>(&mut self, result: &Result<T, Error>) -> bool {
        match result {
            Err(e) if e.is_unauthorized() => {
                tracing::info!("backend rejected the session token, signing out");
                self.sessions.force_logout();
                self.reset_workspace();
                self.auth_error = Some(session_expired_message(self.language).to_string());
                true
            }
            _ => false,
        }
    }

    fn reset_workspace(&mut self) {
        self.registry.clear();
        self.upload.clear();
        self.query.clear();
        self.exporter.clear();
        self.upload_path.clear();
        self.question.clear();
        self.password.clear();
        self.document_table = TableState::default();
        self.active_tab = Tab::default();
        self.auth_busy = false;
    }

    // ------------------------------------------------------------------
    // Key handling
    // ------------------------------------------------------------------

    /// Route a key event to the visible screen.
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Quit and language toggle work everywhere
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('l') => {
                    self.language = self.language.toggle();
                    return;
                }
                _ => {}
            }
        }

        match self.screen() {
            Screen::Auth => self.handle_auth_key(key),
            Screen::Dashboard => self.handle_dashboard_key(key),
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('t') && !self.auth_busy {
                self.auth_mode = match self.auth_mode {
                    AuthMode::Login => AuthMode::Register,
                    AuthMode::Register => AuthMode::Login,
                };
                self.auth_focus = default_focus(self.auth_mode);
                self.auth_error = None;
            }
            return;
        }

        match key.code {
            KeyCode::Enter => self.submit_auth(),
            KeyCode::Tab | KeyCode::Down => self.focus_auth_field(1),
            KeyCode::BackTab | KeyCode::Up => self.focus_auth_field(-1),
            KeyCode::Esc => {
                self.auth_error = None;
            }
            _ => {
                if !self.auth_busy {
                    self.focused_auth_field_mut().handle_key(key);
                }
            }
        }
    }

    fn auth_fields(&self) -> &'static [AuthField] {
        match self.auth_mode {
            AuthMode::Login => &[AuthField::Email, AuthField::Password],
            AuthMode::Register => &[AuthField::Name, AuthField::Email, AuthField::Password],
        }
    }

    fn focus_auth_field(&mut self, step: isize) {
        let fields = self.auth_fields();
        let len = fields.len() as isize;
        let current = fields
            .iter()
            .position(|f| *f == self.auth_focus)
            .unwrap_or(0) as isize;
        self.auth_focus = fields[((current + step + len) % len) as usize];
    }

    fn focused_auth_field_mut(&mut self) -> &mut InputField {
        match self.auth_focus {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
            AuthField::Name => &mut self.display_name,
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('d') => self.sign_out(),
                KeyCode::Char('e') => self.export_report(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.active_tab = self.active_tab.next();
            }
            KeyCode::BackTab => {
                self.active_tab = self.active_tab.previous();
            }
            _ => match self.active_tab {
                Tab::Upload => self.handle_upload_key(key),
                Tab::Query => self.handle_query_key(key),
                Tab::Documents => self.handle_documents_key(key),
            },
        }
    }

    fn handle_upload_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_upload(),
            _ => {
                self.upload_path.handle_key(key);
            }
        }
    }

    fn handle_query_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_query(),
            _ => {
                self.question.handle_key(key);
            }
        }
    }

    fn handle_documents_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.select_next_document(),
            KeyCode::Up | KeyCode::Char('k') => self.select_previous_document(),
            KeyCode::Char('r') => self.refresh_documents(),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected_document(),
            _ => {}
        }
    }

    fn sign_out(&mut self) {
        tracing::info!("user signed out");
        self.sessions.logout();
        self.reset_workspace();
        self.auth_error = None;
        self.auth_focus = default_focus(self.auth_mode);
    }

    // ------------------------------------------------------------------
    // Document selection
    // ------------------------------------------------------------------

    fn select_next_document(&mut self) {
        let count = self.registry.documents().len();
        if count == 0 {
            return;
        }
        let i = match self.document_table.selected() {
            Some(i) if i >= count - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.document_table.select(Some(i));
    }

    fn select_previous_document(&mut self) {
        let count = self.registry.documents().len();
        if count == 0 {
            return;
        }
        let i = match self.document_table.selected() {
            Some(0) => count - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.document_table.select(Some(i));
    }

    /// Keep the table selection valid after the list changes under it.
    fn clamp_document_selection(&mut self) {
        let count = self.registry.documents().len();
        if count == 0 {
            self.document_table.select(None);
            return;
        }
        match self.document_table.selected() {
            Some(i) if i >= count => self.document_table.select(Some(count - 1)),
            None => self.document_table.select(Some(0)),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    fn submit_auth(&mut self) {
        if self.auth_busy {
            return;
        }

        let email = self.email.value().trim().to_string();
        let password = self.password.value().to_string();
        let name = self.display_name.value().trim().to_string();

        if email.is_empty() || password.is_empty() {
            self.auth_error = Some(missing_credentials_message(self.language).to_string());
            return;
        }
        if self.auth_mode == AuthMode::Register && name.is_empty() {
            self.auth_error = Some(missing_name_message(self.language).to_string());
            return;
        }

        self.auth_busy = true;
        self.auth_error = None;

        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        let mode = self.auth_mode;
        self.runtime.spawn(async move {
            let result = match mode {
                AuthMode::Login => client.login(&email, &password).await,
                AuthMode::Register => client.register(&name, &email, &password).await,
            };
            let _ = tx.send(AppEvent::AuthFinished { result });
        });
    }

    /// Fetch the document list, superseding any refresh still in flight.
    fn refresh_documents(&mut self) {
        let ticket = self.registry.begin_refresh();
        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = client.list_documents().await;
            let _ = tx.send(AppEvent::DocumentsRefreshed { ticket, result });
        });
    }

    fn submit_upload(&mut self) {
        if self.upload.uploading() {
            return;
        }
        let raw = self.upload_path.value().trim();
        if raw.is_empty() {
            return;
        }
        let path = expand_home(raw);

        // Unsupported kinds are refused here, before the busy state engages
        if let Err(e) = FileKind::validate_path(&path) {
            self.upload.reject(e, self.language);
            return;
        }

        let ticket = self.upload.begin();
        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = client.upload_document(&path).await;
            let _ = tx.send(AppEvent::UploadFinished { ticket, result });
        });
    }

    /// Submit the question as typed. An empty question is a no-op; a new
    /// submission supersedes one still in flight.
    fn submit_query(&mut self) {
        let request = match QueryRequest::new(self.question.value(), self.language) {
            Some(r) => r,
            None => return,
        };

        let ticket = self.query.begin(request.clone());
        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = client.query(&request).await;
            let _ = tx.send(AppEvent::QueryFinished { ticket, result });
        });
    }

    /// Generate and save a report for the answer on screen. Only available
    /// while that answer is a non-error result.
    fn export_report(&mut self) {
        if self.exporter.exporting() {
            return;
        }
        let request = match self.query.exportable() {
            Some(r) => r.clone(),
            None => return,
        };

        let ticket = self.exporter.begin();
        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        let dir = self.download_dir.clone();
        self.runtime.spawn(async move {
            let result = match client.generate_report(&request).await {
                Ok(payload) => save_report(&payload, &dir).await,
                Err(e) => Err(e),
            };
            let _ = tx.send(AppEvent::ReportSaved { ticket, result });
        });
    }

    fn delete_selected_document(&mut self) {
        if self.registry.deleting() {
            return;
        }
        let document_id = match self
            .document_table
            .selected()
            .and_then(|i| self.registry.documents().get(i))
        {
            Some(doc) => doc.id.clone(),
            None => return,
        };

        let ticket = self.registry.begin_delete();
        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = client.delete_document(&document_id).await;
            let _ = tx.send(AppEvent::DocumentDeleted { ticket, result });
        });
    }

    fn spawn_health_probe(&self) {
        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let online = client.health_check().await.unwrap_or(false);
            let _ = tx.send(AppEvent::HealthChecked { online });
        });
    }
}

fn default_focus(mode: AuthMode) -> AuthField {
    match mode {
        AuthMode::Login => AuthField::Email,
        AuthMode::Register => AuthField::Name,
    }
}

/// Expand a leading `~/` using $HOME, as a shell would.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

// ============================================================================
// Localized UI strings
// ============================================================================

fn session_expired_message(language: Language) -> &'static str {
    match language {
        Language::En => "Session expired. Please sign in again.",
        Language::Id => "Sesi berakhir. Silakan masuk lagi.",
    }
}

fn missing_credentials_message(language: Language) -> &'static str {
    match language {
        Language::En => "Email and password are required",
        Language::Id => "Email dan kata sandi wajib diisi",
    }
}

fn missing_name_message(language: Language) -> &'static str {
    match language {
        Language::En => "Name is required to register",
        Language::Id => "Nama wajib diisi untuk mendaftar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docsage_core::config::BackendConfig;
    use docsage_core::TokenStore;
    use tempfile::TempDir;

    struct Harness {
        app: App,
        _runtime: tokio::runtime::Runtime,
        _dir: TempDir,
    }

    /// Build an app against a backend address nothing listens on. The tests
    /// drive `apply_event` directly, so no operation ever needs the network
    /// to answer.
    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();

        let sessions = SessionManager::new(TokenStore::new(dir.path().join("session.json")));
        let backend = BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        };
        let client = ApiClient::new(&backend, sessions.handle()).unwrap();
        let app = App::new(
            sessions,
            client,
            runtime.handle().clone(),
            Language::En,
            dir.path().join("reports"),
        );
        Harness {
            app,
            _runtime: runtime,
            _dir: dir,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn auth_response(token: &str) -> AuthResponse {
        AuthResponse {
            message: "Login successful".to_string(),
            token: token.to_string(),
            user: UserIdentity {
                id: "u-1".to_string(),
                email: "tester@example.com".to_string(),
                name: "Tester".to_string(),
            },
        }
    }

    fn document(id: &str, filename: &str) -> DocumentSummary {
        DocumentSummary {
            id: id.to_string(),
            filename: filename.to_string(),
            file_type: "excel".to_string(),
            chunks_count: 3,
            processed: true,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_screen_follows_session() {
        let mut h = harness();
        assert_eq!(h.app.screen(), Screen::Auth);

        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-1")),
        });
        assert_eq!(h.app.screen(), Screen::Dashboard);
        assert!(
            h.app.registry.refreshing(),
            "login should start a document refresh"
        );

        // The server rejecting the token on a later call forces auth back
        let ticket = h.app.registry.begin_refresh();
        h.app.apply_event(AppEvent::DocumentsRefreshed {
            ticket,
            result: Err(Error::Api {
                status: 401,
                detail: None,
            }),
        });
        assert_eq!(h.app.screen(), Screen::Auth);
        assert!(h.app.auth_error.is_some());
        assert!(h.app.registry.documents().is_empty());
    }

    #[test]
    fn test_sign_out_clears_workspace() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-2")),
        });

        let ticket = h.app.registry.begin_refresh();
        h.app.apply_event(AppEvent::DocumentsRefreshed {
            ticket,
            result: Ok(vec![document("doc-1", "a.xlsx")]),
        });
        assert_eq!(h.app.registry.documents().len(), 1);

        h.app.handle_key(ctrl('d'));
        assert_eq!(h.app.screen(), Screen::Auth);
        assert!(h.app.registry.documents().is_empty());
        assert!(h.app.auth_error.is_none(), "a chosen sign-out is not an error");
    }

    #[test]
    fn test_stale_completion_after_sign_out_is_dropped() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-3")),
        });

        let ticket = h.app.upload.begin();
        h.app.handle_key(ctrl('d'));

        h.app.apply_event(AppEvent::UploadFinished {
            ticket,
            result: Ok(UploadResponse {
                message: "File processed successfully".to_string(),
                document_id: "doc-9".to_string(),
                filename: "late.xlsx".to_string(),
                chunks_count: 2,
                file_type: "excel".to_string(),
            }),
        });
        assert!(h.app.upload.outcome().is_none());
        assert!(
            !h.app.registry.refreshing(),
            "a dead session must not trigger a refresh"
        );
    }

    #[test]
    fn test_upload_success_refreshes_documents() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-4")),
        });

        // Settle the refresh started by login
        let ticket = h.app.registry.begin_refresh();
        h.app.apply_event(AppEvent::DocumentsRefreshed {
            ticket,
            result: Ok(vec![]),
        });
        assert!(!h.app.registry.refreshing());

        let generation = h.app.registry.refresh_generation();
        let ticket = h.app.upload.begin();
        h.app.apply_event(AppEvent::UploadFinished {
            ticket,
            result: Ok(UploadResponse {
                message: "File processed successfully".to_string(),
                document_id: "doc-9".to_string(),
                filename: "q3.xlsx".to_string(),
                chunks_count: 5,
                file_type: "excel".to_string(),
            }),
        });

        assert!(h.app.upload.outcome().unwrap().success);
        assert!(
            h.app.registry.refreshing(),
            "a successful upload refreshes the list"
        );
        assert_eq!(
            h.app.registry.refresh_generation(),
            generation + 1,
            "exactly one refresh begins"
        );
        assert!(h.app.upload_path.is_empty());
    }

    #[test]
    fn test_failed_upload_does_not_refresh() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-5")),
        });
        let ticket = h.app.registry.begin_refresh();
        h.app.apply_event(AppEvent::DocumentsRefreshed {
            ticket,
            result: Ok(vec![]),
        });

        let generation = h.app.registry.refresh_generation();
        let ticket = h.app.upload.begin();
        h.app.apply_event(AppEvent::UploadFinished {
            ticket,
            result: Err(Error::Api {
                status: 400,
                detail: Some("Unsupported file format".to_string()),
            }),
        });

        let outcome = h.app.upload.outcome().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Unsupported file format");
        assert!(!h.app.registry.refreshing());
        assert_eq!(h.app.registry.refresh_generation(), generation);
    }

    #[test]
    fn test_unsupported_file_is_rejected_before_any_upload_starts() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-10")),
        });

        for c in "/tmp/notes.pdf".chars() {
            h.app.upload_path.handle_key(key(KeyCode::Char(c)));
        }
        h.app.handle_key(key(KeyCode::Enter));

        assert!(
            !h.app.upload.uploading(),
            "a refused file never occupies the upload slot"
        );
        let outcome = h.app.upload.outcome().unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("notes.pdf"));
        assert!(outcome.message.contains(".xlsx, .xls, or .json"));
    }

    #[test]
    fn test_superseded_query_never_lands() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-6")),
        });

        let first = h
            .app
            .query
            .begin(QueryRequest::new("first", Language::En).unwrap());
        let second = h
            .app
            .query
            .begin(QueryRequest::new("second", Language::En).unwrap());

        h.app.apply_event(AppEvent::QueryFinished {
            ticket: second,
            result: Ok(QueryResponse {
                answer: "second answer".to_string(),
                sources: vec![],
                context_used: vec![],
            }),
        });
        h.app.apply_event(AppEvent::QueryFinished {
            ticket: first,
            result: Ok(QueryResponse {
                answer: "first answer".to_string(),
                sources: vec![],
                context_used: vec![],
            }),
        });

        let result = h.app.query.result().unwrap();
        assert_eq!(result.answer.as_deref(), Some("second answer"));
        assert_eq!(h.app.query.exportable().unwrap().query, "second");
    }

    #[test]
    fn test_empty_query_is_never_submitted() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-7")),
        });

        h.app.active_tab = Tab::Query;
        h.app.handle_key(key(KeyCode::Char(' ')));
        h.app.handle_key(key(KeyCode::Enter));
        assert!(!h.app.query.loading());
    }

    #[test]
    fn test_tab_cycling_and_language_toggle() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-8")),
        });

        assert_eq!(h.app.active_tab, Tab::Upload);
        h.app.handle_key(key(KeyCode::Tab));
        assert_eq!(h.app.active_tab, Tab::Query);
        h.app.handle_key(key(KeyCode::Tab));
        assert_eq!(h.app.active_tab, Tab::Documents);
        h.app.handle_key(key(KeyCode::Tab));
        assert_eq!(h.app.active_tab, Tab::Upload);
        h.app.handle_key(key(KeyCode::BackTab));
        assert_eq!(h.app.active_tab, Tab::Documents);

        assert_eq!(h.app.language, Language::En);
        h.app.handle_key(ctrl('l'));
        assert_eq!(h.app.language, Language::Id);
    }

    #[test]
    fn test_register_requires_name() {
        let mut h = harness();
        h.app.handle_key(ctrl('t'));
        assert_eq!(h.app.auth_mode, AuthMode::Register);
        assert_eq!(h.app.auth_focus, AuthField::Name);

        for c in "ana@example.com".chars() {
            h.app.email.handle_key(key(KeyCode::Char(c)));
        }
        for c in "secret".chars() {
            h.app.password.handle_key(key(KeyCode::Char(c)));
        }
        h.app.handle_key(key(KeyCode::Enter));

        assert!(!h.app.auth_busy, "local validation never reaches the network");
        assert_eq!(
            h.app.auth_error.as_deref(),
            Some("Name is required to register")
        );
    }

    #[test]
    fn test_auth_focus_cycles_through_mode_fields() {
        let mut h = harness();
        assert_eq!(h.app.auth_focus, AuthField::Email);
        h.app.handle_key(key(KeyCode::Tab));
        assert_eq!(h.app.auth_focus, AuthField::Password);
        h.app.handle_key(key(KeyCode::Tab));
        assert_eq!(h.app.auth_focus, AuthField::Email);
        h.app.handle_key(key(KeyCode::BackTab));
        assert_eq!(h.app.auth_focus, AuthField::Password);
    }

    #[test]
    fn test_document_selection_clamps_to_list() {
        let mut h = harness();
        h.app.apply_event(AppEvent::AuthFinished {
            result: Ok(auth_response("tok-9")),
        });

        let ticket = h.app.registry.begin_refresh();
        h.app.apply_event(AppEvent::DocumentsRefreshed {
            ticket,
            result: Ok(vec![document("doc-1", "a.xlsx"), document("doc-2", "b.json")]),
        });
        assert_eq!(h.app.document_table.selected(), Some(0));

        h.app.active_tab = Tab::Documents;
        h.app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(h.app.document_table.selected(), Some(1));
        h.app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(h.app.document_table.selected(), Some(0), "selection wraps");

        // The list shrinking under the selection pulls it back in range
        h.app.handle_key(key(KeyCode::Char('j')));
        let ticket = h.app.registry.begin_refresh();
        h.app.apply_event(AppEvent::DocumentsRefreshed {
            ticket,
            result: Ok(vec![document("doc-1", "a.xlsx")]),
        });
        assert_eq!(h.app.document_table.selected(), Some(0));
    }

    #[test]
    fn test_expand_home_rewrites_tilde_prefix() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(
            expand_home("~/reports/q1.xlsx"),
            PathBuf::from(home).join("reports/q1.xlsx")
        );
        assert_eq!(expand_home("/tmp/x.json"), PathBuf::from("/tmp/x.json"));
    }
}
