//! UI rendering.
//!
//! Pure projection of [`App`] state onto the frame; nothing in here mutates
//! state beyond the table selection ratatui tracks for us.

use chrono::{DateTime, Utc};
use docsage_core::QueryResult;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, AuthField, AuthMode, Screen, Tab};
use crate::input::InputField;

// ========== Colors ==========

/// Accent for titles and the active tab
const ACCENT: Color = Color::Cyan;
/// Border for text inputs
const BORDER_INPUT: Color = Color::Rgb(0, 150, 150);
/// Border for the answer panel
const BORDER_ANSWER: Color = Color::Rgb(80, 160, 80);
/// Border for the documents panel
const BORDER_DOCUMENTS: Color = Color::Rgb(180, 100, 180);
/// Success messages
const OK_COLOR: Color = Color::Green;
/// Failure messages
const ERR_COLOR: Color = Color::Red;
/// Labels
const LABEL_COLOR: Color = Color::Rgb(100, 180, 180);
/// Key hints in footers
const KEY_COLOR: Color = Color::Yellow;
/// Secondary text
const DIM: Color = Color::DarkGray;

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    match app.screen() {
        Screen::Auth => render_auth(frame, app),
        Screen::Dashboard => render_dashboard(frame, app),
    }
}

// ========== Auth screen ==========

fn render_auth(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(2), // Title
        Constraint::Min(10),   // Form
        Constraint::Length(1), // Footer
    ])
    .split(frame.area());

    let title = Paragraph::new(" docsage")
        .style(Style::default().fg(ACCENT).bold())
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, chunks[0]);

    render_auth_form(frame, app, chunks[1]);
    render_auth_footer(frame, app, chunks[2]);
}

fn render_auth_form(frame: &mut Frame, app: &App, area: Rect) {
    let fields: Vec<(&str, &InputField, AuthField, bool)> = match app.auth_mode {
        AuthMode::Login => vec![
            ("Email", &app.email, AuthField::Email, false),
            ("Password", &app.password, AuthField::Password, true),
        ],
        AuthMode::Register => vec![
            ("Name", &app.display_name, AuthField::Name, false),
            ("Email", &app.email, AuthField::Email, false),
            ("Password", &app.password, AuthField::Password, true),
        ],
    };

    // Fields plus a status line, in a centered card
    let card = center(area, 52, fields.len() as u16 * 3 + 4);

    let mode_title = match app.auth_mode {
        AuthMode::Login => " Sign in ",
        AuthMode::Register => " Create account ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT))
        .title(mode_title)
        .title_style(Style::default().fg(ACCENT).bold());
    let inner = block.inner(card);
    frame.render_widget(block, card);

    let mut constraints: Vec<Constraint> =
        fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(1)); // gap
    constraints.push(Constraint::Length(1)); // status
    let rows = Layout::vertical(constraints).split(inner);

    for (i, (title, field, id, masked)) in fields.iter().enumerate() {
        let focused = app.auth_focus == *id && !app.auth_busy;
        render_input(frame, field, title, focused, *masked, rows[i]);
    }

    let status = if app.auth_busy {
        let text = match app.auth_mode {
            AuthMode::Login => "Signing in...",
            AuthMode::Register => "Creating account...",
        };
        Line::from(Span::styled(text, Style::default().fg(DIM)))
    } else if let Some(error) = &app.auth_error {
        Line::from(Span::styled(error.clone(), Style::default().fg(ERR_COLOR)))
    } else {
        Line::raw("")
    };
    frame.render_widget(Paragraph::new(status), rows[fields.len() + 1]);
}

fn render_auth_footer(frame: &mut Frame, app: &App, area: Rect) {
    let toggle_hint = match app.auth_mode {
        AuthMode::Login => " register instead  ",
        AuthMode::Register => " sign in instead  ",
    };
    let mut spans = vec![
        Span::styled(" Enter", Style::default().fg(KEY_COLOR)),
        Span::raw(" submit  "),
        Span::styled("Tab", Style::default().fg(KEY_COLOR)),
        Span::raw(" next field  "),
        Span::styled("Ctrl+T", Style::default().fg(KEY_COLOR)),
        Span::raw(toggle_hint),
        Span::styled("Ctrl+L", Style::default().fg(KEY_COLOR)),
        Span::raw(format!(" {}  ", app.language.label())),
        Span::styled("Ctrl+C", Style::default().fg(KEY_COLOR)),
        Span::raw(" quit  | "),
    ];
    spans.push(backend_status_span(app));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ========== Dashboard ==========

fn render_dashboard(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::vertical([
        Constraint::Length(2), // Tab header
        Constraint::Min(8),    // Active panel
        Constraint::Length(1), // Footer
    ])
    .split(frame.area());

    render_tab_header(frame, app, chunks[0]);
    match app.active_tab {
        Tab::Upload => render_upload_panel(frame, app, chunks[1]),
        Tab::Query => render_query_panel(frame, app, chunks[1]),
        Tab::Documents => render_documents_panel(frame, app, chunks[1]),
    }
    render_dashboard_footer(frame, app, chunks[2]);
}

fn render_tab_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::horizontal([
        Constraint::Length(10), // App name
        Constraint::Min(1),     // Tabs
    ])
    .split(area);

    let app_name = Paragraph::new(" docsage")
        .style(Style::default().fg(ACCENT).bold())
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(app_name, chunks[0]);

    let mut spans = Vec::new();
    for tab in [Tab::Upload, Tab::Query, Tab::Documents] {
        let style = if tab == app.active_tab {
            Style::default()
                .fg(ACCENT)
                .bold()
                .add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().fg(DIM)
        };
        spans.push(Span::styled(format!(" {} ", tab.title()), style));
        spans.push(Span::raw(" "));
    }
    let tabs =
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(tabs, chunks[1]);
}

// ========== Upload panel ==========

fn render_upload_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Path input
        Constraint::Length(3), // Status
        Constraint::Min(1),    // Help
    ])
    .split(area);

    render_input(frame, &app.upload_path, "File to upload", true, false, chunks[0]);

    let mut status: Vec<Line> = Vec::new();
    if app.upload.uploading() {
        status.push(Line::from(Span::styled(
            "Uploading...",
            Style::default().fg(DIM),
        )));
    } else if let Some(outcome) = app.upload.outcome() {
        let color = if outcome.success { OK_COLOR } else { ERR_COLOR };
        status.push(Line::from(Span::styled(
            outcome.message.clone(),
            Style::default().fg(color),
        )));
        if let (Some(filename), Some(chunks_count)) = (&outcome.filename, outcome.chunks_count) {
            status.push(Line::from(Span::styled(
                format!("{} ({} chunks indexed)", filename, chunks_count),
                Style::default().fg(DIM),
            )));
        }
    }
    frame.render_widget(Paragraph::new(status), chunks[1]);

    let help = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Accepted: ", Style::default().fg(LABEL_COLOR)),
            Span::styled(".xlsx, .xls, .json", Style::default().fg(DIM)),
        ]),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(KEY_COLOR)),
            Span::styled(
                " uploads the file at the path above",
                Style::default().fg(DIM),
            ),
        ]),
    ]);
    frame.render_widget(help, chunks[2]);
}

// ========== Query panel ==========

fn render_query_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Question input
        Constraint::Min(5),    // Answer
        Constraint::Length(2), // Export status
    ])
    .split(area);

    render_input(frame, &app.question, "Question", true, false, chunks[0]);
    render_answer(frame, app, chunks[1]);
    render_export_status(frame, app, chunks[2]);
}

fn render_answer(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if app.query.loading() {
        let question = app
            .query
            .in_flight_request()
            .map(|r| r.query.as_str())
            .unwrap_or("");
        lines.push(Line::from(vec![
            Span::styled("Thinking about ", Style::default().fg(DIM)),
            Span::raw(format!("\"{}\"", question)),
            Span::styled("...", Style::default().fg(DIM)),
        ]));
    } else if let Some(result) = app.query.result() {
        if result.error {
            let message = result.message.as_deref().unwrap_or("");
            lines.push(Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(ERR_COLOR),
            )));
        } else {
            lines.extend(result_lines(result));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "Ask a question about your uploaded documents.",
            Style::default().fg(DIM),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_ANSWER))
                .title(" Answer ")
                .title_style(Style::default().fg(BORDER_ANSWER).bold()),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Lines for a non-error result: the answer, the sources it was attributed
/// to, and how many retrieved passages the backend worked from.
fn result_lines(result: &QueryResult) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(answer) = &result.answer {
        for line in answer.lines() {
            lines.push(Line::raw(line.to_string()));
        }
    }
    if !result.sources.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            "Sources",
            Style::default().fg(LABEL_COLOR).bold(),
        )));
        for source in &result.sources {
            lines.push(Line::from(vec![
                Span::styled("  - ", Style::default().fg(DIM)),
                Span::raw(source.clone()),
            ]));
        }
    }
    if !result.context_used.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            format!("{} context passages used", result.context_used.len()),
            Style::default().fg(DIM),
        )));
    }

    lines
}

fn render_export_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if app.exporter.exporting() {
        lines.push(Line::from(Span::styled(
            "Exporting report...",
            Style::default().fg(DIM),
        )));
    } else if let Some(outcome) = app.exporter.outcome() {
        let color = if outcome.success { OK_COLOR } else { ERR_COLOR };
        lines.push(Line::from(Span::styled(
            outcome.message.clone(),
            Style::default().fg(color),
        )));
    } else if app.query.exportable().is_some() {
        lines.push(Line::from(vec![
            Span::styled("Ctrl+E", Style::default().fg(KEY_COLOR)),
            Span::styled(
                " export this answer as a spreadsheet report",
                Style::default().fg(DIM),
            ),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

// ========== Documents panel ==========

fn render_documents_panel(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Min(5),    // Table
        Constraint::Length(2), // Status
    ])
    .split(area);

    render_documents_table(frame, app, chunks[0]);
    render_documents_status(frame, app, chunks[1]);
}

fn render_documents_table(frame: &mut Frame, app: &mut App, area: Rect) {
    if app.registry.documents().is_empty() {
        let message = if app.registry.refreshing() {
            "Loading documents..."
        } else {
            "No documents yet. Upload a spreadsheet or JSON file to get started."
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(DIM))
            .block(documents_block());
        frame.render_widget(empty, area);
        return;
    }

    let header_cells = ["Filename", "Type", "Chunks", "Processed", "Uploaded"]
        .into_iter()
        .map(|h| Cell::from(h).style(Style::default().fg(KEY_COLOR).bold()));
    let header = Row::new(header_cells).height(1);

    let rows = app.registry.documents().iter().map(|doc| {
        let (processed, processed_style) = if doc.processed {
            ("yes", Style::default().fg(OK_COLOR))
        } else {
            ("pending", Style::default().fg(KEY_COLOR))
        };

        Row::new([
            Cell::from(doc.filename.as_str()),
            Cell::from(doc.file_type.as_str()),
            Cell::from(doc.chunks_count.to_string()),
            Cell::from(processed).style(processed_style),
            Cell::from(format_relative_time(doc.uploaded_at)),
        ])
    });

    let widths = [
        Constraint::Fill(1),    // Filename
        Constraint::Length(8),  // Type
        Constraint::Length(8),  // Chunks
        Constraint::Length(10), // Processed
        Constraint::Length(12), // Uploaded
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(documents_block())
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED).fg(ACCENT))
        .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut app.document_table);
}

fn documents_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DOCUMENTS))
        .title(" Documents ")
        .title_style(Style::default().fg(BORDER_DOCUMENTS).bold())
}

fn render_documents_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(status) = app.registry.last_refresh() {
        if let Some(error) = &status.error {
            lines.push(Line::from(vec![
                Span::styled(error.clone(), Style::default().fg(ERR_COLOR)),
                Span::styled(" (showing last known list)", Style::default().fg(DIM)),
            ]));
        }
    }
    if app.registry.deleting() {
        lines.push(Line::from(Span::styled(
            "Deleting...",
            Style::default().fg(DIM),
        )));
    } else if let Some(outcome) = app.registry.delete_outcome() {
        let color = if outcome.success { OK_COLOR } else { ERR_COLOR };
        lines.push(Line::from(Span::styled(
            outcome.message.clone(),
            Style::default().fg(color),
        )));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

// ========== Footer ==========

fn render_dashboard_footer(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Tab", Style::default().fg(KEY_COLOR)),
        Span::raw(" switch panel  "),
    ];

    match app.active_tab {
        Tab::Upload | Tab::Query => {
            spans.push(Span::styled("Enter", Style::default().fg(KEY_COLOR)));
            spans.push(Span::raw(" submit  "));
        }
        Tab::Documents => {
            spans.push(Span::styled("j/k", Style::default().fg(KEY_COLOR)));
            spans.push(Span::raw(" move  "));
            spans.push(Span::styled("r", Style::default().fg(KEY_COLOR)));
            spans.push(Span::raw(" refresh  "));
            spans.push(Span::styled("d", Style::default().fg(KEY_COLOR)));
            spans.push(Span::raw(" delete  "));
        }
    }

    spans.push(Span::styled("Ctrl+L", Style::default().fg(KEY_COLOR)));
    spans.push(Span::raw(format!(" {}  ", app.language.label())));
    spans.push(Span::styled("Ctrl+D", Style::default().fg(KEY_COLOR)));
    spans.push(Span::raw(" sign out  "));
    spans.push(Span::styled("Ctrl+C", Style::default().fg(KEY_COLOR)));
    spans.push(Span::raw(" quit  | "));

    match app.user() {
        Some(user) => spans.push(Span::styled(user.email, Style::default().fg(DIM))),
        None => spans.push(Span::styled("restored session", Style::default().fg(DIM))),
    }
    spans.push(backend_status_span(app));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn backend_status_span(app: &App) -> Span<'static> {
    match app.backend_online {
        Some(true) => Span::styled("  backend online", Style::default().fg(OK_COLOR)),
        Some(false) => Span::styled("  backend unreachable", Style::default().fg(ERR_COLOR)),
        None => Span::styled("  checking backend...", Style::default().fg(DIM)),
    }
}

// ========== Shared pieces ==========

/// Draw a bordered single-line input, scrolled so the cursor stays visible,
/// and place the terminal cursor when the field has focus.
fn render_input(
    frame: &mut Frame,
    field: &InputField,
    title: &str,
    focused: bool,
    masked: bool,
    area: Rect,
) {
    let raw: String = if masked {
        "•".repeat(field.value().chars().count())
    } else {
        field.value().to_string()
    };

    let inner_width = area.width.saturating_sub(2) as usize;
    let window_start = field
        .cursor()
        .saturating_sub(inner_width.saturating_sub(1));
    let display: String = raw.chars().skip(window_start).take(inner_width).collect();

    let border_style = if focused {
        Style::default().fg(BORDER_INPUT)
    } else {
        Style::default().fg(DIM)
    };

    let input = Paragraph::new(display).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title(format!(" {} ", title)),
    );
    frame.render_widget(input, area);

    if focused {
        let cursor_x = (field.cursor() - window_start) as u16;
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }
}

/// Center a fixed-size rect inside `area`, clamped to it.
fn center(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width - w) / 2;
    let y = area.y + (area.height - h) / 2;
    Rect::new(x, y, w, h)
}

/// Format a timestamp as a relative age.
fn format_relative_time(ts: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}
