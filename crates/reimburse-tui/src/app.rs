use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap};
use reimburse_core::transition::{allowed_transitions, offers_update, requires_reason};
use reimburse_core::view::{self, Page};
use reimburse_core::{Request, Status};
use reimburse_service::{DashboardEvent, SessionState, SyncController};
use reimburse_store::RecordStore;
use tracing::debug;

use crate::components::records_table::RecordsView;
use crate::components::request_list::{status_style, RequestList};

/// What the app is currently doing
#[derive(Debug, Clone)]
pub enum Mode {
    /// Browsing the current page
    Normal,
    /// Viewing one request card
    Detail { request_id: String },
    /// Filling in a status change
    UpdateForm(UpdateForm),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Status,
    Name,
    Reason,
}

/// The status update form for one request.
#[derive(Debug, Clone)]
pub struct UpdateForm {
    pub request_id: String,
    pub current: String,
    pub choices: Vec<Status>,
    pub choice: usize,
    pub name: String,
    pub reason: String,
    pub field: FormField,
}

impl UpdateForm {
    fn new(request: &Request) -> Self {
        Self {
            request_id: request.request_id.clone(),
            current: request.status.clone(),
            choices: allowed_transitions(request.status()).to_vec(),
            choice: 0,
            name: String::new(),
            reason: String::new(),
            field: FormField::Status,
        }
    }

    /// The destination status currently chosen.
    pub fn target(&self) -> Option<Status> {
        self.choices.get(self.choice).copied()
    }

    pub fn needs_reason(&self) -> bool {
        self.target().is_some_and(requires_reason)
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Status => FormField::Name,
            FormField::Name if self.needs_reason() => FormField::Reason,
            FormField::Name | FormField::Reason => FormField::Status,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Status if self.needs_reason() => FormField::Reason,
            FormField::Status => FormField::Name,
            FormField::Name => FormField::Status,
            FormField::Reason => FormField::Name,
        };
    }

    fn cycle_choice(&mut self, forward: bool) {
        if self.choices.is_empty() {
            return;
        }
        let len = self.choices.len();
        self.choice = if forward {
            (self.choice + 1) % len
        } else {
            (self.choice + len - 1) % len
        };
    }

    fn input_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Status => None,
            FormField::Name => Some(&mut self.name),
            FormField::Reason => Some(&mut self.reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Info(String),
    Error(String),
}

impl StatusMessage {
    pub fn text(&self) -> &str {
        match self {
            StatusMessage::Info(s) | StatusMessage::Error(s) => s,
        }
    }
}

enum PageView {
    Requests(RequestList),
    Records(RecordsView),
}

pub struct App {
    controller: SyncController<Box<dyn RecordStore>>,
    session: SessionState,
    store_label: String,
    page: Page,
    view: PageView,
    mode: Mode,
    status_message: Option<StatusMessage>,
}

impl App {
    /// Load the sheet and open on the Submitted page.
    pub fn new(store: Box<dyn RecordStore>) -> Result<Self> {
        let store_label = store.describe();
        let mut controller = SyncController::new(store);
        let session = controller
            .open_session()
            .with_context(|| format!("failed to load requests from {store_label}"))?;
        controller.drain_events();

        let page = Page::Submitted;
        let view = Self::build_view(&session, page);
        Ok(Self {
            controller,
            session,
            store_label,
            page,
            view,
            mode: Mode::Normal,
            status_message: None,
        })
    }

    fn build_view(session: &SessionState, page: Page) -> PageView {
        match page.filter() {
            Some(status) => {
                let requests = view::project(session.snapshot(), Some(status))
                    .into_iter()
                    .cloned()
                    .collect();
                PageView::Requests(RequestList::new(requests))
            }
            None => PageView::Records(RecordsView::new(view::all_records(session.snapshot()))),
        }
    }

    /// Rebuild the current page from the session snapshot, keeping the cursor
    /// on the same request when it is still listed.
    fn rebuild_view(&mut self) {
        let selected = self.selected_request().map(|r| r.request_id.clone());
        self.view = Self::build_view(&self.session, self.page);
        if let (Some(id), PageView::Requests(list)) = (selected, &mut self.view) {
            list.select_by_id(&id);
        }
    }

    fn switch_page(&mut self, page: Page) {
        if page != self.page {
            debug!(page = %page, "switching page");
            self.page = page;
            self.view = Self::build_view(&self.session, page);
        }
    }

    fn refresh(&mut self) {
        match self.controller.refresh(&mut self.session) {
            Ok(()) => {
                self.rebuild_view();
                self.status_message = Some(StatusMessage::Info(format!(
                    "Reloaded {} requests",
                    self.session.snapshot().len()
                )));
            }
            Err(e) => self.status_message = Some(StatusMessage::Error(format!("Error: {e}"))),
        }
        self.controller.drain_events();
    }

    /// Turn controller events into what the user sees.
    fn absorb_events(&mut self) {
        for event in self.controller.drain_events() {
            match event {
                DashboardEvent::SnapshotRefreshed { .. } => self.rebuild_view(),
                DashboardEvent::TransitionSucceeded(receipt) => {
                    let mut text = receipt.message();
                    if self.session.is_stale() {
                        text.push_str(" (reload failed, press r to refresh)");
                    }
                    self.status_message = Some(StatusMessage::Info(text));
                }
                DashboardEvent::TransitionFailed { message, .. } => {
                    let mut text = format!("Error: {message}");
                    if self.session.is_stale() {
                        text.push_str(" (press r to refresh)");
                    }
                    self.status_message = Some(StatusMessage::Error(text));
                }
            }
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn status_message(&self) -> Option<&StatusMessage> {
        self.status_message.as_ref()
    }

    /// Number of rows on the current page.
    pub fn visible_count(&self) -> usize {
        match &self.view {
            PageView::Requests(list) => list.len(),
            PageView::Records(table) => table.len(),
        }
    }

    pub fn selected_request(&self) -> Option<&Request> {
        match &self.view {
            PageView::Requests(list) => list.selected_request(),
            PageView::Records(_) => None,
        }
    }

    pub fn is_input_mode(&self) -> bool {
        matches!(self.mode, Mode::UpdateForm(_))
    }

    /// A popup is open that `q` should close instead of quitting.
    pub fn is_overlay_open(&self) -> bool {
        !matches!(self.mode, Mode::Normal)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status_message = None;

        match &self.mode.clone() {
            Mode::Normal => self.handle_normal(key),
            Mode::Detail { request_id } => self.handle_detail(key, request_id.clone()),
            Mode::UpdateForm(form) => self.handle_form(key, form.clone()),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Char(']') | KeyCode::Char('l') | KeyCode::Right => {
                self.switch_page(self.page.next())
            }
            KeyCode::BackTab | KeyCode::Char('[') | KeyCode::Char('h') | KeyCode::Left => {
                self.switch_page(self.page.prev())
            }
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                if let Some(&page) = Page::ALL.get(idx) {
                    self.switch_page(page);
                }
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Enter => {
                if let Some(request_id) = self.selected_request().map(|r| r.request_id.clone()) {
                    self.mode = Mode::Detail { request_id };
                }
            }
            KeyCode::Char('u') => {
                if let Some(id) = self.selected_request().map(|r| r.request_id.clone()) {
                    self.open_form(&id);
                }
            }
            _ => match &mut self.view {
                PageView::Requests(list) => list.handle_key(key),
                PageView::Records(table) => table.handle_key(key),
            },
        }
    }

    fn handle_detail(&mut self, key: KeyEvent, request_id: String) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.mode = Mode::Normal,
            KeyCode::Char('u') | KeyCode::Enter => self.open_form(&request_id),
            _ => {}
        }
    }

    fn open_form(&mut self, request_id: &str) {
        if !self.session.select(request_id) {
            let status = self
                .session
                .snapshot()
                .get(request_id)
                .map(|r| r.status.clone())
                .unwrap_or_default();
            self.status_message = Some(StatusMessage::Error(format!(
                "No status update is available for {status} request {request_id}"
            )));
            return;
        }
        match self.session.selected_record() {
            Some(record) => self.mode = Mode::UpdateForm(UpdateForm::new(record)),
            None => self.session.cancel_edit(),
        }
    }

    fn cancel_form(&mut self) {
        self.session.cancel_edit();
        self.mode = Mode::Normal;
    }

    fn handle_form(&mut self, key: KeyEvent, mut form: UpdateForm) {
        match key.code {
            KeyCode::Esc => {
                self.cancel_form();
                return;
            }
            KeyCode::Enter => {
                self.submit(form);
                return;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Left if form.field == FormField::Status => form.cycle_choice(false),
            KeyCode::Right | KeyCode::Char(' ') if form.field == FormField::Status => {
                form.cycle_choice(true)
            }
            KeyCode::Backspace => {
                if let Some(input) = form.input_mut() {
                    input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(input) = form.input_mut() {
                    input.push(c);
                }
            }
            _ => {}
        }
        // Leaving Not Approved hides the reason field.
        if form.field == FormField::Reason && !form.needs_reason() {
            form.field = FormField::Name;
        }
        self.mode = Mode::UpdateForm(form);
    }

    fn submit(&mut self, form: UpdateForm) {
        let Some(target) = form.target() else {
            self.cancel_form();
            return;
        };

        let pending = match self.controller.validate(
            &self.session,
            &form.request_id,
            target,
            &form.name,
            &form.reason,
        ) {
            Ok(pending) => pending,
            Err(_) => {
                // Stay in the form so the reviewer can correct it.
                self.absorb_events();
                self.mode = Mode::UpdateForm(form);
                return;
            }
        };

        match self.controller.apply_transition(&mut self.session, pending) {
            Ok(_) => self.mode = Mode::Normal,
            Err(e) if e.is_partial() => self.cancel_form(),
            // Nothing was written; keep the form for a retry.
            Err(_) => self.mode = Mode::UpdateForm(form),
        }
        self.absorb_events();
    }

    // ---- Rendering ----

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_title_bar(frame, layout[0]);
        self.render_tabs(frame, layout[1]);
        self.render_page(frame, layout[2]);
        self.render_status_bar(frame, layout[3]);

        // Overlays
        match &self.mode {
            Mode::Normal => {}
            Mode::Detail { request_id } => {
                if let Some(request) = self.session.snapshot().get(request_id) {
                    self.render_detail(frame, request, area);
                }
            }
            Mode::UpdateForm(form) => self.render_form(frame, form, area),
        }
    }

    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(" reimburse ", Style::default().bold().fg(Color::Cyan)),
            Span::raw("| "),
            Span::styled(&self.store_label, Style::default().fg(Color::Yellow)),
            Span::styled(
                format!(" ({} requests)", self.session.snapshot().len()),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if self.session.is_stale() {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                "sheet changed, press r to reload",
                Style::default().fg(Color::Magenta).bold(),
            ));
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<String> = Page::ALL
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{} {}", i + 1, p.title()))
            .collect();
        let selected = Page::ALL.iter().position(|p| *p == self.page).unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .highlight_style(Style::default().fg(Color::Cyan).bold())
            .divider("|");
        frame.render_widget(tabs, area);
    }

    fn render_page(&self, frame: &mut Frame, area: Rect) {
        if self.session.snapshot().is_empty() {
            let block = Block::default()
                .title(format!(" {} ", self.page.title()))
                .borders(Borders::ALL);
            let notice = Paragraph::new("The sheet has no requests yet.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(notice, area);
            return;
        }
        match &self.view {
            PageView::Requests(list) => {
                list.render(frame, area, self.page.title(), &self.page.empty_notice())
            }
            PageView::Records(table) => table.render(frame, area, self.page.title()),
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if let Some(ref msg) = self.status_message {
            let color = match msg {
                StatusMessage::Info(_) => Color::Green,
                StatusMessage::Error(_) => Color::Red,
            };
            let line = Line::from(Span::styled(
                format!(" {}", msg.text()),
                Style::default().fg(color),
            ));
            frame.render_widget(line, area);
            return;
        }

        let hints = match &self.mode {
            Mode::Normal if self.page == Page::AllRecords => vec![
                ("q", "quit"),
                ("Tab/1-5", "pages"),
                ("j/k", "rows"),
                ("r", "reload"),
            ],
            Mode::Normal => vec![
                ("q", "quit"),
                ("Tab/1-5", "pages"),
                ("j/k", "requests"),
                ("Enter", "detail"),
                ("u", "update"),
                ("r", "reload"),
            ],
            Mode::Detail { .. } => vec![("u", "update"), ("Esc", "back")],
            Mode::UpdateForm(_) => vec![
                ("Tab", "next field"),
                ("←/→", "status"),
                ("Enter", "submit"),
                ("Esc", "cancel"),
            ],
        };

        let spans: Vec<Span> = hints
            .into_iter()
            .flat_map(|(key, desc)| {
                vec![
                    Span::styled(format!(" {key}"), Style::default().fg(Color::Yellow).bold()),
                    Span::raw(format!(" {desc} ")),
                ]
            })
            .collect();

        frame.render_widget(Line::from(spans), area);
    }

    fn render_detail(&self, frame: &mut Frame, request: &Request, area: Rect) {
        let popup = centered_rect(60, 60, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(format!(" Request {} ", request.request_id))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let field = |label: &'static str, value: String| {
            Line::from(vec![
                Span::styled(format!("{label}: "), Style::default().bold()),
                Span::raw(value),
            ])
        };
        let mut lines = vec![
            field("Request ID", request.request_id.clone()),
            field("Email Address", request.email.clone()),
            field("Purpose of Request", request.purpose.clone()),
            field("Amount", format!("Rs. {}", request.amount)),
            field("Timestamp", request.timestamp.clone()),
            Line::from(vec![
                Span::styled("Status: ", Style::default().bold()),
                Span::styled(request.status.clone(), status_style(request.status())),
            ]),
            field("Changer Name", request.changer_display().to_string()),
        ];
        if !request.reason.trim().is_empty() {
            lines.push(field("Reason", request.reason.clone()));
        }
        lines.push(Line::from(""));
        lines.push(field("Attached proof", request.proof_links()));

        if !offers_update(request.status()) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "No further status changes for this request.",
                Style::default().fg(Color::DarkGray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, inner);
    }

    fn render_form(&self, frame: &mut Frame, form: &UpdateForm, area: Rect) {
        let popup = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(format!(" Update {} ", form.request_id))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let focus = |field: FormField| {
            if form.field == field {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            }
        };

        let target = form.target().map(|s| s.as_str()).unwrap_or("-");
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Current status: ", Style::default().bold()),
                Span::raw(form.current.as_str()),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("New status:     ", Style::default().bold()),
                Span::styled(format!("< {target} >"), focus(FormField::Status)),
            ]),
            Line::from(vec![
                Span::styled("Your name:      ", Style::default().bold()),
                Span::styled(format!("{}_", form.name), focus(FormField::Name)),
            ]),
        ];
        if form.needs_reason() {
            lines.push(Line::from(vec![
                Span::styled("Reason:         ", Style::default().bold()),
                Span::styled(format!("{}_", form.reason), focus(FormField::Reason)),
            ]));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, inner);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
