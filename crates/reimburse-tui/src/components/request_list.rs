use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use reimburse_core::{Request, Status};

/// The request cards of one status page.
pub struct RequestList {
    requests: Vec<Request>,
    list_state: ListState,
}

impl RequestList {
    pub fn new(requests: Vec<Request>) -> Self {
        let mut list_state = ListState::default();
        if !requests.is_empty() {
            list_state.select(Some(0));
        }
        Self {
            requests,
            list_state,
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Returns the currently highlighted request, if any.
    pub fn selected_request(&self) -> Option<&Request> {
        let idx = self.list_state.selected()?;
        self.requests.get(idx)
    }

    /// Highlight the request with the given ID. Returns `false` and leaves
    /// the cursor alone if it is not on this page.
    pub fn select_by_id(&mut self, request_id: &str) -> bool {
        match self.requests.iter().position(|r| r.request_id == request_id) {
            Some(idx) => {
                self.list_state.select(Some(idx));
                true
            }
            None => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.requests.is_empty() {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if current + 1 < self.requests.len() {
                    self.list_state.select(Some(current + 1));
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if current > 0 {
                    self.list_state.select(Some(current - 1));
                }
            }
            // Jump to first/last
            KeyCode::Char('g') | KeyCode::Home => self.list_state.select(Some(0)),
            KeyCode::Char('G') | KeyCode::End => {
                self.list_state.select(Some(self.requests.len() - 1))
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str, empty_notice: &str) {
        let block = Block::default()
            .title(format!(" {} ({}) ", title, self.requests.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        if self.requests.is_empty() {
            let notice = Paragraph::new(empty_notice)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(notice, area);
            return;
        }

        let items: Vec<ListItem> = self.requests.iter().map(card).collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray).bold())
            .highlight_symbol("> ");

        let mut state = self.list_state.clone();
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// Two-line summary of a request; the detail popup has the rest.
fn card(request: &Request) -> ListItem<'_> {
    let first = Line::from(vec![
        Span::styled(
            format!("{:<10} ", request.request_id),
            Style::default().fg(Color::Yellow).bold(),
        ),
        Span::styled(
            format!("Rs. {:<10} ", request.amount),
            Style::default().fg(Color::Green),
        ),
        Span::raw(request.purpose.as_str()),
    ]);
    let second = Line::from(vec![
        Span::raw("  "),
        Span::styled(request.email.as_str(), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  {}  ", request.timestamp),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(request.status.as_str(), status_style(request.status())),
        Span::styled(
            format!("  by {}", request.changer_display()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    ListItem::new(vec![first, second])
}

pub fn status_style(status: Option<Status>) -> Style {
    match status {
        Some(Status::Submitted) => Style::default().fg(Color::Yellow),
        Some(Status::Approved) => Style::default().fg(Color::Green),
        Some(Status::NotApproved) => Style::default().fg(Color::Red),
        Some(Status::Paid) => Style::default().fg(Color::Blue),
        None => Style::default().fg(Color::DarkGray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn make_request(id: &str) -> Request {
        Request {
            request_id: id.to_string(),
            email: format!("{id}@example.org"),
            purpose: "Travel".into(),
            amount: "100".into(),
            timestamp: "10/01/2026 09:00:00".into(),
            status: "Submitted".into(),
            previous_status: String::new(),
            changer_name: String::new(),
            reason: String::new(),
            proof_refs: Vec::new(),
        }
    }

    fn make_list() -> RequestList {
        RequestList::new(vec![make_request("r1"), make_request("r2"), make_request("r3")])
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn starts_on_first_request() {
        let list = make_list();
        assert_eq!(list.selected_request().unwrap().request_id, "r1");
    }

    #[test]
    fn j_and_k_stop_at_the_ends() {
        let mut list = make_list();
        list.handle_key(key(KeyCode::Char('k')));
        assert_eq!(list.selected_request().unwrap().request_id, "r1");
        list.handle_key(key(KeyCode::Char('j')));
        list.handle_key(key(KeyCode::Char('j')));
        list.handle_key(key(KeyCode::Char('j')));
        assert_eq!(list.selected_request().unwrap().request_id, "r3");
    }

    #[test]
    fn g_and_shift_g_jump() {
        let mut list = make_list();
        list.handle_key(key(KeyCode::Char('G')));
        assert_eq!(list.selected_request().unwrap().request_id, "r3");
        list.handle_key(key(KeyCode::Char('g')));
        assert_eq!(list.selected_request().unwrap().request_id, "r1");
    }

    #[test]
    fn select_by_id_keeps_cursor_when_missing() {
        let mut list = make_list();
        assert!(list.select_by_id("r2"));
        assert!(!list.select_by_id("nope"));
        assert_eq!(list.selected_request().unwrap().request_id, "r2");
    }

    #[test]
    fn empty_list_has_no_selection() {
        let mut list = RequestList::new(Vec::new());
        list.handle_key(key(KeyCode::Char('G')));
        assert!(list.selected_request().is_none());
        assert!(list.is_empty());
    }
}
