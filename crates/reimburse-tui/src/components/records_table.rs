use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use reimburse_core::view::RecordsTable;
use reimburse_core::Status;

use super::request_list::status_style;

/// Status column in the All Records layout.
const STATUS_COLUMN: usize = 5;

/// Read-only table of every record.
pub struct RecordsView {
    table: RecordsTable,
    state: TableState,
}

impl RecordsView {
    pub fn new(table: RecordsTable) -> Self {
        let mut state = TableState::default();
        if !table.rows.is_empty() {
            state.select(Some(0));
        }
        Self { table, state }
    }

    pub fn len(&self) -> usize {
        self.table.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.rows.is_empty()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.table.rows.is_empty() {
            return;
        }
        let last = self.table.rows.len() - 1;
        let current = self.state.selected().unwrap_or(0);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select(Some((current + 1).min(last))),
            KeyCode::Char('k') | KeyCode::Up => self.state.select(Some(current.saturating_sub(1))),
            KeyCode::Char('g') | KeyCode::Home => self.state.select(Some(0)),
            KeyCode::Char('G') | KeyCode::End => self.state.select(Some(last)),
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str) {
        let block = Block::default()
            .title(format!(" {} ({}) ", title, self.table.rows.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        if self.table.rows.is_empty() {
            let notice = Paragraph::new("No requests found.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(notice, area);
            return;
        }

        let header = Row::new(self.table.labels.iter().copied())
            .style(Style::default().fg(Color::Yellow).bold());
        let rows = self.table.rows.iter().map(|cells| {
            let style = cells
                .get(STATUS_COLUMN)
                .map(|s| status_style(Status::parse_str(s)))
                .unwrap_or_default();
            Row::new(cells.iter().enumerate().map(move |(i, cell)| {
                let text = Text::from(cell.as_str());
                if i == STATUS_COLUMN {
                    text.style(style)
                } else {
                    text
                }
            }))
        });
        let widths = [
            Constraint::Length(20),
            Constraint::Length(10),
            Constraint::Min(16),
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(15),
            Constraint::Length(14),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().bg(Color::DarkGray));

        let mut state = self.state.clone();
        frame.render_stateful_widget(table, area, &mut state);
    }
}
