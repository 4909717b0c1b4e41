use std::sync::{Arc, Mutex, MutexGuard};

use reimburse_core::{CellRef, Sheet};

use crate::{RecordStore, StoreError};

/// One successful cell write, as recorded by [`MemorySheet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub cell: CellRef,
    /// Header of the written column at the time of the write.
    pub column: String,
    pub value: String,
}

#[derive(Default)]
struct State {
    /// Row 0 is the header.
    grid: Vec<Vec<String>>,
    unavailable: bool,
    rejected_columns: Vec<String>,
    writes: Vec<CellWrite>,
}

/// Process-local sheet. Clones share the same grid.
///
/// Supports fault injection so callers can exercise partial writes and an
/// unreachable store.
#[derive(Clone, Default)]
pub struct MemorySheet {
    state: Arc<Mutex<State>>,
}

impl MemorySheet {
    pub fn new(sheet: Sheet) -> Self {
        let mut grid = Vec::with_capacity(sheet.rows.len() + 1);
        grid.push(sheet.header);
        grid.extend(sheet.rows);
        Self {
            state: Arc::new(Mutex::new(State {
                grid,
                ..Default::default()
            })),
        }
    }

    /// Canonical header, no data.
    pub fn blank() -> Self {
        Self::new(Sheet::blank())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a data row below the last one, as a form submission would.
    pub fn append_row(&self, row: Vec<String>) {
        self.lock().grid.push(row);
    }

    /// Insert a data row at a 0-based data position, shifting later rows down.
    pub fn insert_row(&self, position: usize, row: Vec<String>) {
        let mut state = self.lock();
        let at = (position + 1).min(state.grid.len());
        state.grid.insert(at, row);
    }

    /// Rename a header cell, as an upstream schema change would.
    pub fn rename_column(&self, from: &str, to: &str) {
        let mut state = self.lock();
        if let Some(header) = state.grid.first_mut() {
            for cell in header.iter_mut().filter(|c| c.trim() == from) {
                *cell = to.to_string();
            }
        }
    }

    /// Make every read and write fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Refuse writes to the column with this header.
    pub fn reject_writes_to(&self, column: &str) {
        self.lock().rejected_columns.push(column.to_string());
    }

    pub fn clear_faults(&self) {
        let mut state = self.lock();
        state.unavailable = false;
        state.rejected_columns.clear();
    }

    /// Every successful write so far, oldest first.
    pub fn writes(&self) -> Vec<CellWrite> {
        self.lock().writes.clone()
    }

    pub fn sheet(&self) -> Sheet {
        Sheet::from_grid(self.lock().grid.clone())
    }
}

impl RecordStore for MemorySheet {
    fn read_sheet(&self) -> Result<Sheet, StoreError> {
        let state = self.lock();
        if state.unavailable {
            return Err(StoreError::Unavailable("memory sheet offline".into()));
        }
        Ok(Sheet::from_grid(state.grid.clone()))
    }

    fn update_cell(&self, cell: CellRef, value: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(StoreError::WriteRejected("memory sheet offline".into()));
        }
        if cell.row == 0 || cell.column == 0 {
            return Err(StoreError::WriteRejected(format!(
                "cell ({}, {}) is out of range",
                cell.row, cell.column
            )));
        }
        let row = cell.row as usize - 1;
        let col = cell.column as usize - 1;
        let column = state
            .grid
            .first()
            .and_then(|h| h.get(col))
            .cloned()
            .unwrap_or_default();
        if state.rejected_columns.iter().any(|c| *c == column) {
            return Err(StoreError::WriteRejected(format!(
                "writes to {column:?} are refused"
            )));
        }

        if state.grid.len() <= row {
            state.grid.resize(row + 1, Vec::new());
        }
        let target = &mut state.grid[row];
        if target.len() <= col {
            target.resize(col + 1, String::new());
        }
        target[col] = value.to_string();
        state.writes.push(CellWrite {
            cell,
            column,
            value: value.to_string(),
        });
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reimburse_core::schema::canonical_header;

    fn row(id: &str, status: &str) -> Vec<String> {
        let mut r = vec![String::new(); canonical_header().len()];
        r[1] = id.into();
        r[6] = status.into();
        r
    }

    #[test]
    fn update_cell_is_visible_on_next_read() {
        let sheet = MemorySheet::blank();
        sheet.append_row(row("REQ-1", "Submitted"));
        sheet.update_cell(CellRef::new(2, 7), "Approved").unwrap();
        let records = sheet.read_sheet().unwrap().to_records();
        assert_eq!(records[0].status, "Approved");
        assert_eq!(sheet.writes()[0].column, "Status");
    }

    #[test]
    fn clones_share_state() {
        let a = MemorySheet::blank();
        let b = a.clone();
        a.append_row(row("REQ-1", "Submitted"));
        assert_eq!(b.read_sheet().unwrap().rows.len(), 1);
    }

    #[test]
    fn unavailable_fails_reads_and_writes() {
        let sheet = MemorySheet::blank();
        sheet.set_unavailable(true);
        assert!(matches!(sheet.read_sheet(), Err(StoreError::Unavailable(_))));
        assert!(matches!(
            sheet.update_cell(CellRef::new(2, 1), "x"),
            Err(StoreError::WriteRejected(_))
        ));
        sheet.clear_faults();
        assert!(sheet.read_sheet().is_ok());
    }

    #[test]
    fn rejected_column_refuses_only_that_column() {
        let sheet = MemorySheet::blank();
        sheet.append_row(row("REQ-1", "Submitted"));
        sheet.reject_writes_to("Changer Name");
        assert!(sheet.update_cell(CellRef::new(2, 7), "Approved").is_ok());
        assert!(sheet.update_cell(CellRef::new(2, 8), "Aisha").is_err());
        assert_eq!(sheet.writes().len(), 1);
    }

    #[test]
    fn insert_row_shifts_later_rows() {
        let sheet = MemorySheet::blank();
        sheet.append_row(row("REQ-1", "Submitted"));
        sheet.append_row(row("REQ-2", "Submitted"));
        sheet.insert_row(0, row("REQ-0", "Submitted"));
        let s = sheet.sheet();
        assert_eq!(s.positions_of("REQ-1").unwrap(), vec![1]);
        assert_eq!(s.positions_of("REQ-0").unwrap(), vec![0]);
    }

    #[test]
    fn zero_index_is_rejected() {
        let sheet = MemorySheet::blank();
        assert!(sheet.update_cell(CellRef::new(0, 1), "x").is_err());
    }
}
