use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::request::{parse_proof_refs, Request};
use crate::schema::{canonical_header, Column};

/// Physical row of the first data row: rows are 1-based and row 1 is the header.
pub const HEADER_OFFSET: u32 = 2;

/// 1-based cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub column: u32,
}

impl CellRef {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

/// Raw contents of a worksheet: the header row plus data rows of string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// A sheet with the canonical header and no data.
    pub fn blank() -> Self {
        Self::new(canonical_header(), Vec::new())
    }

    /// Build a sheet from a full grid whose first row is the header.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let header = grid.remove(0);
        Self::new(header, grid)
    }

    /// 1-based position of the column with this header.
    pub fn column_position(&self, name: &str) -> Result<u32, SchemaError> {
        self.header
            .iter()
            .position(|h| h.trim() == name)
            .map(|i| i as u32 + 1)
            .ok_or_else(|| SchemaError::ColumnNotFound(name.to_string()))
    }

    /// Cell text at a 0-based data row and header name. Missing cells read as empty.
    pub fn cell(&self, row_pos: usize, name: &str) -> &str {
        let Ok(col) = self.column_position(name) else {
            return "";
        };
        self.rows
            .get(row_pos)
            .and_then(|row| row.get(col as usize - 1))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// 0-based data positions whose Request ID cell equals `request_id`.
    pub fn positions_of(&self, request_id: &str) -> Result<Vec<usize>, SchemaError> {
        let col = self.column_position(Column::RequestId.header())? as usize - 1;
        Ok(self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.get(col).is_some_and(|v| v.trim() == request_id))
            .map(|(pos, _)| pos)
            .collect())
    }

    pub fn row_index(position: usize) -> u32 {
        position as u32 + HEADER_OFFSET
    }

    pub fn to_records(&self) -> Vec<Request> {
        (0..self.rows.len())
            .map(|pos| {
                let get = |c: Column| self.cell(pos, c.header()).to_string();
                Request {
                    request_id: get(Column::RequestId).trim().to_string(),
                    email: get(Column::Email),
                    purpose: get(Column::Purpose),
                    amount: get(Column::Amount),
                    timestamp: get(Column::Timestamp),
                    status: get(Column::Status).trim().to_string(),
                    previous_status: get(Column::PreviousStatus),
                    changer_name: get(Column::ChangerName),
                    reason: get(Column::Reason),
                    proof_refs: parse_proof_refs(self.cell(pos, Column::Receipts.header())),
                }
            })
            .collect()
    }
}

/// The in-memory copy of every record as of the last load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    columns: Vec<String>,
    records: Vec<Request>,
}

impl Snapshot {
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let columns = if sheet.header.iter().all(|h| h.trim().is_empty()) {
            canonical_header()
        } else {
            sheet.header.clone()
        };
        Self {
            columns,
            records: sheet.to_records(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Request] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, request_id: &str) -> Option<&Request> {
        self.records.iter().find(|r| r.request_id == request_id)
    }

    pub fn position_of(&self, request_id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.request_id == request_id)
    }

    /// Physical row of a record as of this snapshot. Only valid against the
    /// store contents this snapshot was read from.
    pub fn row_index_of(&self, request_id: &str) -> Option<u32> {
        self.position_of(request_id).map(Sheet::row_index)
    }
}
