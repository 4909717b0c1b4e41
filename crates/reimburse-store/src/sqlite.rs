use std::path::Path;
use std::sync::{Arc, Mutex};

use reimburse_core::schema::canonical_header;
use reimburse_core::{CellRef, Sheet};
use rusqlite::{params, Connection, OptionalExtension};

use crate::{RecordStore, StoreError};

/// A worksheet kept in a local SQLite file.
///
/// Each physical row is one table row keyed by its 1-based row number, with
/// the cells stored as a JSON array. Row 1 is the header.
#[derive(Clone)]
pub struct SqliteSheet {
    conn: Arc<Mutex<Connection>>,
    label: String,
}

impl SqliteSheet {
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(unavailable)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )
        .map_err(unavailable)?;
        let sheet = Self {
            conn: Arc::new(Mutex::new(conn)),
            label: format!("sqlite:{}", path.display()),
        };
        sheet.migrate()?;
        Ok(sheet)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        let sheet = Self {
            conn: Arc::new(Mutex::new(conn)),
            label: "sqlite::memory:".into(),
        };
        sheet.migrate()?;
        Ok(sheet)
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        f(&mut conn)
    }

    /// Create the table and seed the canonical header into a new file.
    fn migrate(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS sheet_rows (
                    row_index INTEGER PRIMARY KEY,
                    cells     TEXT NOT NULL
                 );",
            )
            .map_err(unavailable)?;
            let header = encode(&canonical_header())?;
            conn.execute(
                "INSERT OR IGNORE INTO sheet_rows (row_index, cells) VALUES (1, ?1)",
                params![header],
            )
            .map_err(unavailable)?;
            Ok(())
        })
    }

    /// Append a data row below the last physical row.
    pub fn append_row(&self, row: Vec<String>) -> Result<(), StoreError> {
        let cells = encode(&row)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sheet_rows (row_index, cells)
                 SELECT COALESCE(MAX(row_index), 0) + 1, ?1 FROM sheet_rows",
                params![cells],
            )
            .map_err(rejected)?;
            Ok(())
        })
    }
}

impl RecordStore for SqliteSheet {
    fn read_sheet(&self) -> Result<Sheet, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT row_index, cells FROM sheet_rows ORDER BY row_index")
                .map_err(unavailable)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
                .map_err(unavailable)?;

            let mut grid: Vec<Vec<String>> = Vec::new();
            for row in rows {
                let (index, cells) = row.map_err(unavailable)?;
                let index = usize::try_from(index)
                    .ok()
                    .filter(|i| *i >= 1)
                    .ok_or_else(|| StoreError::Unavailable(format!("bad row index {index}")))?;
                // Gaps are blank physical rows; keep them so positions stay aligned.
                while grid.len() + 1 < index {
                    grid.push(Vec::new());
                }
                let cells: Vec<String> = serde_json::from_str(&cells)
                    .map_err(|e| StoreError::Unavailable(format!("row {index}: {e}")))?;
                grid.push(cells);
            }
            Ok(Sheet::from_grid(grid))
        })
    }

    fn update_cell(&self, cell: CellRef, value: &str) -> Result<(), StoreError> {
        if cell.row == 0 || cell.column == 0 {
            return Err(StoreError::WriteRejected(format!(
                "cell ({}, {}) is out of range",
                cell.row, cell.column
            )));
        }
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(rejected)?;
            let existing: Option<String> = tx
                .query_row(
                    "SELECT cells FROM sheet_rows WHERE row_index = ?1",
                    params![cell.row],
                    |row| row.get(0),
                )
                .optional()
                .map_err(rejected)?;
            let mut cells: Vec<String> = match existing {
                Some(json) => serde_json::from_str(&json)
                    .map_err(|e| StoreError::WriteRejected(format!("row {}: {e}", cell.row)))?,
                None => Vec::new(),
            };
            let col = cell.column as usize - 1;
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value.to_string();
            tx.execute(
                "INSERT INTO sheet_rows (row_index, cells) VALUES (?1, ?2)
                 ON CONFLICT(row_index) DO UPDATE SET cells = excluded.cells",
                params![cell.row, encode(&cells)?],
            )
            .map_err(rejected)?;
            tx.commit().map_err(rejected)?;
            Ok(())
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

fn encode(cells: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(cells).map_err(|e| StoreError::WriteRejected(e.to_string()))
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn rejected(e: rusqlite::Error) -> StoreError {
    StoreError::WriteRejected(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_row(id: &str, status: &str) -> Vec<String> {
        let mut r = vec![String::new(); canonical_header().len()];
        r[1] = id.into();
        r[6] = status.into();
        r
    }

    #[test]
    fn new_sheet_has_header_and_no_rows() {
        let sheet = SqliteSheet::open_in_memory().unwrap();
        let s = sheet.read_sheet().unwrap();
        assert_eq!(s.header, canonical_header());
        assert!(s.rows.is_empty());
    }

    #[test]
    fn append_then_update_round_trips() {
        let sheet = SqliteSheet::open_in_memory().unwrap();
        sheet.append_row(data_row("REQ-1", "Submitted")).unwrap();
        sheet.append_row(data_row("REQ-2", "Submitted")).unwrap();
        sheet.update_cell(CellRef::new(3, 7), "Approved").unwrap();

        let snapshot = sheet.load_all().unwrap();
        assert_eq!(snapshot.get("REQ-1").unwrap().status, "Submitted");
        assert_eq!(snapshot.get("REQ-2").unwrap().status, "Approved");
    }

    #[test]
    fn update_past_row_end_pads_cells() {
        let sheet = SqliteSheet::open_in_memory().unwrap();
        sheet.append_row(vec!["t".into(), "REQ-1".into()]).unwrap();
        sheet.update_cell(CellRef::new(2, 9), "too late").unwrap();
        let s = sheet.read_sheet().unwrap();
        assert_eq!(s.rows[0].len(), 9);
        assert_eq!(s.cell(0, "Reason"), "too late");
    }

    #[test]
    fn gaps_read_as_blank_rows() {
        let sheet = SqliteSheet::open_in_memory().unwrap();
        sheet.update_cell(CellRef::new(4, 2), "REQ-9").unwrap();
        let s = sheet.read_sheet().unwrap();
        assert_eq!(s.rows.len(), 3);
        assert_eq!(s.positions_of("REQ-9").unwrap(), vec![2]);
    }

    #[test]
    fn file_persists_across_opens() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("requests.db");
        {
            let sheet = SqliteSheet::open_path(&path).unwrap();
            sheet.append_row(data_row("REQ-1", "Submitted")).unwrap();
        }
        let sheet = SqliteSheet::open_path(&path).unwrap();
        assert_eq!(sheet.load_all().unwrap().len(), 1);
    }
}
