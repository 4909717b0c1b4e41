mod memory;
#[cfg(feature = "sheets")]
mod sheets;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::{CellWrite, MemorySheet};
#[cfg(feature = "sheets")]
pub use sheets::{column_letters, GoogleSheetsStore, DEFAULT_API_BASE};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSheet;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use reimburse_core::schema::Column;
use reimburse_core::{CellRef, SchemaError, Sheet, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be read: connection or authorization failure.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// A single cell write was refused or could not reach the store.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// A tabular record store addressed by 1-based row and column.
///
/// Every successful `update_cell` is immediately persistent; there is no
/// batching and no rollback.
pub trait RecordStore: Send + Sync {
    /// Read the whole worksheet, header row included.
    fn read_sheet(&self) -> Result<Sheet, StoreError>;

    /// Overwrite one cell.
    fn update_cell(&self, cell: CellRef, value: &str) -> Result<(), StoreError>;

    /// Short human-readable name of the backing store, for logs and the title bar.
    fn describe(&self) -> String;

    /// Read every record.
    fn load_all(&self) -> Result<Snapshot, StoreError> {
        let sheet = self.read_sheet()?;
        tracing::debug!(rows = sheet.rows.len(), store = %self.describe(), "loaded sheet");
        Ok(Snapshot::from_sheet(&sheet))
    }

    /// Write one cell addressed by row and column header.
    ///
    /// `header` should come from the same read the row index was taken from.
    fn write_cell(
        &self,
        header: &[String],
        row: u32,
        column: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let col = header
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| StoreError::WriteRejected(format!("no column named {column:?}")))?;
        self.update_cell(CellRef::new(row, col as u32 + 1), value)
    }
}

impl<T: RecordStore + ?Sized> RecordStore for Box<T> {
    fn read_sheet(&self) -> Result<Sheet, StoreError> {
        (**self).read_sheet()
    }

    fn update_cell(&self, cell: CellRef, value: &str) -> Result<(), StoreError> {
        (**self).update_cell(cell, value)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn read_sheet(&self) -> Result<Sheet, StoreError> {
        (**self).read_sheet()
    }

    fn update_cell(&self, cell: CellRef, value: &str) -> Result<(), StoreError> {
        (**self).update_cell(cell, value)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// -- Configuration --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Google Sheets over the v4 REST API.
    Sheets,
    /// A local SQLite file holding the same grid.
    Sqlite,
    /// Process-local, lost on exit.
    Memory,
}

/// Configuration for the record store backend.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: Backend,
    pub spreadsheet_id: Option<String>,
    /// Worksheet (tab) name. The form writes to the first tab.
    pub worksheet: String,
    /// OAuth bearer token, already authorized for the spreadsheet.
    pub access_token: Option<String>,
    pub api_base: Option<String>,
    pub sqlite_path: Option<PathBuf>,
    /// Seed a few sample requests into an empty local sheet.
    pub demo: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            spreadsheet_id: None,
            worksheet: "Sheet1".into(),
            access_token: None,
            api_base: None,
            sqlite_path: None,
            demo: false,
        }
    }
}

// -- Factory --

pub fn open_store(config: &StoreConfig) -> Result<Box<dyn RecordStore>, StoreError> {
    match config.backend {
        #[cfg(feature = "sheets")]
        Backend::Sheets => {
            let id = config
                .spreadsheet_id
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| StoreError::Config("a spreadsheet id is required".into()))?;
            let token = config
                .access_token
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| StoreError::Config("an access token is required".into()))?;
            let api_base = config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
            let store = GoogleSheetsStore::new(api_base, id, &config.worksheet, token)?;
            tracing::info!(spreadsheet = id, worksheet = %config.worksheet, "using Google Sheets store");
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "sheets"))]
        Backend::Sheets => Err(StoreError::Config(
            "built without the `sheets` feature".into(),
        )),
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let path = config
                .sqlite_path
                .clone()
                .unwrap_or_else(|| data_dir().join("requests.db"));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("{}: {e}", parent.display())))?;
            }
            let store = SqliteSheet::open_path(&path)?;
            if config.demo && store.read_sheet()?.rows.is_empty() {
                for row in demo_rows(Local::now()) {
                    store.append_row(row)?;
                }
            }
            tracing::info!(path = %path.display(), "using SQLite store");
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => Err(StoreError::Config(
            "built without the `sqlite` feature".into(),
        )),
        Backend::Memory => {
            let store = MemorySheet::blank();
            if config.demo {
                for row in demo_rows(Local::now()) {
                    store.append_row(row);
                }
            }
            tracing::info!("using in-memory store");
            Ok(Box::new(store))
        }
    }
}

/// `$XDG_DATA_HOME/reimburse`, falling back to `~/.local/share/reimburse`.
pub fn data_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share")
    } else {
        PathBuf::from(".")
    };
    base.join("reimburse")
}

/// Sample form responses in canonical column order.
pub fn demo_rows(now: DateTime<Local>) -> Vec<Vec<String>> {
    let samples = [
        ("REQ-1001", "amina@example.org", "Field visit transport", "1500", "https://drive.example/r/1001a, https://drive.example/r/1001b", "Submitted", "", ""),
        ("REQ-1002", "bilal@example.org", "Workshop stationery", "820", "https://drive.example/r/1002", "Approved", "Hina", ""),
        ("REQ-1003", "chen@example.org", "Team lunch", "4300", "", "Not Approved", "Hina", "Over the per-head limit"),
        ("REQ-1004", "dana@example.org", "Printer toner", "2600", "https://drive.example/r/1004", "Paid", "Omar", ""),
    ];
    samples
        .iter()
        .enumerate()
        .map(|(i, (id, email, purpose, amount, receipts, status, changer, reason))| {
            let when = now - Duration::days((samples.len() - i) as i64);
            let mut row = vec![String::new(); Column::ALL.len()];
            for (pos, col) in Column::ALL.iter().enumerate() {
                row[pos] = match col {
                    Column::Timestamp => when.format("%m/%d/%Y %H:%M:%S").to_string(),
                    Column::RequestId => id.to_string(),
                    Column::Email => email.to_string(),
                    Column::Purpose => purpose.to_string(),
                    Column::Amount => amount.to_string(),
                    Column::Receipts => receipts.to_string(),
                    Column::Status => status.to_string(),
                    Column::ChangerName => changer.to_string(),
                    Column::Reason => reason.to_string(),
                    Column::PreviousStatus => String::new(),
                };
            }
            row
        })
        .collect()
}
