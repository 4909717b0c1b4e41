use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use reimburse_store::{Backend, StoreConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Sheets,
    Sqlite,
    Memory,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Sheets => Backend::Sheets,
            BackendArg::Sqlite => Backend::Sqlite,
            BackendArg::Memory => Backend::Memory,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "reimburse", about = "Reimbursement request dashboard")]
pub struct DashboardConfig {
    /// Where requests are read from and written to
    #[arg(long, value_enum, env = "REIMBURSE_BACKEND", default_value = "sqlite")]
    pub backend: BackendArg,

    /// Google spreadsheet ID (sheets backend)
    #[arg(long, env = "REIMBURSE_SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    /// Worksheet (tab) holding the form responses
    #[arg(long, env = "REIMBURSE_WORKSHEET", default_value = "Sheet1")]
    pub worksheet: String,

    /// OAuth bearer token already authorized for the spreadsheet
    #[arg(long, env = "REIMBURSE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Sheets API base URL
    #[arg(long, env = "REIMBURSE_SHEETS_API")]
    pub api_base: Option<String>,

    /// SQLite file (sqlite backend). Defaults to the user data directory.
    #[arg(long, env = "REIMBURSE_SQLITE_PATH")]
    pub sqlite_path: Option<PathBuf>,

    /// Log file. The terminal is taken by the dashboard, so logs go here.
    #[arg(long, env = "REIMBURSE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Seed sample requests into an empty local sheet
    #[arg(long)]
    pub demo: bool,
}

impl DashboardConfig {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: self.backend.into(),
            spreadsheet_id: self.spreadsheet_id.clone(),
            worksheet: self.worksheet.clone(),
            access_token: self.access_token.clone(),
            api_base: self.api_base.clone(),
            sqlite_path: self.sqlite_path.clone(),
            demo: self.demo,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| reimburse_store::data_dir().join("reimburse.log"))
    }
}
