//! Column names of the responses sheet.
//!
//! The sheet is addressed by header name, never by physical position, so
//! columns may be reordered upstream without affecting reads or writes.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Timestamp,
    RequestId,
    Email,
    Purpose,
    Amount,
    Receipts,
    Status,
    ChangerName,
    Reason,
    PreviousStatus,
}

impl Column {
    /// Canonical header order, used when seeding an empty sheet.
    pub const ALL: &[Column] = &[
        Column::Timestamp,
        Column::RequestId,
        Column::Email,
        Column::Purpose,
        Column::Amount,
        Column::Receipts,
        Column::Status,
        Column::ChangerName,
        Column::Reason,
        Column::PreviousStatus,
    ];

    /// Column order and labels of the All Records table.
    pub const ALL_RECORDS: &[Column] = &[
        Column::Timestamp,
        Column::RequestId,
        Column::Purpose,
        Column::Email,
        Column::Amount,
        Column::Status,
        Column::PreviousStatus,
        Column::ChangerName,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::Timestamp => "Timestamp",
            Column::RequestId => "Request ID",
            Column::Email => "Your Email",
            Column::Purpose => "What is this request for?",
            Column::Amount => "Total amount requested?",
            Column::Receipts => "Attach all receipts (only PDF or Image format is allowed)",
            Column::Status => "Status",
            Column::ChangerName => "Changer Name",
            Column::Reason => "Reason",
            Column::PreviousStatus => "Previous Status",
        }
    }

    /// Display label in the All Records table.
    pub fn label(&self) -> &'static str {
        match self {
            Column::Purpose => "Requested For",
            Column::Email => "Requester Mail",
            Column::Amount => "Amount Rs.",
            Column::Status => "Current Status",
            Column::Receipts => "Receipts",
            other => other.header(),
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Column::ALL.iter().copied().find(|c| c.header() == header)
    }
}

pub fn canonical_header() -> Vec<String> {
    Column::ALL.iter().map(|c| c.header().to_string()).collect()
}
