use std::fmt;

use crate::request::{Request, Status};
use crate::schema::Column;
use crate::sheet::Snapshot;

/// `None` is the All Records view.
pub type StatusFilter = Option<Status>;

/// The dashboard pages, in sidebar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Submitted,
    Approved,
    NotApproved,
    Paid,
    AllRecords,
}

impl Page {
    pub const ALL: &[Page] = &[
        Page::Submitted,
        Page::Approved,
        Page::NotApproved,
        Page::Paid,
        Page::AllRecords,
    ];

    pub fn filter(&self) -> StatusFilter {
        match self {
            Page::Submitted => Some(Status::Submitted),
            Page::Approved => Some(Status::Approved),
            Page::NotApproved => Some(Status::NotApproved),
            Page::Paid => Some(Status::Paid),
            Page::AllRecords => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Submitted => "Submitted Requests",
            Page::Approved => "Approved Requests",
            Page::NotApproved => "Not Approved Requests",
            Page::Paid => "Paid Requests",
            Page::AllRecords => "All Records",
        }
    }

    /// Notice shown when a status page has nothing to list.
    pub fn empty_notice(&self) -> String {
        match self.filter() {
            Some(status) => format!("No {status} requests found."),
            None => "No requests found.".to_string(),
        }
    }

    pub fn next(&self) -> Page {
        let idx = Page::ALL.iter().position(|p| p == self).unwrap_or(0);
        Page::ALL[(idx + 1) % Page::ALL.len()]
    }

    pub fn prev(&self) -> Page {
        let idx = Page::ALL.iter().position(|p| p == self).unwrap_or(0);
        Page::ALL[(idx + Page::ALL.len() - 1) % Page::ALL.len()]
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Records matching `filter`, in sheet order.
pub fn project(snapshot: &Snapshot, filter: StatusFilter) -> Vec<&Request> {
    snapshot
        .records()
        .iter()
        .filter(|r| match filter {
            Some(status) => r.status() == Some(status),
            None => true,
        })
        .collect()
}

/// The All Records table: fixed labels and column order, whatever the sheet's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsTable {
    pub labels: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

pub fn all_records(snapshot: &Snapshot) -> RecordsTable {
    let labels = Column::ALL_RECORDS.iter().map(|c| c.label()).collect();
    let rows = project(snapshot, None)
        .into_iter()
        .map(|r| {
            Column::ALL_RECORDS
                .iter()
                .map(|&c| field(r, c).to_string())
                .collect()
        })
        .collect();
    RecordsTable { labels, rows }
}

fn field(r: &Request, column: Column) -> &str {
    match column {
        Column::Timestamp => &r.timestamp,
        Column::RequestId => &r.request_id,
        Column::Email => &r.email,
        Column::Purpose => &r.purpose,
        Column::Amount => &r.amount,
        Column::Status => &r.status,
        Column::ChangerName => &r.changer_name,
        Column::Reason => &r.reason,
        Column::PreviousStatus => &r.previous_status,
        Column::Receipts => "",
    }
}
