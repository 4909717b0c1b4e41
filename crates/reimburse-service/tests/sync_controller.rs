//! End-to-end behaviour of the synchronization controller against the
//! in-memory and SQLite sheets.

use std::sync::atomic::{AtomicUsize, Ordering};

use reimburse_core::schema::{canonical_header, Column};
use reimburse_core::{CellRef, Sheet, Status, TransitionCommand};
use reimburse_service::{
    DashboardEvent, FailureKind, PendingTransition, SessionState, SyncController, SyncError,
};
use reimburse_store::{MemorySheet, RecordStore, SqliteSheet, StoreError};

fn row(id: &str, status: &str) -> Vec<String> {
    Column::ALL
        .iter()
        .map(|c| match c {
            Column::Timestamp => "10/01/2026 09:00:00".to_string(),
            Column::RequestId => id.to_string(),
            Column::Email => format!("{}@example.org", id.to_lowercase()),
            Column::Purpose => "Travel".to_string(),
            Column::Amount => "1500".to_string(),
            Column::Status => status.to_string(),
            Column::Reason => "earlier note".to_string(),
            _ => String::new(),
        })
        .collect()
}

fn sheet_with(rows: &[(&str, &str)]) -> MemorySheet {
    let sheet = MemorySheet::blank();
    for (id, status) in rows {
        sheet.append_row(row(id, status));
    }
    sheet
}

fn open(sheet: &MemorySheet) -> (SyncController<MemorySheet>, SessionState) {
    let mut controller = SyncController::new(sheet.clone());
    let state = controller.open_session().unwrap();
    controller.drain_events();
    (controller, state)
}

fn col(name: Column) -> u32 {
    canonical_header()
        .iter()
        .position(|h| h == name.header())
        .unwrap() as u32
        + 1
}

#[test]
fn approve_writes_status_then_name_and_reloads() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);

    assert!(state.select("REQ-1"));
    let pending = controller
        .validate(&state, "REQ-1", Status::Approved, "Aisha", "")
        .unwrap();
    let receipt = controller.apply_transition(&mut state, pending).unwrap();

    assert_eq!(
        receipt.message(),
        "Status updated to Approved by Aisha for Request ID: REQ-1"
    );

    let writes = sheet.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].cell, CellRef::new(2, col(Column::Status)));
    assert_eq!(writes[0].value, "Approved");
    assert_eq!(writes[1].cell, CellRef::new(2, col(Column::ChangerName)));
    assert_eq!(writes[1].value, "Aisha");

    let record = state.snapshot().get("REQ-1").unwrap();
    assert_eq!(record.status, "Approved");
    assert_eq!(record.changer_name, "Aisha");
    assert_eq!(record.reason, "earlier note");

    assert!(!state.is_stale());
    assert!(!state.is_editing());
    assert!(state.selected_id().is_none());

    let events = controller.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], DashboardEvent::SnapshotRefreshed { records: 1 }));
    assert!(matches!(events[1], DashboardEvent::TransitionSucceeded(_)));
}

#[test]
fn not_approved_also_writes_reason() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);

    let pending = controller
        .validate(&state, "REQ-1", Status::NotApproved, "Omar", "No receipt")
        .unwrap();
    controller.apply_transition(&mut state, pending).unwrap();

    let columns: Vec<String> = sheet.writes().into_iter().map(|w| w.column).collect();
    assert_eq!(columns, vec!["Status", "Changer Name", "Reason"]);
    let record = state.snapshot().get("REQ-1").unwrap();
    assert_eq!(record.status, "Not Approved");
    assert_eq!(record.reason, "No receipt");
}

#[test]
fn validation_failure_writes_nothing() {
    let sheet = sheet_with(&[("REQ-1", "Not Approved")]);
    let (mut controller, state) = open(&sheet);

    let err = controller
        .validate(&state, "REQ-1", Status::Approved, "", "whatever")
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::MissingChangerName);

    let err = controller
        .validate(&state, "REQ-1", Status::Paid, "Aisha", "")
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::IllegalEdge);

    assert!(sheet.writes().is_empty());
    let events = controller.drain_events();
    assert!(events.iter().all(|e| matches!(
        e,
        DashboardEvent::TransitionFailed { .. }
    )));
}

#[test]
fn failed_name_write_leaves_partial_state() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);
    sheet.reject_writes_to("Changer Name");

    let pending = controller
        .validate(&state, "REQ-1", Status::Approved, "Aisha", "")
        .unwrap();
    let err = controller.apply_transition(&mut state, pending).unwrap_err();

    assert!(err.is_partial());
    assert_eq!(err.kind(), FailureKind::WriteRejected);
    match &err {
        SyncError::PartialWrite { applied, .. } => assert_eq!(applied, &vec!["Status".to_string()]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(state.is_stale());

    controller.refresh(&mut state).unwrap();
    let record = state.snapshot().get("REQ-1").unwrap();
    assert_eq!(record.status, "Approved");
    assert_eq!(record.changer_name, "");
    assert!(!state.is_stale());
}

#[test]
fn failed_first_write_is_not_partial() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);
    sheet.reject_writes_to("Status");

    let pending = controller
        .validate(&state, "REQ-1", Status::Approved, "Aisha", "")
        .unwrap();
    let err = controller.apply_transition(&mut state, pending).unwrap_err();

    assert!(matches!(err, SyncError::Store(StoreError::WriteRejected(_))));
    assert!(!state.is_stale());
    assert!(sheet.writes().is_empty());
}

#[test]
fn rows_inserted_after_load_do_not_misdirect_writes() {
    let sheet = sheet_with(&[("REQ-1", "Submitted"), ("REQ-2", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);
    assert_eq!(state.snapshot().row_index_of("REQ-2"), Some(3));

    // Another actor inserts a row above REQ-2 between load and write.
    sheet.insert_row(0, row("REQ-0", "Submitted"));

    let pending = controller
        .validate(&state, "REQ-2", Status::Approved, "Aisha", "")
        .unwrap();
    controller.apply_transition(&mut state, pending).unwrap();

    assert_eq!(sheet.writes()[0].cell.row, 4);
    let snapshot = state.snapshot();
    assert_eq!(snapshot.get("REQ-2").unwrap().status, "Approved");
    assert_eq!(snapshot.get("REQ-1").unwrap().status, "Submitted");
    assert_eq!(snapshot.get("REQ-0").unwrap().status, "Submitted");
}

#[test]
fn vanished_and_duplicated_records_are_refused() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);
    let pending = controller
        .validate(&state, "REQ-1", Status::Approved, "Aisha", "")
        .unwrap();

    sheet.append_row(row("REQ-1", "Submitted"));
    let err = controller
        .apply_transition(&mut state, pending.clone())
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::DuplicateRecord);

    let fresh = MemorySheet::blank();
    let mut other = SyncController::new(fresh.clone());
    let err = other.apply_transition(&mut state, pending).unwrap_err();
    assert_eq!(err.kind(), FailureKind::RecordNotFound);

    assert!(sheet.writes().is_empty());
    assert!(fresh.writes().is_empty());
}

#[test]
fn renamed_column_fails_before_any_write() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);
    sheet.rename_column("Changer Name", "Approver");

    let pending = controller
        .validate(&state, "REQ-1", Status::Approved, "Aisha", "")
        .unwrap();
    let err = controller.apply_transition(&mut state, pending).unwrap_err();

    assert_eq!(err.kind(), FailureKind::ColumnNotFound);
    assert!(sheet.writes().is_empty());
}

#[test]
fn status_changed_elsewhere_is_rechecked() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);
    let pending = controller
        .validate(&state, "REQ-1", Status::NotApproved, "Aisha", "Duplicate claim")
        .unwrap();

    // Another reviewer approves and pays it first.
    sheet.update_cell(CellRef::new(2, col(Column::Status)), "Paid").unwrap();
    let before = sheet.writes().len();

    let err = controller.apply_transition(&mut state, pending).unwrap_err();
    assert_eq!(err.kind(), FailureKind::StatusChanged);
    assert_eq!(sheet.writes().len(), before);
}

#[test]
fn rejection_by_another_reviewer_is_not_overwritten() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);
    let pending = controller
        .validate(&state, "REQ-1", Status::Approved, "Aisha", "")
        .unwrap();

    // Not Approved -> Approved is a legal edge, but not the one validated.
    sheet
        .update_cell(CellRef::new(2, col(Column::Status)), "Not Approved")
        .unwrap();
    sheet
        .update_cell(CellRef::new(2, col(Column::Reason)), "Duplicate claim")
        .unwrap();
    let before = sheet.writes().len();

    let err = controller.apply_transition(&mut state, pending).unwrap_err();
    assert_eq!(err.kind(), FailureKind::StatusChanged);
    assert!(matches!(
        &err,
        SyncError::StatusChanged { expected: Status::Submitted, found, .. } if found == "Not Approved"
    ));
    assert_eq!(sheet.writes().len(), before);
    assert!(!state.is_stale());

    controller.refresh(&mut state).unwrap();
    let record = state.snapshot().get("REQ-1").unwrap();
    assert_eq!(record.status, "Not Approved");
    assert_eq!(record.reason, "Duplicate claim");
}

#[test]
fn hand_built_commands_are_revalidated() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);

    let unnamed = PendingTransition {
        request_id: "REQ-1".into(),
        command: TransitionCommand {
            from: Status::Submitted,
            to: Status::NotApproved,
            changer_name: "  ".into(),
            reason: Some("No receipt".into()),
        },
    };
    let err = controller.apply_transition(&mut state, unnamed).unwrap_err();
    assert_eq!(err.kind(), FailureKind::MissingChangerName);

    let no_reason = PendingTransition {
        request_id: "REQ-1".into(),
        command: TransitionCommand {
            from: Status::Submitted,
            to: Status::NotApproved,
            changer_name: "Omar".into(),
            reason: None,
        },
    };
    let err = controller.apply_transition(&mut state, no_reason).unwrap_err();
    assert_eq!(err.kind(), FailureKind::MissingReason);

    let skips_approval = PendingTransition {
        request_id: "REQ-1".into(),
        command: TransitionCommand {
            from: Status::Submitted,
            to: Status::Paid,
            changer_name: "Omar".into(),
            reason: None,
        },
    };
    let err = controller.apply_transition(&mut state, skips_approval).unwrap_err();
    assert_eq!(err.kind(), FailureKind::IllegalEdge);

    assert!(sheet.writes().is_empty());
    assert_eq!(state.snapshot().get("REQ-1").unwrap().status, "Submitted");
}

#[test]
fn hand_built_command_is_written_trimmed() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    let (mut controller, mut state) = open(&sheet);
    let pending = PendingTransition {
        request_id: "REQ-1".into(),
        command: TransitionCommand {
            from: Status::Submitted,
            to: Status::Approved,
            changer_name: " Aisha ".into(),
            reason: Some("not written".into()),
        },
    };
    controller.apply_transition(&mut state, pending).unwrap();

    let values: Vec<String> = sheet.writes().into_iter().map(|w| w.value).collect();
    assert_eq!(values, vec!["Approved", "Aisha"]);
}

#[test]
fn unavailable_store_blocks_session() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    sheet.set_unavailable(true);
    let mut controller = SyncController::new(sheet.clone());
    let err = controller.open_session().unwrap_err();
    assert_eq!(err.kind(), FailureKind::StoreUnavailable);
}

/// Serves a fixed number of reads, then reports the store unreachable.
struct ReadBudget {
    inner: MemorySheet,
    reads_left: AtomicUsize,
}

impl RecordStore for ReadBudget {
    fn read_sheet(&self) -> Result<Sheet, StoreError> {
        let left = self.reads_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(StoreError::Unavailable("budget exhausted".into()));
        }
        self.reads_left.store(left - 1, Ordering::SeqCst);
        self.inner.read_sheet()
    }

    fn update_cell(&self, cell: CellRef, value: &str) -> Result<(), StoreError> {
        self.inner.update_cell(cell, value)
    }

    fn describe(&self) -> String {
        "read-budget".into()
    }
}

#[test]
fn failed_reload_after_success_keeps_session_stale() {
    let sheet = sheet_with(&[("REQ-1", "Submitted")]);
    // One read to open, one to re-resolve the row, none for the reload.
    let mut controller = SyncController::new(ReadBudget {
        inner: sheet.clone(),
        reads_left: AtomicUsize::new(2),
    });
    let mut state = controller.open_session().unwrap();
    let pending = controller
        .validate(&state, "REQ-1", Status::Approved, "Aisha", "")
        .unwrap();
    controller.apply_transition(&mut state, pending).unwrap();

    assert!(state.is_stale());
    assert_eq!(state.snapshot().get("REQ-1").unwrap().status, "Submitted");

    controller.store().reads_left.store(1, Ordering::SeqCst);
    controller.refresh(&mut state).unwrap();
    assert!(!state.is_stale());
    assert_eq!(state.snapshot().get("REQ-1").unwrap().status, "Approved");
}

#[test]
fn sqlite_write_is_visible_after_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("requests.db");
    {
        let sheet = SqliteSheet::open_path(&path).unwrap();
        sheet.append_row(row("REQ-1", "Approved")).unwrap();
        let mut controller = SyncController::new(sheet);
        let mut state = controller.open_session().unwrap();
        let pending = controller
            .validate(&state, "REQ-1", Status::Paid, "Omar", "")
            .unwrap();
        controller.apply_transition(&mut state, pending).unwrap();
    }

    let sheet = SqliteSheet::open_path(&path).unwrap();
    let snapshot = sheet.load_all().unwrap();
    let record = snapshot.get("REQ-1").unwrap();
    assert_eq!(record.status, "Paid");
    assert_eq!(record.changer_name, "Omar");
}

#[test]
fn project_filters_session_snapshot() {
    let sheet = sheet_with(&[
        ("REQ-1", "Submitted"),
        ("REQ-2", "Paid"),
        ("REQ-3", "Submitted"),
    ]);
    let (controller, state) = open(&sheet);
    let submitted: Vec<&str> = controller
        .project(&state, Some(Status::Submitted))
        .iter()
        .map(|r| r.request_id.as_str())
        .collect();
    assert_eq!(submitted, vec!["REQ-1", "REQ-3"]);
    assert_eq!(controller.project(&state, None).len(), 3);
    assert_eq!(controller.snapshot(&state).len(), 3);
}
