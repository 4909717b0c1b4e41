use reimburse_core::schema::Column;
use reimburse_core::transition::{self, TransitionCommand};
use reimburse_core::{view, Request, Sheet, Snapshot, Status, StatusFilter};
use reimburse_store::RecordStore;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::event::{DashboardEvent, TransitionReceipt};
use crate::session::SessionState;

/// A validated transition bound to the record it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    pub request_id: String,
    pub command: TransitionCommand,
}

/// Applies transitions to the record store and keeps sessions consistent with it.
pub struct SyncController<S> {
    store: S,
    events: Vec<DashboardEvent>,
}

impl<S: RecordStore> SyncController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            events: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Initial load for a new session.
    pub fn open_session(&mut self) -> Result<SessionState, SyncError> {
        let snapshot = self.store.load_all()?;
        info!(records = snapshot.len(), store = %self.store.describe(), "session opened");
        self.events.push(DashboardEvent::SnapshotRefreshed {
            records: snapshot.len(),
        });
        Ok(SessionState::new(snapshot))
    }

    /// Reload everything. On failure the previous snapshot is kept.
    pub fn refresh(&mut self, state: &mut SessionState) -> Result<(), SyncError> {
        let snapshot = self.store.load_all().map_err(|e| {
            warn!("reload failed: {e}");
            e
        })?;
        debug!(records = snapshot.len(), "snapshot refreshed");
        self.events.push(DashboardEvent::SnapshotRefreshed {
            records: snapshot.len(),
        });
        state.replace_snapshot(snapshot);
        Ok(())
    }

    pub fn snapshot<'a>(&self, state: &'a SessionState) -> &'a Snapshot {
        state.snapshot()
    }

    pub fn project<'a>(&self, state: &'a SessionState, filter: StatusFilter) -> Vec<&'a Request> {
        view::project(state.snapshot(), filter)
    }

    /// Check a requested change against the record as currently loaded.
    pub fn validate(
        &mut self,
        state: &SessionState,
        request_id: &str,
        requested: Status,
        changer_name: &str,
        reason: &str,
    ) -> Result<PendingTransition, SyncError> {
        let result = state
            .snapshot()
            .get(request_id)
            .ok_or_else(|| SyncError::RecordNotFound(request_id.to_string()))
            .and_then(|record| {
                transition::validate(record.status(), requested, changer_name, reason)
                    .map_err(SyncError::from)
            });
        match result {
            Ok(command) => Ok(PendingTransition {
                request_id: request_id.to_string(),
                command,
            }),
            Err(e) => {
                self.fail(request_id, &e);
                Err(e)
            }
        }
    }

    /// Write a validated transition, then reload.
    ///
    /// The target row is re-resolved by Request ID from a fresh read so that
    /// rows inserted or reordered since the last load cannot misdirect the
    /// writes. Cells are written status, changer name, then reason (Not
    /// Approved only). A failed write stops the sequence; earlier cells stay
    /// written and the session is marked stale.
    pub fn apply_transition(
        &mut self,
        state: &mut SessionState,
        pending: PendingTransition,
    ) -> Result<TransitionReceipt, SyncError> {
        match self.write_transition(state, &pending) {
            Ok(receipt) => {
                state.stale = true;
                state.cancel_edit();
                if let Err(e) = self.refresh(state) {
                    warn!(request_id = %receipt.request_id, "transition applied but reload failed: {e}");
                }
                info!(
                    request_id = %receipt.request_id,
                    status = %receipt.status,
                    changer = %receipt.changer_name,
                    "transition applied"
                );
                self.events
                    .push(DashboardEvent::TransitionSucceeded(receipt.clone()));
                Ok(receipt)
            }
            Err(e) => {
                if e.is_partial() {
                    state.stale = true;
                }
                self.fail(&pending.request_id, &e);
                Err(e)
            }
        }
    }

    fn write_transition(
        &self,
        state: &SessionState,
        pending: &PendingTransition,
    ) -> Result<TransitionReceipt, SyncError> {
        let PendingTransition {
            request_id,
            command,
        } = pending;

        let sheet = self.store.read_sheet()?;
        let position = match sheet.positions_of(request_id)?.as_slice() {
            [] => return Err(SyncError::RecordNotFound(request_id.clone())),
            [position] => *position,
            _ => return Err(SyncError::DuplicateRecord(request_id.clone())),
        };
        let row = Sheet::row_index(position);
        if state.snapshot().row_index_of(request_id) != Some(row) {
            debug!(%request_id, row, "row moved since last load");
        }

        // Another reviewer may have moved the record since it was loaded.
        let found = sheet.cell(position, Column::Status.header()).trim();
        let current = Status::parse_str(found);
        if current != Some(command.from) {
            return Err(SyncError::StatusChanged {
                request_id: request_id.clone(),
                expected: command.from,
                found: found.to_string(),
            });
        }
        // The command is re-checked in full; callers can build one by hand.
        let command = transition::validate(
            current,
            command.to,
            &command.changer_name,
            command.reason.as_deref().unwrap_or(""),
        )?;

        let mut writes = vec![
            (Column::Status, command.to.as_str().to_string()),
            (Column::ChangerName, command.changer_name.clone()),
        ];
        if let Some(reason) = &command.reason {
            writes.push((Column::Reason, reason.clone()));
        }
        // Every target column must exist before the first write.
        for (column, _) in &writes {
            sheet.column_position(column.header())?;
        }

        let mut applied: Vec<String> = Vec::new();
        for (column, value) in writes {
            if let Err(source) = self
                .store
                .write_cell(&sheet.header, row, column.header(), &value)
            {
                warn!(%request_id, column = column.header(), "cell write failed: {source}");
                return Err(if applied.is_empty() {
                    SyncError::Store(source)
                } else {
                    SyncError::PartialWrite {
                        request_id: request_id.clone(),
                        applied,
                        source,
                    }
                });
            }
            debug!(%request_id, column = column.header(), row, "cell written");
            applied.push(column.header().to_string());
        }

        Ok(TransitionReceipt {
            request_id: request_id.clone(),
            status: command.to,
            changer_name: command.changer_name.clone(),
        })
    }

    fn fail(&mut self, request_id: &str, e: &SyncError) {
        warn!(%request_id, kind = ?e.kind(), "transition failed: {e}");
        self.events.push(DashboardEvent::TransitionFailed {
            request_id: request_id.to_string(),
            kind: e.kind(),
            message: e.to_string(),
        });
    }

    /// Events emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<DashboardEvent> {
        std::mem::take(&mut self.events)
    }
}
