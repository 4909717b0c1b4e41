use reimburse_core::transition::offers_update;
use reimburse_core::{Request, Snapshot};

/// Per-session view state, owned by the caller and handed to each interaction.
///
/// Initialized once from the first load; the snapshot is replaced wholesale on
/// every successful reload.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub(crate) snapshot: Snapshot,
    pub(crate) selected: Option<String>,
    pub(crate) editing: bool,
    pub(crate) stale: bool,
}

impl SessionState {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_record(&self) -> Option<&Request> {
        self.selected.as_deref().and_then(|id| self.snapshot.get(id))
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// The store has changed since the snapshot was taken.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Open the update form for a record. Records with no outgoing transition
    /// (Paid, or a status outside the pipeline) are not selectable.
    pub fn select(&mut self, request_id: &str) -> bool {
        let selectable = self
            .snapshot
            .get(request_id)
            .is_some_and(|r| offers_update(r.status()));
        if selectable {
            self.selected = Some(request_id.to_string());
            self.editing = true;
        }
        selectable
    }

    /// Abandon the edit in progress. Nothing has been written.
    pub fn cancel_edit(&mut self) {
        self.selected = None;
        self.editing = false;
    }

    pub(crate) fn replace_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.stale = false;
        if self
            .selected
            .as_deref()
            .is_some_and(|id| self.snapshot.get(id).is_none())
        {
            self.cancel_edit();
        }
    }
}
