use reimburse_core::Status;

use crate::error::FailureKind;

/// Confirmation of an applied transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReceipt {
    pub request_id: String,
    pub status: Status,
    pub changer_name: String,
}

impl TransitionReceipt {
    pub fn message(&self) -> String {
        format!(
            "Status updated to {} by {} for Request ID: {}",
            self.status, self.changer_name, self.request_id
        )
    }
}

/// Notifications for the presentation layer, drained after each interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    SnapshotRefreshed { records: usize },
    TransitionSucceeded(TransitionReceipt),
    TransitionFailed {
        request_id: String,
        kind: FailureKind,
        message: String,
    },
}
