use reimburse_core::{SchemaError, Status, ValidationError};
use reimburse_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("request {0} is no longer in the sheet")]
    RecordNotFound(String),

    #[error("request {0} appears more than once in the sheet")]
    DuplicateRecord(String),

    /// The record's status in the store no longer matches the one the
    /// transition was validated against.
    #[error("request {request_id} is now {found:?}, not {expected}; reload and try again")]
    StatusChanged {
        request_id: String,
        expected: Status,
        found: String,
    },

    /// Some cells of a transition were written before a later write failed.
    /// The written cells are not reverted.
    #[error("request {request_id} partially updated ({} written): {source}", .applied.join(", "))]
    PartialWrite {
        request_id: String,
        applied: Vec<String>,
        #[source]
        source: StoreError,
    },
}

/// Coarse failure category reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    IllegalEdge,
    MissingChangerName,
    MissingReason,
    StoreUnavailable,
    WriteRejected,
    ColumnNotFound,
    RecordNotFound,
    DuplicateRecord,
    StatusChanged,
    Misconfigured,
}

impl SyncError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SyncError::Validation(e) => match e {
                ValidationError::IllegalEdge { .. } => FailureKind::IllegalEdge,
                ValidationError::MissingChangerName => FailureKind::MissingChangerName,
                ValidationError::MissingReason => FailureKind::MissingReason,
            },
            SyncError::Store(e) | SyncError::PartialWrite { source: e, .. } => store_kind(e),
            SyncError::RecordNotFound(_) => FailureKind::RecordNotFound,
            SyncError::DuplicateRecord(_) => FailureKind::DuplicateRecord,
            SyncError::StatusChanged { .. } => FailureKind::StatusChanged,
        }
    }

    /// Whether any cell was written before the failure.
    pub fn is_partial(&self) -> bool {
        matches!(self, SyncError::PartialWrite { .. })
    }
}

impl From<SchemaError> for SyncError {
    fn from(e: SchemaError) -> Self {
        SyncError::Store(StoreError::Schema(e))
    }
}

fn store_kind(e: &StoreError) -> FailureKind {
    match e {
        StoreError::Unavailable(_) => FailureKind::StoreUnavailable,
        StoreError::WriteRejected(_) => FailureKind::WriteRejected,
        StoreError::Schema(SchemaError::ColumnNotFound(_)) => FailureKind::ColumnNotFound,
        StoreError::Config(_) => FailureKind::Misconfigured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_underlying_error() {
        let e: SyncError = ValidationError::MissingReason.into();
        assert_eq!(e.kind(), FailureKind::MissingReason);

        let e: SyncError = SchemaError::ColumnNotFound("Reason".into()).into();
        assert_eq!(e.kind(), FailureKind::ColumnNotFound);

        let e = SyncError::PartialWrite {
            request_id: "REQ-1".into(),
            applied: vec!["Status".into()],
            source: StoreError::WriteRejected("boom".into()),
        };
        assert_eq!(e.kind(), FailureKind::WriteRejected);
        assert!(e.is_partial());
        assert!(e.to_string().contains("Status written"));

        let e: SyncError = ValidationError::IllegalEdge {
            from: "Paid".into(),
            to: Status::Approved,
        }
        .into();
        assert_eq!(e.kind(), FailureKind::IllegalEdge);

        let e = SyncError::StatusChanged {
            request_id: "REQ-1".into(),
            expected: Status::Submitted,
            found: "Not Approved".into(),
        };
        assert_eq!(e.kind(), FailureKind::StatusChanged);
        assert!(!e.is_partial());
    }
}
