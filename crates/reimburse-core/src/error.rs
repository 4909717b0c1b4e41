use thiserror::Error;

use crate::request::Status;

/// Reasons a requested status change is refused before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cannot move a request from {from} to {to}")]
    IllegalEdge { from: String, to: Status },

    #[error("a changer name is required")]
    MissingChangerName,

    #[error("a reason is required when a request is not approved")]
    MissingReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),
}
