//! The approval pipeline.
//!
//! ```text
//! Submitted ──► Approved ──► Paid
//!     │            ▲
//!     └──► Not Approved
//! ```
//!
//! Paid is terminal. A status outside the pipeline has no outgoing edges.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::request::Status;

/// Allowed destinations per source status.
const EDGES: &[(Status, &[Status])] = &[
    (Status::Submitted, &[Status::Approved, Status::NotApproved]),
    (Status::Approved, &[Status::Paid]),
    (Status::NotApproved, &[Status::Approved]),
    (Status::Paid, &[]),
];

/// Destinations reachable from `current`. Empty for Paid and for unknown statuses.
pub fn allowed_transitions(current: Option<Status>) -> &'static [Status] {
    let Some(current) = current else {
        return &[];
    };
    EDGES
        .iter()
        .find(|(from, _)| *from == current)
        .map(|(_, to)| *to)
        .unwrap_or(&[])
}

pub fn is_allowed(current: Option<Status>, requested: Status) -> bool {
    allowed_transitions(current).contains(&requested)
}

/// Whether a record in `current` offers an update action at all.
pub fn offers_update(current: Option<Status>) -> bool {
    !allowed_transitions(current).is_empty()
}

/// Whether entering `to` needs a reason.
pub fn requires_reason(to: Status) -> bool {
    to == Status::NotApproved
}

/// A validated status change, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCommand {
    pub from: Status,
    pub to: Status,
    pub changer_name: String,
    /// Present only when `to` is Not Approved.
    pub reason: Option<String>,
}

/// Check a requested status change.
///
/// The edge is checked first, then the changer name, then the reason. Names
/// and reasons are trimmed; a reason supplied for any destination other than
/// Not Approved is dropped so it is never written.
pub fn validate(
    current: Option<Status>,
    requested: Status,
    changer_name: &str,
    reason: &str,
) -> Result<TransitionCommand, ValidationError> {
    let from = match current {
        Some(from) if is_allowed(current, requested) => from,
        _ => {
            return Err(ValidationError::IllegalEdge {
                from: current.map(|s| s.as_str()).unwrap_or("unknown").to_string(),
                to: requested,
            })
        }
    };

    let changer_name = changer_name.trim();
    if changer_name.is_empty() {
        return Err(ValidationError::MissingChangerName);
    }

    let reason = if requires_reason(requested) {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingReason);
        }
        Some(reason.to_string())
    } else {
        None
    };

    Ok(TransitionCommand {
        from,
        to: requested,
        changer_name: changer_name.to_string(),
        reason,
    })
}
