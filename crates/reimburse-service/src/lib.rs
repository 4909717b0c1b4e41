mod error;
mod event;
mod session;
mod sync;

pub use error::{FailureKind, SyncError};
pub use event::{DashboardEvent, TransitionReceipt};
pub use session::SessionState;
pub use sync::{PendingTransition, SyncController};
