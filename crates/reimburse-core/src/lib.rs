pub mod error;
pub mod request;
pub mod schema;
pub mod sheet;
pub mod transition;
pub mod view;

pub use error::{SchemaError, ValidationError};
pub use request::{format_proof_links, Request, Status};
pub use sheet::{CellRef, Sheet, Snapshot};
pub use transition::{validate, TransitionCommand};
pub use view::{project, Page, StatusFilter};
