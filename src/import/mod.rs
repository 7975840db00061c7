//! Listing and ingestion of scanner exports.

mod coordinator;
mod error;
mod flags;
mod locator;
mod validation;

pub use coordinator::{ElectionLocks, ImportCoordinator, ImportOptions};
pub use error::{ImportError, ListExportsError, ValidationError};
pub use flags::adjudication_flags;
pub use locator::ExportLocator;
pub use validation::{validate, MAX_SHEETS_PER_BALLOT};
