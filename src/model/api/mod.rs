//! API-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised in RFC 3339 form.
//! - Fields are camel-cased.

mod cvr_file;
pub use cvr_file::{CvrFileSummary, FileModeSummary};

mod import;
pub use import::{ImportRequest, ImportSummary};

mod manual_results;
pub use manual_results::{ManualResults, ManualResultsIdentifier, ManualResultsSummary};

mod results;
pub use results::{AggregateResult, CardCounts, ContestResult, GroupResult, GROUP_KEY_ROOT};

mod tabulation;
pub use tabulation::{Filter, GroupBy, NormalizedFilter, TabulationRequest};

mod write_in;
pub use write_in::WriteInSummary;
