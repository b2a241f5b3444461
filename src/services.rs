pub mod batch;
mod bulk;
mod lifecycle;
mod report;
pub mod selector;

pub use batch::{BatchExecutor, BatchOp, BatchOutcome, BatchUnit, TaggedError};
pub use bulk::{BulkService, is_prunable};
pub use lifecycle::{Lifecycle, StartOptions, StartPlan};
pub use report::CommandReport;
pub use selector::{Resolved, Selected, Selection, SelectionFlags, Selector};
