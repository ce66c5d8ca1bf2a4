//! Context-local registry of deferred touches
//!
//! - `RecordKey`: identifies a unique (table, pk) record
//! - `GroupKey`: (table, attribute set) sharing one update statement
//! - `PendingTouches`: the deduplicating registry drained at flush time

pub mod key;
mod state;
mod ops;

pub use key::{GroupKey, RecordKey};
pub use state::{PendingGroup, PendingRecord, PendingTouches};
pub use ops::{PendingEntry, QueueStats};
