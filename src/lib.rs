//! Deferred, coalesced timestamp touches for ORM records.
//!
//! Inside [`TouchContext::run_deferred`], calls to [`TouchContext::touch`]
//! are recorded instead of written. When the outermost deferred scope
//! exits, pending touches are grouped by (table, attribute set) and applied
//! as one `UPDATE ... WHERE pk IN (...)` per group, with every record's
//! post-touch callback still run individually.
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use deferred_touch::{MemoryStore, RecordRef, TouchContext, TouchError, Touchable};
//!
//! struct Post { id: i64, updated_at: Option<DateTime<Utc>> }
//!
//! impl Touchable for Post {
//!     fn table_name(&self) -> &str { "posts" }
//!     fn primary_key(&self) -> i64 { self.id }
//!     fn write_timestamp(&mut self, _column: &str, value: DateTime<Utc>) {
//!         self.updated_at = Some(value);
//!     }
//! }
//!
//! let store = MemoryStore::new();
//! store.insert_row("posts", 1);
//! let ctx = TouchContext::new(&store);
//! let (post, _) = RecordRef::new(Post { id: 1, updated_at: None });
//!
//! ctx.run_deferred(|ctx| {
//!     ctx.touch(&post, &[])?;
//!     ctx.touch(&post, &[])?;
//!     Ok::<_, TouchError>(())
//! })?;
//!
//! assert_eq!(store.statement_count(), 1);
//! # Ok::<_, TouchError>(())
//! ```

mod flush;
mod metrics;
mod scope;
mod utils;
pub mod config;
pub mod error;
pub mod queue;
pub mod record;
pub mod store;

pub use config::TouchConfig;
pub use error::{TouchError, TouchResult};
pub use metrics::TouchStats;
pub use queue::{GroupKey, PendingEntry, QueueStats, RecordKey};
pub use record::{RecordRef, Touchable, Toucher};
pub use scope::TouchContext;
pub use store::{MemoryStore, TouchStore, UpdateStatement};
pub use utils::validate_identifier;

/// Get the version of the deferred_touch crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
