//! Persistence seam for touches
//!
//! The flush executor only needs three things from the underlying store:
//! a clock, an `update_all`-style batch write, and a transaction wrapper.

use std::rc::Rc;
use chrono::{DateTime, Utc};
use crate::error::TouchResult;

pub mod statement;
pub mod memory;

pub use memory::MemoryStore;
pub use statement::UpdateStatement;

/// Write path used to apply touches
pub trait TouchStore {
    /// Current time; read once per flush pass
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Apply one batched update, returning the number of rows affected
    fn update_all(&self, statement: &UpdateStatement) -> TouchResult<u64>;

    /// Run `body` atomically: on `Err` every write made inside it is undone
    /// and the error is returned unchanged.
    fn transaction(&self, body: &mut dyn FnMut() -> TouchResult<()>) -> TouchResult<()>;
}

impl<S: TouchStore + ?Sized> TouchStore for &S {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn update_all(&self, statement: &UpdateStatement) -> TouchResult<u64> {
        (**self).update_all(statement)
    }

    fn transaction(&self, body: &mut dyn FnMut() -> TouchResult<()>) -> TouchResult<()> {
        (**self).transaction(body)
    }
}

impl<S: TouchStore + ?Sized> TouchStore for Rc<S> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn update_all(&self, statement: &UpdateStatement) -> TouchResult<u64> {
        (**self).update_all(statement)
    }

    fn transaction(&self, body: &mut dyn FnMut() -> TouchResult<()>) -> TouchResult<()> {
        (**self).transaction(body)
    }
}
