//! Record capability: what a record type must expose to be touched.
//!
//! Records are shared as `Rc<RefCell<_>>` so the registry, the caller and
//! other records' callbacks can all hold the same in-memory object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use chrono::{DateTime, Utc};
use crate::error::{TouchError, TouchResult};
use crate::queue::RecordKey;

/// Touch capability handed to post-touch callbacks.
///
/// Implemented by `TouchContext`; callbacks use it to cascade touches to
/// related records (e.g. a comment touching its post).
pub trait Toucher {
    /// Touch `record`, updating the default timestamp columns plus `attributes`.
    fn touch(&self, record: &RecordRef, attributes: &[&str]) -> TouchResult<()>;

    /// Whether touches are currently being deferred.
    fn is_deferring(&self) -> bool;
}

/// A persisted record whose timestamps can be touched.
pub trait Touchable {
    /// Table the record lives in
    fn table_name(&self) -> &str;

    /// Primary key value
    fn primary_key(&self) -> i64;

    /// Primary key column name
    fn primary_key_column(&self) -> &str {
        "id"
    }

    /// Update-timestamp columns of this record type (`None` = configured defaults)
    fn timestamp_columns(&self) -> Option<Vec<String>> {
        None
    }

    /// False for new or deleted records
    fn is_persisted(&self) -> bool {
        true
    }

    /// Opt out of touch tracking entirely
    fn no_touching(&self) -> bool {
        false
    }

    /// Store the new value in the in-memory attribute
    fn write_timestamp(&mut self, column: &str, value: DateTime<Utc>);

    /// Forget pending dirty state for `columns`
    fn clear_attribute_changes(&mut self, _columns: &[String]) {}

    /// Post-touch callback, run once per touch request after the write
    fn after_touch(&mut self, _toucher: &dyn Toucher) -> TouchResult<()> {
        Ok(())
    }
}

/// Shared handle to a touchable record.
///
/// The identity key is captured at construction so registering a record
/// never needs to borrow it.
#[derive(Clone)]
pub struct RecordRef {
    key: RecordKey,
    inner: Rc<RefCell<dyn Touchable>>,
}

impl RecordRef {
    /// Wrap a record, returning the handle and a typed handle to the same object.
    pub fn new<T: Touchable + 'static>(record: T) -> (Self, Rc<RefCell<T>>) {
        let typed = Rc::new(RefCell::new(record));
        (Self::from_rc(typed.clone()), typed)
    }

    /// Build a handle from an existing shared record.
    pub fn from_rc<T: Touchable + 'static>(record: Rc<RefCell<T>>) -> Self {
        let key = {
            let r = record.borrow();
            RecordKey::new(r.table_name(), r.primary_key())
        };
        Self { key, inner: record }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn table_name(&self) -> &str {
        &self.key.table
    }

    pub fn primary_key(&self) -> i64 {
        self.key.pk
    }

    /// Whether both handles point at the same in-memory object
    pub fn ptr_eq(&self, other: &RecordRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `f` with shared access to the record.
    pub fn with<R>(&self, f: impl FnOnce(&dyn Touchable) -> R) -> TouchResult<R> {
        let record = self.inner.try_borrow().map_err(|_| self.in_use())?;
        Ok(f(&*record))
    }

    /// Run `f` with exclusive access to the record.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut dyn Touchable) -> R) -> TouchResult<R> {
        let mut record = self.inner.try_borrow_mut().map_err(|_| self.in_use())?;
        Ok(f(&mut *record))
    }

    fn in_use(&self) -> TouchError {
        TouchError::RecordInUse {
            table: self.key.table.clone(),
            pk: self.key.pk,
        }
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRef")
            .field("table", &self.key.table)
            .field("pk", &self.key.pk)
            .finish()
    }
}
