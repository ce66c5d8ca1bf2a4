//! In-memory `TouchStore` with transaction rollback and fault injection.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use chrono::{DateTime, Duration, Utc};
use super::{TouchStore, UpdateStatement};
use crate::error::TouchResult;

type Row = BTreeMap<String, DateTime<Utc>>;
type Table = BTreeMap<i64, Row>;

/// Reference store: tables of timestamp columns keyed by primary key.
///
/// Every statement sent to it is logged, including ones later rolled back.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RefCell<BTreeMap<String, Table>>,
    statements: RefCell<Vec<UpdateStatement>>,
    failing_tables: RefCell<HashSet<String>>,
    clock: Cell<Option<DateTime<Utc>>>,
    clock_step: Cell<Duration>,
    clock_reads: Cell<usize>,
    commits: Cell<usize>,
    rollbacks: Cell<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: RefCell::new(BTreeMap::new()),
            statements: RefCell::new(Vec::new()),
            failing_tables: RefCell::new(HashSet::new()),
            clock: Cell::new(None),
            clock_step: Cell::new(Duration::zero()),
            clock_reads: Cell::new(0),
            commits: Cell::new(0),
            rollbacks: Cell::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose clock starts at `start` and advances by `step` per read
    pub fn with_clock(start: DateTime<Utc>, step: Duration) -> Self {
        let store = Self::default();
        store.clock.set(Some(start));
        store.clock_step.set(step);
        store
    }

    /// Add a row so updates can find it
    pub fn insert_row(&self, table: &str, pk: i64) {
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .entry(pk)
            .or_default();
    }

    /// Current value of one column, if ever written
    pub fn value(&self, table: &str, pk: i64, column: &str) -> Option<DateTime<Utc>> {
        self.tables
            .borrow()
            .get(table)
            .and_then(|t| t.get(&pk))
            .and_then(|row| row.get(column))
            .copied()
    }

    /// Make every update against `table` fail
    pub fn fail_updates_to(&self, table: &str) {
        self.failing_tables.borrow_mut().insert(table.to_string());
    }

    pub fn statements(&self) -> Vec<UpdateStatement> {
        self.statements.borrow().clone()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.borrow().len()
    }

    pub fn clear_statements(&self) {
        self.statements.borrow_mut().clear();
    }

    pub fn clock_reads(&self) -> usize {
        self.clock_reads.get()
    }

    pub fn commits(&self) -> usize {
        self.commits.get()
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.get()
    }
}

impl TouchStore for MemoryStore {
    fn now(&self) -> DateTime<Utc> {
        self.clock_reads.set(self.clock_reads.get() + 1);
        match self.clock.get() {
            Some(now) => {
                self.clock.set(Some(now + self.clock_step.get()));
                now
            }
            None => Utc::now(),
        }
    }

    fn update_all(&self, statement: &UpdateStatement) -> TouchResult<u64> {
        self.statements.borrow_mut().push(statement.clone());

        if self.failing_tables.borrow().contains(&statement.table) {
            return Err(statement.failed(format!("updates to '{}' are failing", statement.table)));
        }

        let mut tables = self.tables.borrow_mut();
        let Some(table) = tables.get_mut(&statement.table) else {
            return Ok(0);
        };

        let mut affected = 0;
        for id in &statement.ids {
            if let Some(row) = table.get_mut(id) {
                for column in &statement.columns {
                    row.insert(column.clone(), statement.value);
                }
                affected += 1;
            }
        }

        Ok(affected)
    }

    fn transaction(&self, body: &mut dyn FnMut() -> TouchResult<()>) -> TouchResult<()> {
        let snapshot = self.tables.borrow().clone();

        match body() {
            Ok(()) => {
                self.commits.set(self.commits.get() + 1);
                Ok(())
            }
            Err(e) => {
                *self.tables.borrow_mut() = snapshot;
                self.rollbacks.set(self.rollbacks.get() + 1);
                Err(e)
            }
        }
    }
}
