//! Scope controller: the touch context and its deferred scopes.
//!
//! A `TouchContext` owns everything that used to be per-thread state: the
//! reentrancy depth, the pending registry, suppression scopes and metrics.
//! It is passed explicitly (or shared by reference) through the call chain.

use std::cell::{Cell, RefCell};
use log::{debug, warn};
use crate::config::TouchConfig;
use crate::error::{TouchError, TouchResult};
use crate::flush;
use crate::metrics::{FlushMetrics, TouchStats};
use crate::queue::{PendingEntry, PendingTouches, QueueStats};
use crate::record::{RecordRef, Toucher};
use crate::store::TouchStore;

/// Entry point for touching records.
pub struct TouchContext<S: TouchStore> {
    store: S,
    config: TouchConfig,
    depth: Cell<u32>,
    flushing: Cell<bool>,
    pending: RefCell<PendingTouches>,
    /// Active `no_touching` scopes; `None` suppresses every table
    suppressed: RefCell<Vec<Option<String>>>,
    metrics: RefCell<FlushMetrics>,
}

impl<S: TouchStore> TouchContext<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, TouchConfig::default())
    }

    pub fn with_config(store: S, config: TouchConfig) -> Self {
        Self {
            store,
            config,
            depth: Cell::new(0),
            flushing: Cell::new(false),
            pending: RefCell::new(PendingTouches::new()),
            suppressed: RefCell::new(Vec::new()),
            metrics: RefCell::new(FlushMetrics::default()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TouchConfig {
        &self.config
    }

    /// Current nesting depth of deferred scopes
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    /// Run `body`, batching every touch issued during it.
    ///
    /// Nested calls compose: only the outermost one flushes. The flush runs
    /// whether `body` succeeded or failed; a body error wins over a flush
    /// error.
    pub fn run_deferred<T, E>(&self, body: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<TouchError>,
    {
        if !self.config.enabled {
            return body(self);
        }

        let guard = ScopeGuard::enter(self);
        let result = body(self);
        let outermost = guard.exit();

        if !outermost || self.flushing.get() {
            return result;
        }

        match (result, flush::flush_pending(self)) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(flush_err)) => Err(flush_err.into()),
            (Err(body_err), Ok(())) => Err(body_err),
            (Err(body_err), Err(flush_err)) => {
                warn!("deferred touch flush failed after body error: {}", flush_err);
                Err(body_err)
            }
        }
    }

    /// Touch `record`: deferred inside `run_deferred`, immediate otherwise.
    pub fn touch(&self, record: &RecordRef, attributes: &[&str]) -> TouchResult<()> {
        if self.is_suppressed(record.table_name()) {
            debug!("touch of {} row {} suppressed", record.table_name(), record.primary_key());
            return Ok(());
        }

        if self.is_deferring() {
            let registered = self.pending.borrow_mut().register(record, attributes)?;
            if !registered {
                debug!("{} row {} opts out of touching", record.table_name(), record.primary_key());
            }
            return Ok(());
        }

        flush::touch_now(self, record, attributes)
    }

    /// Whether touches are currently deferred instead of written
    pub fn is_deferring(&self) -> bool {
        self.depth.get() > 0 || self.flushing.get()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.borrow().has_pending()
    }

    /// Run `body` with every touch ignored
    pub fn no_touching<T>(&self, body: impl FnOnce(&Self) -> T) -> T {
        let _guard = SuppressGuard::push(self, None);
        body(self)
    }

    /// Run `body` with touches of `table` ignored
    pub fn no_touching_for<T>(&self, table: &str, body: impl FnOnce(&Self) -> T) -> T {
        let _guard = SuppressGuard::push(self, Some(table.to_string()));
        body(self)
    }

    pub fn is_suppressed(&self, table: &str) -> bool {
        self.suppressed
            .borrow()
            .iter()
            .any(|scope| match scope {
                None => true,
                Some(t) => t == table,
            })
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.pending.borrow().stats()
    }

    pub fn queue_contents(&self) -> Vec<PendingEntry> {
        self.pending.borrow().contents()
    }

    /// Snapshot of flush metrics
    pub fn stats(&self) -> TouchStats {
        let queue_size = self.pending.borrow().record_count();
        self.metrics.borrow().snapshot(queue_size)
    }

    pub fn reset_metrics(&self) {
        *self.metrics.borrow_mut() = FlushMetrics::default();
    }

    pub(crate) fn pending(&self) -> &RefCell<PendingTouches> {
        &self.pending
    }

    pub(crate) fn metrics(&self) -> &RefCell<FlushMetrics> {
        &self.metrics
    }

    pub(crate) fn flushing(&self) -> &Cell<bool> {
        &self.flushing
    }

    /// Drop all pending touches, returning how many entries were lost
    pub(crate) fn discard_pending(&self) -> usize {
        let dropped: usize = self
            .pending
            .borrow_mut()
            .drain()
            .iter()
            .map(|(_, group)| group.len())
            .sum();
        if dropped > 0 {
            self.metrics.borrow_mut().record_discarded(dropped);
        }
        dropped
    }

    fn enter_scope(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    fn leave_scope(&self) -> u32 {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        depth
    }
}

impl<S: TouchStore> Toucher for TouchContext<S> {
    fn touch(&self, record: &RecordRef, attributes: &[&str]) -> TouchResult<()> {
        TouchContext::touch(self, record, attributes)
    }

    fn is_deferring(&self) -> bool {
        TouchContext::is_deferring(self)
    }
}

// Use a guard pattern to ensure the depth is restored even on panic
struct ScopeGuard<'a, S: TouchStore> {
    ctx: &'a TouchContext<S>,
    armed: bool,
}

impl<'a, S: TouchStore> ScopeGuard<'a, S> {
    fn enter(ctx: &'a TouchContext<S>) -> Self {
        ctx.enter_scope();
        Self { ctx, armed: true }
    }

    /// Leave the scope normally; true when this was the outermost scope
    fn exit(mut self) -> bool {
        self.armed = false;
        self.ctx.leave_scope() == 0
    }
}

impl<S: TouchStore> Drop for ScopeGuard<'_, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        // Unwinding: never flush here, just make sure no state is left behind
        if self.ctx.leave_scope() == 0 && !self.ctx.flushing.get() {
            let dropped = self.ctx.discard_pending();
            if dropped > 0 {
                warn!("discarded {} deferred touches while unwinding", dropped);
            }
        }
    }
}

struct SuppressGuard<'a, S: TouchStore> {
    ctx: &'a TouchContext<S>,
}

impl<'a, S: TouchStore> SuppressGuard<'a, S> {
    fn push(ctx: &'a TouchContext<S>, table: Option<String>) -> Self {
        ctx.suppressed.borrow_mut().push(table);
        Self { ctx }
    }
}

impl<S: TouchStore> Drop for SuppressGuard<'_, S> {
    fn drop(&mut self) {
        self.ctx.suppressed.borrow_mut().pop();
    }
}
