use log::{debug, info, warn};
use super::batch::apply_group;
use crate::error::{TouchError, TouchResult};
use crate::metrics::FlushMetrics;
use crate::queue::{GroupKey, PendingGroup};
use crate::scope::TouchContext;
use crate::store::TouchStore;

/// Flush every pending touch, repeating until callbacks stop adding more.
///
/// The workflow:
///
/// 1. Drain the registry (one pass)
/// 2. Read the store clock once for the whole pass
/// 3. Apply every group inside one store transaction
/// 4. Callbacks may register new touches; repeat while any are pending
///
/// # Correctness
///
/// - Touches stay deferred for the whole flush (`flushing` flag)
/// - A failed pass rolls back and discards anything registered during it
/// - The pass cap turns a callback loop into `FlushPassLimitExceeded`
/// - A panicking callback leaves nothing pending behind
pub(crate) fn flush_pending<S: TouchStore>(ctx: &TouchContext<S>) -> TouchResult<()> {
    if !ctx.has_pending() {
        return Ok(());
    }

    let _flushing = FlushingGuard::set(ctx);
    let timer = FlushMetrics::record_flush_start();

    let mut passes = 0;
    let mut records = 0;
    while ctx.has_pending() {
        if let Some(max_passes) = ctx.config().max_flush_passes {
            if passes >= max_passes {
                let pending = ctx.discard_pending();
                warn!(
                    "deferred touch flush gave up after {} passes, discarded {} touches",
                    passes, pending
                );
                return Err(TouchError::FlushPassLimitExceeded { max_passes, pending });
            }
        }
        passes += 1;

        let groups = ctx.pending().borrow_mut().drain();
        records += run_pass(ctx, passes, &groups)?;
    }

    info!("deferred touch flush: {} records in {} passes", records, passes);
    ctx.metrics().borrow_mut().record_flush_complete(passes, timer);

    Ok(())
}

fn run_pass<S: TouchStore>(
    ctx: &TouchContext<S>,
    pass: usize,
    groups: &[(GroupKey, PendingGroup)],
) -> TouchResult<usize> {
    let now = ctx.store().now();
    debug!("deferred touch pass {}: {} groups at {}", pass, groups.len(), now);

    let mut touched = 0;
    let result = ctx.store().transaction(&mut || {
        touched = 0;
        for (key, group) in groups {
            touched += apply_group(ctx, key, group, now)?;
        }
        Ok(())
    });

    if let Err(e) = result {
        let dropped = ctx.discard_pending();
        if dropped > 0 {
            warn!("discarded {} touches registered during failed pass {}", dropped, pass);
        }
        return Err(e);
    }

    Ok(touched)
}

/// Sets the `flushing` flag for the lifetime of the guard, restoring it on
/// drop. Unwinding out of a flush also drops whatever callbacks queued.
struct FlushingGuard<'a, S: TouchStore> {
    ctx: &'a TouchContext<S>,
    previous: bool,
}

impl<'a, S: TouchStore> FlushingGuard<'a, S> {
    fn set(ctx: &'a TouchContext<S>) -> Self {
        let previous = ctx.flushing().replace(true);
        Self { ctx, previous }
    }
}

impl<S: TouchStore> Drop for FlushingGuard<'_, S> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let dropped = self.ctx.discard_pending();
            if dropped > 0 {
                warn!("discarded {} deferred touches after a panic during flush", dropped);
            }
        }
        self.ctx.flushing().set(self.previous);
    }
}
