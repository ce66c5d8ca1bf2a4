//! Apply one (table, attributes) group as a single update statement.
//!
//! 1. **Columns**: record type's timestamp columns plus the group's attributes
//! 2. **In-memory write**: every still-persisted record gets the pass timestamp, dirty state cleared
//! 3. **Statement**: one `UPDATE ... WHERE pk IN (...)` over every pk in the group
//! 4. **Callbacks**: `after_touch` once per coalesced touch request

use chrono::{DateTime, Utc};
use log::debug;
use crate::error::TouchResult;
use crate::queue::{GroupKey, PendingGroup};
use crate::record::RecordRef;
use crate::scope::TouchContext;
use crate::store::{TouchStore, UpdateStatement};

/// Apply `group` with timestamp `now`, returning the number of records touched.
pub(crate) fn apply_group<S: TouchStore>(
    ctx: &TouchContext<S>,
    key: &GroupKey,
    group: &PendingGroup,
    now: DateTime<Utc>,
) -> TouchResult<usize> {
    let Some(first) = group.records().next() else {
        return Ok(0);
    };

    let (own_columns, pk_column) = first
        .record
        .with(|r| (r.timestamp_columns(), r.primary_key_column().to_string()))?;
    let timestamp_columns =
        own_columns.unwrap_or_else(|| ctx.config().default_timestamp_columns.clone());
    let columns = key.columns(&timestamp_columns);

    for pending in group.records() {
        let written = pending.record.with_mut(|r| {
            if !r.is_persisted() {
                return false;
            }
            for column in &columns {
                r.write_timestamp(column, now);
            }
            r.clear_attribute_changes(&columns);
            true
        })?;
        if !written {
            debug!(
                "{} row {} no longer persisted; skipping in-memory write",
                key.table,
                pending.record.primary_key()
            );
        }
    }

    if columns.is_empty() {
        debug!("{} has no timestamp columns to write; running callbacks only", key.table);
    } else {
        let ids = group.records().map(|p| p.record.primary_key()).collect();
        let statement = UpdateStatement::new(&key.table, &pk_column, columns, now, ids)?;
        if ctx.config().log_statements {
            debug!("{}", statement.to_sql());
        }

        let rows = ctx.store().update_all(&statement)?;
        debug!("{}: {} of {} rows updated", key.table, rows, statement.ids.len());
        ctx.metrics().borrow_mut().record_statement(rows);
    }

    ctx.metrics().borrow_mut().record_touched(group.len());

    for pending in group.records() {
        for _ in 0..pending.requests {
            run_callback(ctx, &pending.record)?;
        }
    }

    Ok(group.len())
}

fn run_callback<S: TouchStore>(ctx: &TouchContext<S>, record: &RecordRef) -> TouchResult<()> {
    record.with_mut(|r| r.after_touch(ctx))??;
    ctx.metrics().borrow_mut().record_callback();
    Ok(())
}
