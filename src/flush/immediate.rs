use log::debug;
use super::batch::apply_group;
use crate::error::{TouchError, TouchResult};
use crate::queue::{GroupKey, PendingGroup};
use crate::record::RecordRef;
use crate::scope::TouchContext;
use crate::store::TouchStore;
use crate::utils::validate_identifier;

/// Native single-record touch, used outside deferred scopes.
///
/// Same write path as a flush group of one, wrapped in its own transaction.
pub(crate) fn touch_now<S: TouchStore>(
    ctx: &TouchContext<S>,
    record: &RecordRef,
    attributes: &[&str],
) -> TouchResult<()> {
    let (opted_out, persisted) = record.with(|r| (r.no_touching(), r.is_persisted()))?;
    if opted_out {
        debug!("{} row {} opts out of touching", record.table_name(), record.primary_key());
        return Ok(());
    }

    if !persisted {
        return Err(TouchError::RecordNotPersisted {
            table: record.table_name().to_string(),
            pk: record.primary_key(),
        });
    }

    for attribute in attributes {
        validate_identifier(attribute)?;
    }

    let key = GroupKey::new(record.table_name(), attributes);
    let group = PendingGroup::single(record);
    let now = ctx.store().now();

    ctx.store()
        .transaction(&mut || apply_group(ctx, &key, &group, now).map(|_| ()))
}
