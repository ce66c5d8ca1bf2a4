use indexmap::IndexMap;
use super::key::{GroupKey, RecordKey};
use crate::error::TouchResult;
use crate::record::RecordRef;
use crate::utils::validate_identifier;

/// One deduplicated record inside a group
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub record: RecordRef,

    /// How many touch calls were coalesced into this entry
    pub requests: usize,
}

/// All records sharing one update statement
#[derive(Debug, Clone, Default)]
pub struct PendingGroup {
    records: IndexMap<RecordKey, PendingRecord>,
}

impl PendingGroup {
    /// Group holding exactly one touch request
    pub(crate) fn single(record: &RecordRef) -> Self {
        let mut group = Self::default();
        group.add(record);
        group
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total touch calls across the group
    pub fn requests(&self) -> usize {
        self.records.values().map(|r| r.requests).sum()
    }

    /// Records in first-registration order
    pub fn records(&self) -> impl Iterator<Item = &PendingRecord> {
        self.records.values()
    }

    fn add(&mut self, record: &RecordRef) {
        self.records
            .entry(record.key().clone())
            .and_modify(|pending| pending.requests += 1)
            .or_insert_with(|| PendingRecord {
                record: record.clone(),
                requests: 1,
            });
    }
}

/// Context-local registry of deferred touches
///
/// - Populated by `TouchContext::touch` while a deferred scope is open
/// - Deduplicated by (table, pk) within each group
/// - Drained by the flush executor once the outermost scope exits
#[derive(Debug, Default)]
pub struct PendingTouches {
    groups: IndexMap<GroupKey, PendingGroup>,
}

impl PendingTouches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `record` for a touch of the default columns plus `attributes`.
    ///
    /// Returns `Ok(false)` without registering when the record opts out of
    /// touch tracking.
    ///
    /// The opt-out check needs to borrow the record. A record that is
    /// already mutably borrowed is registered as opted in. That is right for
    /// a record touching itself from `after_touch`, but it also applies when
    /// application code holds the borrow, so an opted-out record touched
    /// under its own `borrow_mut` is still queued.
    pub fn register(&mut self, record: &RecordRef, attributes: &[&str]) -> TouchResult<bool> {
        if record.with(|r| r.no_touching()).unwrap_or(false) {
            return Ok(false);
        }

        for attribute in attributes {
            validate_identifier(attribute)?;
        }

        let key = GroupKey::new(record.table_name(), attributes);
        self.groups.entry(key).or_default().add(record);
        Ok(true)
    }

    pub fn has_pending(&self) -> bool {
        self.groups.values().any(|g| !g.is_empty())
    }

    /// Take every group in registration order, leaving the registry empty
    pub fn drain(&mut self) -> Vec<(GroupKey, PendingGroup)> {
        std::mem::take(&mut self.groups).into_iter().collect()
    }

    /// Number of groups (distinct statements a flush would issue)
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of (group, record) entries
    pub fn record_count(&self) -> usize {
        self.groups.values().map(PendingGroup::len).sum()
    }

    pub(crate) fn groups(&self) -> impl Iterator<Item = (&GroupKey, &PendingGroup)> {
        self.groups.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use crate::error::testing::assert_error_sqlstate;
    use crate::record::Touchable;

    struct Row {
        table: &'static str,
        id: i64,
        opted_out: bool,
    }

    impl Touchable for Row {
        fn table_name(&self) -> &str {
            self.table
        }

        fn primary_key(&self) -> i64 {
            self.id
        }

        fn no_touching(&self) -> bool {
            self.opted_out
        }

        fn write_timestamp(&mut self, _column: &str, _value: DateTime<Utc>) {}
    }

    fn row(table: &'static str, id: i64) -> RecordRef {
        RecordRef::new(Row { table, id, opted_out: false }).0
    }

    #[test]
    fn test_register_dedups_by_identity() {
        let mut pending = PendingTouches::new();
        let post = row("posts", 1);

        assert!(pending.register(&post, &["viewed_at"]).unwrap());
        assert!(pending.register(&post, &["viewed_at"]).unwrap());

        assert_eq!(pending.group_count(), 1);
        assert_eq!(pending.record_count(), 1);

        let groups = pending.drain();
        assert_eq!(groups[0].1.requests(), 2);
    }

    #[test]
    fn test_register_splits_by_attributes_and_table() {
        let mut pending = PendingTouches::new();
        let post = row("posts", 1);
        let comment = row("comments", 1);

        pending.register(&post, &[]).unwrap();
        pending.register(&post, &["viewed_at"]).unwrap();
        pending.register(&comment, &[]).unwrap();

        assert_eq!(pending.group_count(), 3);
        assert_eq!(pending.record_count(), 3);
    }

    #[test]
    fn test_register_skips_opted_out_records() {
        let mut pending = PendingTouches::new();
        let (ignored, _) = RecordRef::new(Row { table: "posts", id: 9, opted_out: true });

        assert!(!pending.register(&ignored, &[]).unwrap());
        assert!(!pending.has_pending());
    }

    #[test]
    fn test_register_treats_borrowed_record_as_opted_in() {
        let mut pending = PendingTouches::new();
        let (ignored, typed) = RecordRef::new(Row { table: "posts", id: 9, opted_out: true });

        let _guard = typed.borrow_mut();
        assert!(pending.register(&ignored, &[]).unwrap());
        assert_eq!(pending.record_count(), 1);
    }

    #[test]
    fn test_register_rejects_bad_attribute() {
        let mut pending = PendingTouches::new();
        assert_error_sqlstate(pending.register(&row("posts", 1), &["bad name"]), "42602");
        assert!(!pending.has_pending());
    }

    #[test]
    fn test_drain_empties_registry_in_order() {
        let mut pending = PendingTouches::new();
        pending.register(&row("posts", 2), &[]).unwrap();
        pending.register(&row("comments", 1), &[]).unwrap();
        pending.register(&row("posts", 1), &[]).unwrap();

        let groups = pending.drain();
        assert!(!pending.has_pending());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.table, "posts");

        let pks: Vec<i64> = groups[0].1.records().map(|r| r.record.primary_key()).collect();
        assert_eq!(pks, vec![2, 1]);

        assert!(pending.drain().is_empty());
    }
}
