use serde::Serialize;
use super::state::PendingTouches;

/// Queue statistics for introspection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Distinct (table, attributes) groups
    pub groups: usize,
    /// Deduplicated record entries
    pub records: usize,
    /// Touch calls coalesced into those entries
    pub requests: usize,
    /// Distinct tables with pending touches
    pub tables: Vec<String>,
}

/// One pending entry, for debugging output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEntry {
    pub table: String,
    pub pk: i64,
    pub attributes: Vec<String>,
    pub requests: usize,
}

impl PendingTouches {
    /// Get current queue statistics
    pub fn stats(&self) -> QueueStats {
        let mut tables: Vec<String> = Vec::new();
        let mut requests = 0;

        for (key, group) in self.groups() {
            if !tables.contains(&key.table) {
                tables.push(key.table.clone());
            }
            requests += group.requests();
        }

        QueueStats {
            groups: self.group_count(),
            records: self.record_count(),
            requests,
            tables,
        }
    }

    /// Get a copy of current queue contents (for debugging)
    pub fn contents(&self) -> Vec<PendingEntry> {
        self.groups()
            .flat_map(|(key, group)| {
                group.records().map(move |pending| PendingEntry {
                    table: key.table.clone(),
                    pk: pending.record.primary_key(),
                    attributes: key.attributes.clone(),
                    requests: pending.requests,
                })
            })
            .collect()
    }
}
