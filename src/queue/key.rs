use std::hash::{Hash, Hasher};

/// Identifies a unique record to touch: (table, pk)
///
/// Example: RecordKey { table: "posts".to_string(), pk: 42 }
/// represents the row in posts with id = 42
#[derive(Debug, Clone, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct RecordKey {
    /// Table name (e.g., "posts", "comments")
    pub table: String,

    /// Primary key value
    pub pk: i64,
}

impl RecordKey {
    pub fn new(table: impl Into<String>, pk: i64) -> Self {
        Self { table: table.into(), pk }
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.pk == other.pk
    }
}

impl Hash for RecordKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.pk.hash(state);
    }
}

/// Groups touches that can share one update statement: (table, attribute set)
///
/// `attributes` is sorted and deduplicated, so `touch(r, &["b", "a", "a"])`
/// and `touch(r, &["a", "b"])` land in the same group. An empty set means
/// "default timestamp columns only".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct GroupKey {
    pub table: String,
    pub attributes: Vec<String>,
}

impl GroupKey {
    pub fn new(table: impl Into<String>, attributes: &[&str]) -> Self {
        let mut attributes: Vec<String> = attributes.iter().map(|a| (*a).to_string()).collect();
        attributes.sort();
        attributes.dedup();
        Self { table: table.into(), attributes }
    }

    /// Full column list for this group: timestamp columns first, then
    /// explicit attributes not already among them.
    pub fn columns(&self, timestamp_columns: &[String]) -> Vec<String> {
        let mut columns: Vec<String> = Vec::with_capacity(timestamp_columns.len() + self.attributes.len());
        for column in timestamp_columns.iter().chain(self.attributes.iter()) {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        columns
    }
}
