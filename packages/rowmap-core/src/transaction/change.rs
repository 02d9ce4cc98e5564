use crate::store::Row;

/// One applied store write, kept so it can be undone.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A row was inserted
    Insert {
        /// Table name
        table: String,
        /// Generated primary key
        id: i64,
    },
    /// A row was updated
    Update {
        /// Table name
        table: String,
        /// Row as it was before the update
        previous: Row,
    },
    /// A row was deleted
    Delete {
        /// Table name
        table: String,
        /// The removed row
        original: Row,
    },
}

impl Change {
    pub fn table(&self) -> &str {
        match self {
            Change::Insert { table, .. }
            | Change::Update { table, .. }
            | Change::Delete { table, .. } => table,
        }
    }
}
