use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an entity: table name plus primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    table: String,
    value: i64,
}

impl EntityId {
    pub fn new(table: impl Into<String>, value: i64) -> Self {
        Self {
            table: table.into(),
            value,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.table, self.value)
    }
}
