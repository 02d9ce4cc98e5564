use std::sync::Arc;

use crate::query::BoundOp;

use super::row::Row;

/// Lazy, forward-only iteration over a table snapshot.
///
/// The snapshot is taken when the cursor is opened; later writes are not
/// observed. Re-run the select to start over.
#[derive(Debug)]
pub struct RowCursor {
    table: String,
    rows: Arc<Vec<Row>>,
    position: usize,
    filter: Option<BoundOp>,
}

impl RowCursor {
    pub fn new(table: impl Into<String>, rows: Arc<Vec<Row>>, filter: Option<BoundOp>) -> Self {
        Self {
            table: table.into(),
            rows,
            position: 0,
            filter,
        }
    }

    /// Name of the table being iterated.
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Iterator for RowCursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        while let Some(row) = self.rows.get(self.position) {
            self.position += 1;
            let keep = match &self.filter {
                Some(filter) => filter.matches(row),
                None => true,
            };
            if keep {
                return Some(row.clone());
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rows.len().saturating_sub(self.position);
        match self.filter {
            Some(_) => (0, Some(remaining)),
            None => (remaining, Some(remaining)),
        }
    }
}
