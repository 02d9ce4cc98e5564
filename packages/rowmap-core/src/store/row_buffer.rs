//! Copy-on-write row storage using ArcSwap for lock-free reads.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::row::Row;

/// Rows of one table, kept sorted by primary key.
///
/// Readers load an `Arc` snapshot without locking. Writers build a new
/// vector and swap it in; callers serialize writers externally.
#[derive(Debug)]
pub(crate) struct RowBuffer {
    inner: ArcSwap<Vec<Row>>,
}

impl RowBuffer {
    /// Creates an empty buffer with room for `initial_capacity` rows.
    pub(crate) fn new(initial_capacity: usize) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(Vec::with_capacity(initial_capacity))),
        }
    }

    /// Creates a buffer from rows, sorting them by key.
    pub(crate) fn from_rows(mut rows: Vec<Row>) -> Self {
        rows.sort_by_key(|r| r.id);
        Self {
            inner: ArcSwap::new(Arc::new(rows)),
        }
    }

    /// Returns the current snapshot.
    pub(crate) fn load(&self) -> Arc<Vec<Row>> {
        self.inner.load_full()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Returns a copy of the row with the given key.
    pub(crate) fn find(&self, id: i64) -> Option<Row> {
        let rows = self.inner.load();
        find_in(&rows, id).cloned()
    }

    /// Inserts a row. Returns `false` if the key is taken.
    pub(crate) fn insert(&self, row: Row) -> bool {
        let current = self.inner.load_full();
        let position = match current.binary_search_by_key(&row.id, |r| r.id) {
            Ok(_) => return false,
            Err(position) => position,
        };
        let mut rows = Vec::with_capacity(current.len() + 1);
        rows.extend_from_slice(&current[..position]);
        rows.push(row);
        rows.extend_from_slice(&current[position..]);
        self.inner.store(Arc::new(rows));
        true
    }

    /// Inserts or replaces a row. Returns the replaced row.
    pub(crate) fn upsert(&self, row: Row) -> Option<Row> {
        let current = self.inner.load_full();
        let mut rows = Vec::clone(&current);
        let previous = match rows.binary_search_by_key(&row.id, |r| r.id) {
            Ok(position) => Some(std::mem::replace(&mut rows[position], row)),
            Err(position) => {
                rows.insert(position, row);
                None
            }
        };
        self.inner.store(Arc::new(rows));
        previous
    }

    /// Applies `f` to the row with the given key. Returns the row as it was.
    pub(crate) fn modify<F>(&self, id: i64, f: F) -> Option<Row>
    where
        F: FnOnce(&mut Row),
    {
        let current = self.inner.load_full();
        let position = current.binary_search_by_key(&id, |r| r.id).ok()?;
        let mut rows = Vec::clone(&current);
        let previous = rows[position].clone();
        f(&mut rows[position]);
        self.inner.store(Arc::new(rows));
        Some(previous)
    }

    /// Removes the row with the given key.
    pub(crate) fn remove(&self, id: i64) -> Option<Row> {
        let current = self.inner.load_full();
        let position = current.binary_search_by_key(&id, |r| r.id).ok()?;
        let mut rows = Vec::clone(&current);
        let removed = rows.remove(position);
        self.inner.store(Arc::new(rows));
        Some(removed)
    }
}

/// Binary search over a sorted snapshot.
pub(crate) fn find_in(rows: &[Row], id: i64) -> Option<&Row> {
    rows.binary_search_by_key(&id, |r| r.id)
        .ok()
        .map(|position| &rows[position])
}
