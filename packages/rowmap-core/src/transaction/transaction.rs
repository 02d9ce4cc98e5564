use tracing::{debug, error};

use crate::error::DbError;
use crate::store::RowStore;

use super::change::Change;

/// Undo journal for the writes made inside one scope.
///
/// Writes reach the store immediately; rollback replays the journal
/// backwards and restores every touched row.
#[derive(Debug, Default)]
pub struct Transaction {
    /// Applied changes in write order
    changes: Vec<Change>,
    /// Whether the transaction has been committed
    committed: bool,
    /// Whether the transaction has been rolled back
    aborted: bool,
}

impl Transaction {
    /// Creates a new empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an applied change to the journal.
    pub fn record(&mut self, change: Change) -> Result<(), DbError> {
        self.check_active()?;
        self.changes.push(change);
        Ok(())
    }

    /// Returns the journaled changes in write order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Commits the transaction and discards the journal.
    pub fn commit(&mut self) -> Result<(), DbError> {
        self.check_active()?;
        debug!("Committing transaction with {} changes", self.changes.len());
        self.changes.clear();
        self.committed = true;
        Ok(())
    }

    /// Undoes every journaled change, newest first.
    ///
    /// Undo keeps going past failures and reports the first one.
    ///
    /// # Arguments
    /// * `store` - Store the changes were applied to
    ///
    /// # Returns
    /// `Result<(), DbError>` with the first undo failure, if any.
    pub fn rollback(&mut self, store: &dyn RowStore) -> Result<(), DbError> {
        self.check_active()?;
        self.aborted = true;
        debug!("Rolling back transaction with {} changes", self.changes.len());

        let mut first_error = None;
        for change in self.changes.drain(..).rev() {
            let result = match change {
                Change::Insert { table, id } => match store.delete(&table, id) {
                    Ok(_) | Err(DbError::RecordNotFound { .. }) => Ok(()),
                    Err(e) => Err(e),
                },
                Change::Update { table, previous } => store.restore_row(&table, previous),
                Change::Delete { table, original } => store.restore_row(&table, original),
            };
            if let Err(e) = result {
                error!("Failed to undo change: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Returns whether the transaction has been committed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Returns whether the transaction has been rolled back.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Returns whether the transaction is still active.
    pub fn is_active(&self) -> bool {
        !self.committed && !self.aborted
    }

    pub(crate) fn check_active(&self) -> Result<(), DbError> {
        if self.committed {
            return Err(DbError::TransactionConflict(
                "transaction already committed".to_string(),
            ));
        }
        if self.aborted {
            return Err(DbError::TransactionConflict(
                "transaction aborted".to_string(),
            ));
        }
        Ok(())
    }
}
