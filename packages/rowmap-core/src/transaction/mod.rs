//! Scopes, undo journals and rollback.

mod change;
mod scope;
#[allow(clippy::module_inception)]
mod transaction;

pub use change::Change;
pub use scope::Scope;
pub use transaction::Transaction;
