//! Predicates and statement builders for the CRUD executor.

mod executor;
mod op;
mod statement;

pub use executor::EntityIter;
pub use op::{BoundOp, Op, Slot};
pub use statement::{InsertStatement, UpdateStatement};

pub(crate) use statement::{bind_assignment, check_not_null};
