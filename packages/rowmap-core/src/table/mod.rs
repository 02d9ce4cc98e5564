//! Table descriptors, column definitions, and references.

mod column;
mod reference;
#[allow(clippy::module_inception)]
mod table;
pub(crate) mod validation;

pub use column::Column;
pub use reference::{Reference, ReferenceStyle};
pub use table::{PrimaryKeyStrategy, TableBuilder, TableDef, ID_COLUMN};
