use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DbError;

use super::value::Value;

/// Storage type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 64-bit signed integer
    Long,
    /// 32-bit signed integer
    Integer,
    /// Boolean
    Bool,
    /// 64-bit float
    Double,
    /// Text with a maximum length in characters
    Varchar(u32),
    /// Unbounded text
    Text,
}

impl ColumnType {
    /// Converts a value into the representation stored for this column type.
    ///
    /// `Null` passes through unchanged; nullability is checked by the caller.
    /// Integers widen into long and double columns.
    ///
    /// # Returns
    /// `Result<Value, DbError>` containing the coerced value, or
    /// `DbError::TypeMismatch` if the value does not fit the column.
    pub fn coerce(&self, value: Value) -> Result<Value, DbError> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (ColumnType::Long, Value::Long(v)) => Ok(Value::Long(v)),
            (ColumnType::Long, Value::Integer(v)) => Ok(Value::Long(i64::from(v))),
            (ColumnType::Integer, Value::Integer(v)) => Ok(Value::Integer(v)),
            (ColumnType::Integer, Value::Long(v)) => i32::try_from(v)
                .map(Value::Integer)
                .map_err(|_| DbError::TypeMismatch {
                    expected: self.to_string(),
                    got: format!("long {} out of range", v),
                }),
            (ColumnType::Bool, Value::Bool(v)) => Ok(Value::Bool(v)),
            (ColumnType::Double, Value::Double(v)) if v.is_finite() => Ok(Value::Double(v)),
            (ColumnType::Double, Value::Double(v)) => Err(DbError::TypeMismatch {
                expected: "finite double".to_string(),
                got: v.to_string(),
            }),
            (ColumnType::Double, Value::Integer(v)) => Ok(Value::Double(f64::from(v))),
            (ColumnType::Varchar(max), Value::Text(s)) => {
                let len = s.chars().count();
                if len > *max as usize {
                    return Err(DbError::TypeMismatch {
                        expected: self.to_string(),
                        got: format!("text of length {}", len),
                    });
                }
                Ok(Value::Text(s))
            }
            (ColumnType::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (_, other) => Err(DbError::TypeMismatch {
                expected: self.to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Long => write!(f, "long"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Bool => write!(f, "bool"),
            ColumnType::Double => write!(f, "double"),
            ColumnType::Varchar(max) => write!(f, "varchar({})", max),
            ColumnType::Text => write!(f, "text"),
        }
    }
}
