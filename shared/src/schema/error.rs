use thiserror::Error;

use crate::FieldId;

/// Errors raised while reading typed values out of a [`SchemaObject`](super::SchemaObject)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Requested field has no values
    #[error("Schema field {field} is missing")]
    FieldMissing { field: FieldId },

    /// Field holds a value of another type
    #[error("Schema field {field} holds a {actual} value, expected {expected}")]
    TypeMismatch {
        field: FieldId,
        expected: &'static str,
        actual: &'static str,
    },

    /// Indexed read past the end of a list field
    #[error("Schema field {field} has {count} values, index {index} is out of range")]
    IndexOutOfRange {
        field: FieldId,
        index: usize,
        count: usize,
    },
}
