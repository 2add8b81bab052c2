//! Error types for schema resolution, view construction and bit access.

use thiserror::Error;

/// Errors produced while resolving a mapping or building a [crate::view_type::ViewType].
///
/// A malformed schema never yields a usable type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// `_index_` was used as a top-level field name.
    #[error("`_index_` is reserved for the range of nested field blocks")]
    ReservedKey,
    /// One or more entries are not a bit index, a range or a nested block.
    /// Every offending key is listed, nested keys as dotted paths.
    #[error("mapping contains unrecognized fields: {}", .0.join(", "))]
    UnrecognizedField(Vec<String>),
    /// The field claims bits already claimed by an earlier field.
    #[error("field `{field}` overlaps other fields at bits {colliding_bits:#b}")]
    Overlap { field: String, colliding_bits: u128 },
    /// A field starts after an open-ended field.
    #[error("field `{field}` follows an open-ended field")]
    TrailingAfterOpenEnded { field: String },
    /// The same name appears twice in one mapping level.
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    /// A field starts at or runs past the width available to it.
    #[error("field `{field}` does not fit the available {size} bits")]
    FieldBeyondSize { field: String, size: u32 },
    /// Size is zero or wider than [crate::bits::MAX_WIDTH].
    #[error("size must be between 1 and 128 bits, got {0}")]
    InvalidSize(u32),
    /// Mask is zero or has bits above the configured size.
    #[error("invalid mask {0:#b}")]
    InvalidMask(u128),
}

/// Errors produced when a bit range does not fit the view or the value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Index or range start lies beyond the configured size.
    #[error("index {index} is out of data length {size}")]
    OutOfBounds { index: u32, size: u32 },
    /// Negative bound, reversed bounds or an empty range.
    #[error("invalid range {start:?}..{stop:?}")]
    InvalidRange {
        start: Option<i64>,
        stop: Option<i64>,
    },
    /// Written value is wider than the destination range.
    #[error("data of {bits} bits does not fit a {width}-bit destination")]
    DataTooWide { bits: u32, width: u32 },
    /// Full-value write, range stop or in-place arithmetic exceeds the size.
    #[error("value of {bits} bits overflows {size}-bit data length")]
    Overflow { bits: u32, size: u32 },
    /// Arithmetic result would be negative.
    #[error("bit views cannot hold negative values")]
    Negative,
}

/// Errors produced by name-based access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("mapping is not available")]
    NoMapping,
    #[error("unknown field `{0}`")]
    UnknownField(String),
}

/// Errors produced when a payload is not a non-negative integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("bit views accept only non-negative integers, got {0}")]
    NonIntegerValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Linked views depend on their parent and cannot be stored alone.
    #[error("cannot serialize a linked view")]
    LinkedView,
}

/// Any error the crate can produce.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[cfg(feature = "serde")]
    #[error("schema JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_message_shows_bits() {
        let err = SchemaError::Overlap {
            field: "y".to_string(),
            colliding_bits: 0b10,
        };
        assert_eq!(
            err.to_string(),
            "field `y` overlaps other fields at bits 0b10"
        );
    }

    #[test]
    fn test_unrecognized_lists_all_keys() {
        let err = SchemaError::UnrecognizedField(vec!["a".to_string(), "b.c".to_string()]);
        assert_eq!(
            err.to_string(),
            "mapping contains unrecognized fields: a, b.c"
        );
    }

    #[test]
    fn test_umbrella_is_transparent() {
        let err: Error = LookupError::NoMapping.into();
        assert_eq!(err.to_string(), "mapping is not available");
        assert!(matches!(err, Error::Lookup(LookupError::NoMapping)));
    }
}
