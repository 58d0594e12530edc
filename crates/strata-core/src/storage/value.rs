//! Column types and dynamically typed cell values.

use rkyv::{Archive, Deserialize, Serialize};

/// Storage-side column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer.
    Int,
    /// Boolean value.
    Bool,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// UTF-8 string.
    String,
    /// Binary data.
    Binary,
    /// Timestamp (nanoseconds since Unix epoch).
    Timestamp,
    /// 12-byte object identifier.
    ObjectId,
    /// 128-bit decimal.
    Decimal,
    /// 128-bit UUID.
    Uuid,
    /// Any of the above, decided per cell.
    Mixed,
    /// Reference to a row in another table.
    Link,
}

/// Shape of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub enum CollectionKind {
    /// A single value.
    None,
    /// An ordered list.
    List,
    /// An unordered set.
    Set,
    /// A string-keyed dictionary.
    Dictionary,
}

/// Kind of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub enum TableType {
    /// Ordinary user-visible table.
    TopLevel,
    /// Rows exist only as the target of exactly one incoming link.
    Embedded,
    /// Write-only table whose rows are not queryable after commit.
    TopLevelAsymmetric,
}

/// Search index kinds a column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub enum IndexKind {
    /// No index.
    None,
    /// Equality/range search index.
    General,
    /// Tokenizing full-text index. Only valid on non-nullable strings.
    Fulltext,
}

/// A dynamically typed cell value.
///
/// A missing cell reads as [`Value::Null`].
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum Value {
    /// Null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// Timestamp (nanoseconds since Unix epoch).
    Timestamp(i64),
    /// 12-byte object identifier.
    ObjectId([u8; 12]),
    /// Raw 128-bit decimal.
    Decimal([u8; 16]),
    /// 128-bit UUID.
    Uuid([u8; 16]),
    /// Row key in the link target table.
    Link(u64),
}

impl Value {
    /// Whether this value can be stored in a column of the given type.
    ///
    /// `Null` is accepted for every type; nullability is enforced by the
    /// table, not the cell.
    pub fn matches(&self, data_type: DataType) -> bool {
        if data_type == DataType::Mixed {
            return true;
        }
        matches!(
            (self, data_type),
            (Value::Null, _)
                | (Value::Bool(_), DataType::Bool)
                | (Value::Int(_), DataType::Int)
                | (Value::Float(_), DataType::Float)
                | (Value::Double(_), DataType::Double)
                | (Value::String(_), DataType::String)
                | (Value::Binary(_), DataType::Binary)
                | (Value::Timestamp(_), DataType::Timestamp)
                | (Value::ObjectId(_), DataType::ObjectId)
                | (Value::Decimal(_), DataType::Decimal)
                | (Value::Uuid(_), DataType::Uuid)
                | (Value::Link(_), DataType::Link)
        )
    }

    /// The zero value a null cell is back-filled with when a column becomes
    /// required. Link and mixed columns stay null; they cannot be made
    /// required.
    pub fn zero_for(data_type: DataType) -> Value {
        match data_type {
            DataType::Int => Value::Int(0),
            DataType::Bool => Value::Bool(false),
            DataType::Float => Value::Float(0.0),
            DataType::Double => Value::Double(0.0),
            DataType::String => Value::String(String::new()),
            DataType::Binary => Value::Binary(Vec::new()),
            DataType::Timestamp => Value::Timestamp(0),
            DataType::ObjectId => Value::ObjectId([0; 12]),
            DataType::Decimal => Value::Decimal([0; 16]),
            DataType::Uuid => Value::Uuid([0; 16]),
            DataType::Mixed | DataType::Link => Value::Null,
        }
    }

    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl DataType {
    /// Whether a general search index can be added to columns of this type.
    pub fn supports_search_index(&self) -> bool {
        matches!(
            self,
            DataType::Int
                | DataType::Bool
                | DataType::String
                | DataType::Timestamp
                | DataType::ObjectId
                | DataType::Uuid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_matches_type() {
        assert!(Value::Int(7).matches(DataType::Int));
        assert!(!Value::Int(7).matches(DataType::String));
        assert!(Value::Null.matches(DataType::Int));
        assert!(Value::String("x".into()).matches(DataType::Mixed));
        assert!(Value::Link(3).matches(DataType::Link));
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(Value::zero_for(DataType::Int), Value::Int(0));
        assert_eq!(Value::zero_for(DataType::String), Value::String(String::new()));
        assert_eq!(Value::zero_for(DataType::Link), Value::Null);
    }

    #[test]
    fn test_search_index_support() {
        assert!(DataType::String.supports_search_index());
        assert!(DataType::Timestamp.supports_search_index());
        assert!(!DataType::Double.supports_search_index());
        assert!(!DataType::Binary.supports_search_index());
    }
}
