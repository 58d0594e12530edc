//! Property definitions for object classes.

use crate::storage::{CollectionKind, ColumnKey, DataType, IndexKind};

/// Base kinds a property can have.
///
/// `Object` is a link to another class; `LinkingObjects` is the computed
/// inverse view of such a link and never materializes as a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Int,
    Bool,
    Float,
    Double,
    String,
    Date,
    Data,
    ObjectId,
    Decimal,
    Uuid,
    Mixed,
    Object,
    LinkingObjects,
}

impl PropertyKind {
    /// The storage column type this kind lowers onto.
    pub(crate) fn data_type(self) -> DataType {
        match self {
            PropertyKind::Int => DataType::Int,
            PropertyKind::Bool => DataType::Bool,
            PropertyKind::Float => DataType::Float,
            PropertyKind::Double => DataType::Double,
            PropertyKind::String => DataType::String,
            PropertyKind::Date => DataType::Timestamp,
            PropertyKind::Data => DataType::Binary,
            PropertyKind::ObjectId => DataType::ObjectId,
            PropertyKind::Decimal => DataType::Decimal,
            PropertyKind::Uuid => DataType::Uuid,
            PropertyKind::Mixed => DataType::Mixed,
            PropertyKind::Object | PropertyKind::LinkingObjects => DataType::Link,
        }
    }

    pub(crate) fn from_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::Int => PropertyKind::Int,
            DataType::Bool => PropertyKind::Bool,
            DataType::Float => PropertyKind::Float,
            DataType::Double => PropertyKind::Double,
            DataType::String => PropertyKind::String,
            DataType::Timestamp => PropertyKind::Date,
            DataType::Binary => PropertyKind::Data,
            DataType::ObjectId => PropertyKind::ObjectId,
            DataType::Decimal => PropertyKind::Decimal,
            DataType::Uuid => PropertyKind::Uuid,
            DataType::Mixed => PropertyKind::Mixed,
            DataType::Link => PropertyKind::Object,
        }
    }

    fn label(self) -> &'static str {
        match self {
            PropertyKind::Int => "int",
            PropertyKind::Bool => "bool",
            PropertyKind::Float => "float",
            PropertyKind::Double => "double",
            PropertyKind::String => "string",
            PropertyKind::Date => "date",
            PropertyKind::Data => "data",
            PropertyKind::ObjectId => "object id",
            PropertyKind::Decimal => "decimal",
            PropertyKind::Uuid => "uuid",
            PropertyKind::Mixed => "mixed",
            PropertyKind::Object => "object",
            PropertyKind::LinkingObjects => "linking objects",
        }
    }
}

/// A property of an object class.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name, unique within its class.
    pub name: String,
    /// Base kind.
    pub kind: PropertyKind,
    /// Whether values may be null.
    pub nullable: bool,
    /// Shape of the values.
    pub collection: CollectionKind,
    /// Target class name for `Object` and `LinkingObjects` properties.
    pub object_type: Option<String>,
    /// For `LinkingObjects`: the property on the target class that induces
    /// the backlink.
    pub link_origin_property: Option<String>,
    /// Whether this property is the class primary key.
    pub is_primary: bool,
    /// Search index carried by the property's column.
    pub index: IndexKind,
    /// Storage handle, populated when the schema is bound to a group.
    pub column_key: Option<ColumnKey>,
}

impl Property {
    /// Create a required, non-collection property.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            collection: CollectionKind::None,
            object_type: None,
            link_origin_property: None,
            is_primary: false,
            index: IndexKind::None,
            column_key: None,
        }
    }

    /// Create a link to another class. Single links are always nullable.
    pub fn object(name: impl Into<String>, target: impl Into<String>) -> Self {
        let mut property = Property::new(name, PropertyKind::Object);
        property.object_type = Some(target.into());
        property.nullable = true;
        property
    }

    /// Create a computed backlink induced by `origin` on `target`.
    pub fn linking_objects(
        name: impl Into<String>,
        target: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        let mut property = Property::new(name, PropertyKind::LinkingObjects);
        property.object_type = Some(target.into());
        property.link_origin_property = Some(origin.into());
        property.collection = CollectionKind::List;
        property
    }

    /// Make the property nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set the collection shape.
    pub fn with_collection(mut self, collection: CollectionKind) -> Self {
        self.collection = collection;
        self
    }

    /// Mark as the class primary key.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Request a search index.
    pub fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    /// Whether this property is computed and never stored as a column.
    pub fn is_computed(&self) -> bool {
        self.kind == PropertyKind::LinkingObjects
    }

    /// Whether the column needs a general search index.
    pub fn requires_index(&self) -> bool {
        self.index == IndexKind::General
    }

    /// Whether the column needs a full-text index.
    pub fn requires_fulltext_index(&self) -> bool {
        self.index == IndexKind::Fulltext
    }

    /// Whether two properties map to the same column shape (kind, collection
    /// and link target). Nullability and index are tracked separately by the
    /// differ.
    pub fn same_shape(&self, other: &Property) -> bool {
        self.kind == other.kind
            && self.collection == other.collection
            && self.object_type == other.object_type
    }

    /// Human-readable type, used in change descriptions.
    pub fn type_description(&self) -> String {
        let mut base = match self.kind {
            PropertyKind::Object => {
                format!("object<{}>", self.object_type.as_deref().unwrap_or(""))
            }
            PropertyKind::LinkingObjects => format!(
                "linking objects<{}>",
                self.object_type.as_deref().unwrap_or("")
            ),
            kind => kind.label().to_string(),
        };
        if self.nullable
            && !matches!(
                self.kind,
                PropertyKind::Object | PropertyKind::Mixed | PropertyKind::LinkingObjects
            )
        {
            base.push('?');
        }
        match self.collection {
            CollectionKind::None => base,
            CollectionKind::List => format!("list<{base}>"),
            CollectionKind::Set => format!("set<{base}>"),
            CollectionKind::Dictionary => format!("dictionary<{base}>"),
        }
    }
}
