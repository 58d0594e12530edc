//! The schema model: object classes, typed properties and the schema view
//! recovered from a storage group.

mod object;
mod property;
mod reflect;
mod schema;

pub use object::ObjectSchema;
pub use property::{Property, PropertyKind};
pub use reflect::{
    delete_data_for_object, is_empty, object_type_for_table_name, schema_from_group,
    set_schema_keys, table_for_object_type, table_name_for_object_type, OBJECT_TABLE_PREFIX,
};
pub use schema::{Schema, SchemaValidationError};

pub(crate) use reflect::object_schema_from_table;
pub(crate) use schema::bullet_list;
