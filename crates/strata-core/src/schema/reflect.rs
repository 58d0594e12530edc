//! Recovering schema information from a group and binding storage handles.

use super::object::ObjectSchema;
use super::property::{Property, PropertyKind};
use super::schema::Schema;
use crate::error::Error;
use crate::storage::{Group, Table};

/// Prefix of tables backing object classes. Table names not carrying the
/// prefix are hidden from the schema view.
pub const OBJECT_TABLE_PREFIX: &str = "class_";

/// The class name encoded in a table name, or `None` for hidden tables.
pub fn object_type_for_table_name(table_name: &str) -> Option<&str> {
    table_name
        .strip_prefix(OBJECT_TABLE_PREFIX)
        .filter(|name| !name.is_empty())
}

/// The table name backing a class.
pub fn table_name_for_object_type(object_type: &str) -> String {
    format!("{OBJECT_TABLE_PREFIX}{object_type}")
}

/// Look up the table backing a class.
pub fn table_for_object_type<'g>(group: &'g Group, object_type: &str) -> Option<&'g Table> {
    group.get_table(&table_name_for_object_type(object_type))
}

/// Read the persisted schema out of a group. Hidden tables are skipped;
/// column keys come back bound.
pub fn schema_from_group(group: &Group) -> Schema {
    let mut objects = Vec::with_capacity(group.size());
    for table in group.tables() {
        if object_type_for_table_name(table.name()).is_some() {
            objects.push(object_schema_from_table(group, table));
        }
    }
    Schema::new(objects)
}

/// Build the schema view of a single class table.
pub(crate) fn object_schema_from_table(group: &Group, table: &Table) -> ObjectSchema {
    let name = object_type_for_table_name(table.name()).unwrap_or(table.name());
    let pk_col = table.primary_key_column();

    let mut object = ObjectSchema::new(name).with_table_type(table.table_type());
    object.table_key = Some(table.key());

    for column in table.columns() {
        let object_type = column
            .link_target
            .and_then(|target| group.table_name(target))
            .and_then(object_type_for_table_name)
            .map(str::to_string);
        let property = Property {
            name: column.name.clone(),
            kind: PropertyKind::from_data_type(column.data_type),
            nullable: column.nullable,
            collection: column.collection,
            object_type,
            link_origin_property: None,
            is_primary: pk_col == Some(column.key),
            index: column.index,
            column_key: Some(column.key),
        };
        if property.is_primary {
            object.primary_key = Some(property.name.clone());
        }
        object.persisted_properties.push(property);
    }

    object
}

/// Bind `table_key` and `column_key` handles of the schema against the
/// group. Classes or properties without a storage counterpart are left
/// unbound.
pub fn set_schema_keys(group: &Group, schema: &mut Schema) {
    for object in schema.iter_mut() {
        let Some(table) = table_for_object_type(group, &object.name) else {
            continue;
        };
        object.table_key = Some(table.key());
        for property in &mut object.persisted_properties {
            property.column_key = table.column_key(&property.name);
        }
    }
}

/// Drop the table backing a class, including all of its rows.
pub fn delete_data_for_object(group: &mut Group, object_type: &str) -> Result<(), Error> {
    if let Some(key) = table_for_object_type(group, object_type).map(|t| t.key()) {
        group.remove_table(key)?;
    }
    Ok(())
}

/// Whether no user class table holds any row. Hidden tables and reserved
/// (`__`-prefixed) classes are ignored.
pub fn is_empty(group: &Group) -> bool {
    for table in group.tables() {
        let Some(object_type) = object_type_for_table_name(table.name()) else {
            continue;
        };
        if object_type.starts_with("__") {
            continue;
        }
        if !table.is_empty() {
            return false;
        }
    }
    true
}
