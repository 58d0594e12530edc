//! Data-preserving property renames, invoked from migration callbacks.

use super::error::MigrationError;
use crate::error::Error;
use crate::schema::{object_schema_from_table, table_for_object_type, Schema};
use crate::storage::Group;

/// Rename a persisted property while keeping its column data.
///
/// The target schema must already consider the property renamed: `old_name`
/// may not exist on the target class. If the table does not have a column
/// named `new_name` yet, the old column is renamed in place (possibly to an
/// intermediate name of a multi-step migration). Otherwise the pre-existing
/// `new_name` column (created by the pre-migration applier) is removed, the
/// old column takes over its name, and the target property is rebound to
/// the retained column. Nullability is relaxed automatically when the
/// target is optional; narrowing and type changes are rejected.
pub fn rename_property(
    group: &mut Group,
    target_schema: &mut Schema,
    class_name: &str,
    old_name: &str,
    new_name: &str,
) -> Result<(), MigrationError> {
    let Some(table_key) = table_for_object_type(group, class_name).map(|t| t.key()) else {
        return Err(MigrationError::NoSuchTable {
            class_name: class_name.to_string(),
            reason: "it does not exist".to_string(),
        });
    };

    let Some(target_object) = target_schema.find(class_name) else {
        return Err(MigrationError::NoSuchTable {
            class_name: class_name.to_string(),
            reason: "it has been removed from the schema".to_string(),
        });
    };
    if target_object.property_for_name(old_name).is_some() {
        return Err(MigrationError::IllegalOperation {
            message: format!(
                "cannot rename property '{class_name}.{old_name}' to '{new_name}' because the \
                 source property still exists"
            ),
        });
    }

    let table = group.table(table_key).expect("key just resolved");
    let table_object = object_schema_from_table(group, table);

    let Some(old_property) = table_object.persisted_property(old_name).cloned() else {
        return Err(MigrationError::InvalidProperty {
            class_name: class_name.to_string(),
            property: old_name.to_string(),
        });
    };

    let Some(new_property) = table_object.persisted_property(new_name).cloned() else {
        // No column under the new name yet: likely an intermediate name of
        // a multi-step migration. Renaming in place is safe because the
        // final schema comparison fails unless the chain ends on a valid
        // name.
        let table = group.table_mut(table_key).expect("key just resolved");
        let col = column_by_name(table, old_name)?;
        table.rename_column(col, new_name)?;
        return Ok(());
    };

    if !old_property.same_shape(&new_property) {
        return Err(MigrationError::IllegalOperation {
            message: format!(
                "cannot rename property '{class_name}.{old_name}' to '{new_name}' because it \
                 would change from type '{}' to '{}'",
                old_property.type_description(),
                new_property.type_description()
            ),
        });
    }
    if old_property.nullable && !new_property.nullable {
        return Err(MigrationError::IllegalOperation {
            message: format!(
                "cannot rename property '{class_name}.{old_name}' to '{new_name}' because it \
                 would change from optional to required"
            ),
        });
    }

    let table = group.table_mut(table_key).expect("key just resolved");
    let new_col = column_by_name(table, new_name)?;
    table.remove_column(new_col)?;
    let old_col = column_by_name(table, old_name)?;
    table.rename_column(old_col, new_name)?;
    if new_property.nullable && !old_property.nullable {
        table.set_nullability(old_col, true, false)?;
    }

    if let Some(property) = target_schema
        .find_mut(class_name)
        .and_then(|object| object.persisted_property_mut(new_name))
    {
        property.column_key = Some(old_col);
    }

    Ok(())
}

fn column_by_name(
    table: &crate::storage::Table,
    name: &str,
) -> Result<crate::storage::ColumnKey, Error> {
    table.column_key(name).ok_or_else(|| Error::ColumnNotFound {
        table: table.name().to_string(),
        column: name.to_string(),
    })
}
