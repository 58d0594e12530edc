//! Mode policy: which schema changes are legal, and describing the ones
//! that are not.

use super::diff::SchemaChange;
use super::error::MigrationError;
use crate::storage::TableType;

/// Whether any change in the list requires a migration (a version bump and,
/// under `Automatic`, a migration callback).
pub fn needs_migration(changes: &[SchemaChange]) -> bool {
    changes.iter().any(|change| {
        matches!(
            change,
            SchemaChange::AddProperty { .. }
                | SchemaChange::RemoveProperty { .. }
                | SchemaChange::ChangePropertyType { .. }
                | SchemaChange::MakePropertyNullable { .. }
                | SchemaChange::MakePropertyRequired { .. }
                | SchemaChange::ChangePrimaryKey { .. }
                | SchemaChange::ChangeTableType { .. }
        )
    })
}

fn table_type_label(table_type: TableType) -> &'static str {
    match table_type {
        TableType::TopLevel => "top-level",
        TableType::Embedded => "embedded",
        TableType::TopLevelAsymmetric => "asymmetric",
    }
}

/// A human-readable sentence for a change, or `None` for changes that are
/// never worth reporting (`RemoveTable` is never acted on;
/// `AddInitialProperties` is always preceded by its `AddTable`).
pub(crate) fn describe_change(change: &SchemaChange) -> Option<String> {
    match change {
        SchemaChange::AddTable { object } => {
            Some(format!("Class '{}' has been added.", object.name))
        }
        SchemaChange::RemoveTable { .. } => None,
        SchemaChange::AddInitialProperties { .. } => None,
        SchemaChange::ChangeTableType {
            object,
            old_type,
            new_type,
        } => Some(format!(
            "Class '{}' has been changed from {} to {}.",
            object.name,
            table_type_label(*old_type),
            table_type_label(*new_type)
        )),
        SchemaChange::AddProperty {
            class_name,
            property,
        } => Some(format!(
            "Property '{class_name}.{}' has been added.",
            property.name
        )),
        SchemaChange::RemoveProperty {
            class_name,
            property,
        } => Some(format!(
            "Property '{class_name}.{}' has been removed.",
            property.name
        )),
        SchemaChange::ChangePropertyType {
            class_name,
            old_property,
            new_property,
        } => Some(format!(
            "Property '{class_name}.{}' has been changed from '{}' to '{}'.",
            new_property.name,
            old_property.type_description(),
            new_property.type_description()
        )),
        SchemaChange::MakePropertyNullable {
            class_name,
            property,
        } => Some(format!(
            "Property '{class_name}.{}' has been made optional.",
            property.name
        )),
        SchemaChange::MakePropertyRequired {
            class_name,
            property,
        } => Some(format!(
            "Property '{class_name}.{}' has been made required.",
            property.name
        )),
        SchemaChange::ChangePrimaryKey {
            class_name,
            old_primary_key,
            property,
        } => Some(match (old_primary_key, property) {
            (Some(old), Some(new)) => format!(
                "Primary Key for class '{class_name}' has changed from '{old}' to '{}'.",
                new.name
            ),
            (None, Some(_)) => {
                format!("Primary Key for class '{class_name}' has been added.")
            }
            (_, None) => {
                format!("Primary Key for class '{class_name}' has been removed.")
            }
        }),
        SchemaChange::AddIndex {
            class_name,
            property,
            ..
        } => Some(format!(
            "Property '{class_name}.{}' has been made indexed.",
            property.name
        )),
        SchemaChange::RemoveIndex {
            class_name,
            property,
        } => Some(format!(
            "Property '{class_name}.{}' has been made unindexed.",
            property.name
        )),
    }
}

/// Require the change list to be empty of anything reportable.
pub fn verify_no_changes_required(changes: &[SchemaChange]) -> Result<(), MigrationError> {
    let errors: Vec<String> = changes.iter().filter_map(describe_change).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::SchemaMismatch { errors })
    }
}

/// Require that no change needs a migration. Creating tables and toggling
/// indexes can always be done automatically.
pub fn verify_no_migration_required(changes: &[SchemaChange]) -> Result<(), MigrationError> {
    let mut errors = Vec::new();
    for change in changes {
        match change {
            SchemaChange::AddTable { .. }
            | SchemaChange::AddInitialProperties { .. }
            | SchemaChange::AddIndex { .. }
            | SchemaChange::RemoveIndex { .. } => {}
            other => errors.extend(describe_change(other)),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::SchemaMismatch { errors })
    }
}

/// Check the change list against the additive policy.
///
/// Returns whether anything would actually change: schema-enlarging changes
/// count always, index toggles only when `update_indexes` is set. Callers
/// gate re-notification on this, so the two signals stay conflated on
/// purpose.
pub fn verify_valid_additive_changes(
    changes: &[SchemaChange],
    update_indexes: bool,
) -> Result<bool, MigrationError> {
    let mut errors = Vec::new();
    let mut other_changes = false;
    let mut index_changes = false;
    for change in changes {
        match change {
            SchemaChange::AddTable { .. }
            | SchemaChange::AddInitialProperties { .. }
            | SchemaChange::AddProperty { .. } => other_changes = true,
            SchemaChange::AddIndex { .. } | SchemaChange::RemoveIndex { .. } => {
                index_changes = true;
            }
            // Tolerated but not applied.
            SchemaChange::RemoveProperty { .. } | SchemaChange::RemoveTable { .. } => {}
            other => errors.extend(describe_change(other)),
        }
    }
    if errors.is_empty() {
        Ok(other_changes || (index_changes && update_indexes))
    } else {
        Err(MigrationError::InvalidAdditiveSchemaChange { errors })
    }
}

/// Check changes made by another writer against this process's schema.
/// Additions are fine; removing a class is not.
pub fn verify_valid_external_changes(changes: &[SchemaChange]) -> Result<(), MigrationError> {
    let mut errors = Vec::new();
    for change in changes {
        match change {
            SchemaChange::AddTable { .. }
            | SchemaChange::AddInitialProperties { .. }
            | SchemaChange::AddProperty { .. }
            | SchemaChange::AddIndex { .. }
            | SchemaChange::RemoveIndex { .. } => {}
            SchemaChange::RemoveTable { object } => {
                errors.push(format!("Class '{}' has been removed.", object.name));
            }
            other => errors.extend(describe_change(other)),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::InvalidExternalSchemaChange { errors })
    }
}

/// Check that the persisted file can be read under the target schema
/// without any writes.
pub fn verify_compatible_for_immutable_and_readonly(
    changes: &[SchemaChange],
) -> Result<(), MigrationError> {
    let mut errors = Vec::new();
    for change in changes {
        match change {
            SchemaChange::AddTable { .. }
            | SchemaChange::AddInitialProperties { .. }
            | SchemaChange::ChangeTableType { .. }
            | SchemaChange::RemoveProperty { .. }
            | SchemaChange::AddIndex { .. }
            | SchemaChange::RemoveIndex { .. } => {}
            other => errors.extend(describe_change(other)),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::InvalidReadOnlySchemaChange { errors })
    }
}
