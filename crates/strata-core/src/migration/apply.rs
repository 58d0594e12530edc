//! Change appliers and the schema-change orchestrator.
//!
//! Four strategies translate [`SchemaChange`] lists into storage calls:
//! initial creation, non-migration changes, additive changes, and the
//! pre/post pair wrapped around the user migration callback.

use std::time::Instant;

use tracing::{debug, instrument};

use super::diff::SchemaChange;
use super::error::MigrationError;
use super::metadata::{create_metadata_table, set_schema_version, NOT_VERSIONED};
use super::verify::{
    describe_change, needs_migration, verify_compatible_for_immutable_and_readonly,
    verify_no_changes_required, verify_no_migration_required,
};
use super::SchemaMode;
use crate::error::Error;
use crate::schema::{
    schema_from_group, set_schema_keys, table_name_for_object_type, ObjectSchema, Property,
    PropertyKind, Schema,
};
use crate::storage::{ColumnKey, Group, IndexKind, TableKey, TableType, Transaction};

/// Migration callback: runs between the pre and post appliers, inside the
/// caller's write transaction, seeing old and new columns simultaneously.
/// It may mutate rows and call [`rename_property`](super::rename_property);
/// it must not commit or roll back.
pub type MigrationFunction<'a> =
    &'a mut dyn FnMut(&mut Transaction<'_>, &mut Schema) -> Result<(), MigrationError>;

#[derive(Clone, Copy, PartialEq)]
enum DidRereadSchema {
    Yes,
    No,
}

#[derive(Clone, Copy, PartialEq)]
enum HandleBacklinks {
    Automatically,
    Reject,
}

fn table_key_for_class(group: &Group, class_name: &str) -> Result<TableKey, Error> {
    let name = table_name_for_object_type(class_name);
    match group.get_table(&name) {
        Some(table) => Ok(table.key()),
        None => Err(Error::TableNotFound { name }),
    }
}

/// Create the column backing a property, or reuse a matching existing one.
///
/// The column may legitimately exist already: primary key columns are
/// created together with their table, and additive change lists can be
/// applied repeatedly. Link columns require the target table to exist.
fn add_column(
    group: &mut Group,
    table: TableKey,
    property: &Property,
) -> Result<ColumnKey, MigrationError> {
    debug_assert!(
        !property.is_computed(),
        "computed properties never materialize as columns"
    );

    let table_ref = group.table(table).ok_or(Error::TableNotFound {
        name: format!("{table:?}"),
    })?;
    if let Some(existing_key) = table_ref.column_key(&property.name) {
        let existing = table_ref
            .column(existing_key)
            .expect("column key just resolved");
        let same_shape = existing.data_type == property.kind.data_type()
            && existing.collection == property.collection
            && (existing.nullable == property.nullable || property.kind == PropertyKind::Object);
        if same_shape {
            return Ok(existing_key);
        }
        return Err(Error::ColumnAlreadyExists {
            table: table_ref.name().to_string(),
            column: property.name.clone(),
        }
        .into());
    }

    if property.kind == PropertyKind::Object {
        let target_name =
            table_name_for_object_type(property.object_type.as_deref().unwrap_or(""));
        let target = group
            .get_table(&target_name)
            .map(|t| t.key())
            .ok_or(Error::TableNotFound { name: target_name })?;
        let table_ref = group.table_mut(table).expect("looked up above");
        Ok(table_ref.add_link_column(target, &property.name, property.collection)?)
    } else {
        let table_ref = group.table_mut(table).expect("looked up above");
        let key = table_ref.add_column(
            property.kind.data_type(),
            &property.name,
            property.nullable,
            property.collection,
        )?;
        if property.requires_index() {
            table_ref.add_search_index(key, IndexKind::General)?;
        }
        if property.requires_fulltext_index() {
            table_ref.add_fulltext_index(key)?;
        }
        Ok(key)
    }
}

fn remove_column_by_name(
    group: &mut Group,
    table: TableKey,
    name: &str,
) -> Result<(), MigrationError> {
    let table_ref = group.table_mut(table).ok_or(Error::TableNotFound {
        name: format!("{table:?}"),
    })?;
    let col = table_ref.column_key(name).ok_or_else(|| Error::ColumnNotFound {
        table: table_ref.name().to_string(),
        column: name.to_string(),
    })?;
    table_ref.remove_column(col)?;
    Ok(())
}

fn replace_column(
    group: &mut Group,
    table: TableKey,
    old_property: &Property,
    new_property: &Property,
) -> Result<(), MigrationError> {
    remove_column_by_name(group, table, &old_property.name)?;
    add_column(group, table, new_property)?;
    Ok(())
}

/// Create the table backing a class. Idempotent; the primary key column is
/// created along with the table.
fn create_table(group: &mut Group, object: &ObjectSchema) -> Result<TableKey, MigrationError> {
    let name = table_name_for_object_type(&object.name);
    if let Some(table) = group.get_table(&name) {
        return Ok(table.key());
    }

    let key = if let Some(pk) = object.primary_key_property() {
        let table_type = if object.table_type == TableType::TopLevelAsymmetric {
            TableType::TopLevelAsymmetric
        } else {
            TableType::TopLevel
        };
        group.add_table_with_primary_key(
            &name,
            pk.kind.data_type(),
            &pk.name,
            pk.nullable,
            table_type,
        )?
    } else if object.table_type == TableType::Embedded {
        group.add_table(&name, TableType::Embedded)?
    } else {
        group.get_or_add_table(&name, object.table_type)
    };
    Ok(key)
}

/// Second creation pass: add the columns of a freshly created class.
fn add_initial_columns(group: &mut Group, object: &ObjectSchema) -> Result<(), MigrationError> {
    let key = table_key_for_class(group, &object.name)?;
    for property in &object.persisted_properties {
        add_column(group, key, property)?;
    }
    Ok(())
}

fn make_property_optional(
    group: &mut Group,
    table: TableKey,
    property: &Property,
) -> Result<(), MigrationError> {
    let table_ref = group.table_mut(table).ok_or(Error::TableNotFound {
        name: format!("{table:?}"),
    })?;
    let col = table_ref.column_key(&property.name).ok_or_else(|| Error::ColumnNotFound {
        table: table_ref.name().to_string(),
        column: property.name.clone(),
    })?;
    table_ref.set_nullability(col, true, false)?;
    Ok(())
}

/// Make a column required by dropping and re-creating it. Any values in the
/// column are lost; migrations copy the data out beforehand.
fn make_property_required(
    group: &mut Group,
    table: TableKey,
    property: &Property,
) -> Result<(), MigrationError> {
    let mut required = property.clone();
    required.nullable = false;
    remove_column_by_name(group, table, &property.name)?;
    add_column(group, table, &required)?;
    Ok(())
}

fn set_primary_key(
    group: &mut Group,
    table: TableKey,
    property: Option<&Property>,
) -> Result<(), MigrationError> {
    let table_ref = group.table_mut(table).ok_or(Error::TableNotFound {
        name: format!("{table:?}"),
    })?;
    let col = match property {
        Some(property) => {
            Some(table_ref.column_key(&property.name).ok_or_else(|| {
                Error::ColumnNotFound {
                    table: table_ref.name().to_string(),
                    column: property.name.clone(),
                }
            })?)
        }
        None => None,
    };
    table_ref.set_primary_key_column(col)?;
    Ok(())
}

fn add_index(
    group: &mut Group,
    table: TableKey,
    property: &Property,
    kind: IndexKind,
) -> Result<(), MigrationError> {
    let table_ref = group.table_mut(table).ok_or(Error::TableNotFound {
        name: format!("{table:?}"),
    })?;
    let col = table_ref.column_key(&property.name).ok_or_else(|| Error::ColumnNotFound {
        table: table_ref.name().to_string(),
        column: property.name.clone(),
    })?;
    table_ref.add_search_index(col, kind)?;
    Ok(())
}

fn remove_index(
    group: &mut Group,
    table: TableKey,
    property: &Property,
) -> Result<(), MigrationError> {
    let table_ref = group.table_mut(table).ok_or(Error::TableNotFound {
        name: format!("{table:?}"),
    })?;
    let col = table_ref.column_key(&property.name).ok_or_else(|| Error::ColumnNotFound {
        table: table_ref.name().to_string(),
        column: property.name.clone(),
    })?;
    table_ref.remove_search_index(col)?;
    Ok(())
}

/// First-open applier: build the whole target schema in an unversioned
/// group.
///
/// Tables come first (the differ orders the list that way) so link columns
/// always find their targets. Property-level variants are not expected on a
/// fresh group but are handled anyway, to cope with not-quite-correct files
/// produced by other tools.
pub(crate) fn create_initial_tables(
    group: &mut Group,
    changes: &[SchemaChange],
) -> Result<(), MigrationError> {
    for change in changes {
        match change {
            SchemaChange::AddTable { object } => {
                create_table(group, object)?;
            }
            SchemaChange::RemoveTable { .. } => {}
            SchemaChange::AddInitialProperties { object } => {
                add_initial_columns(group, object)?;
            }
            SchemaChange::ChangeTableType { object, new_type, .. } => {
                let key = table_key_for_class(group, &object.name)?;
                group.set_table_type(key, *new_type, false)?;
            }
            SchemaChange::AddProperty { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                add_column(group, key, property)?;
            }
            SchemaChange::RemoveProperty { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                remove_column_by_name(group, key, &property.name)?;
            }
            SchemaChange::ChangePropertyType {
                class_name,
                old_property,
                new_property,
            } => {
                let key = table_key_for_class(group, class_name)?;
                replace_column(group, key, old_property, new_property)?;
            }
            SchemaChange::MakePropertyNullable { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                make_property_optional(group, key, property)?;
            }
            SchemaChange::MakePropertyRequired { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                make_property_required(group, key, property)?;
            }
            SchemaChange::ChangePrimaryKey { class_name, property, .. } => {
                let key = table_key_for_class(group, class_name)?;
                set_primary_key(group, key, property.as_ref())?;
            }
            SchemaChange::AddIndex { class_name, property, kind } => {
                let key = table_key_for_class(group, class_name)?;
                add_index(group, key, property, *kind)?;
            }
            SchemaChange::RemoveIndex { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                remove_index(group, key, property)?;
            }
        }
    }
    Ok(())
}

/// Same-version applier: only table creation and index toggles are legal;
/// anything else is collected into a mismatch error.
pub(crate) fn apply_non_migration_changes(
    group: &mut Group,
    changes: &[SchemaChange],
) -> Result<(), MigrationError> {
    let mut errors = Vec::new();
    for change in changes {
        match change {
            SchemaChange::AddTable { object } => {
                create_table(group, object)?;
            }
            SchemaChange::AddInitialProperties { object } => {
                add_initial_columns(group, object)?;
            }
            SchemaChange::AddIndex { class_name, property, kind } => {
                let key = table_key_for_class(group, class_name)?;
                add_index(group, key, property, *kind)?;
            }
            SchemaChange::RemoveIndex { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                remove_index(group, key, property)?;
            }
            other => errors.extend(describe_change(other)),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::SchemaMismatch { errors })
    }
}

/// Additive applier: schema-enlarging changes plus index toggles gated by
/// `update_indexes`. Everything the additive verifier merely tolerates is
/// ignored.
pub(crate) fn apply_additive_changes(
    group: &mut Group,
    changes: &[SchemaChange],
    update_indexes: bool,
) -> Result<(), MigrationError> {
    for change in changes {
        match change {
            SchemaChange::AddTable { object } => {
                create_table(group, object)?;
            }
            SchemaChange::AddInitialProperties { object } => {
                add_initial_columns(group, object)?;
            }
            SchemaChange::AddProperty { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                add_column(group, key, property)?;
            }
            SchemaChange::AddIndex { class_name, property, kind } => {
                if update_indexes {
                    let key = table_key_for_class(group, class_name)?;
                    add_index(group, key, property, *kind)?;
                }
            }
            SchemaChange::RemoveIndex { class_name, property } => {
                if update_indexes {
                    let key = table_key_for_class(group, class_name)?;
                    remove_index(group, key, property)?;
                }
            }
            // The verifier already rejected what it does not tolerate.
            SchemaChange::RemoveTable { .. }
            | SchemaChange::RemoveProperty { .. }
            | SchemaChange::ChangeTableType { .. }
            | SchemaChange::ChangePrimaryKey { .. }
            | SchemaChange::ChangePropertyType { .. }
            | SchemaChange::MakePropertyNullable { .. }
            | SchemaChange::MakePropertyRequired { .. } => {}
        }
    }
    Ok(())
}

/// Pre-migration applier: structure additions and reversible transforms.
///
/// Irreversible work (`ChangeTableType`, `RemoveProperty`, the new primary
/// key assignment) is deferred until after the callback; the primary key
/// column is cleared here so the callback can freely rewrite key values.
fn apply_pre_migration_changes(
    group: &mut Group,
    changes: &[SchemaChange],
) -> Result<(), MigrationError> {
    for change in changes {
        match change {
            SchemaChange::AddTable { object } => {
                create_table(group, object)?;
            }
            SchemaChange::RemoveTable { .. } => {}
            SchemaChange::ChangeTableType { .. } => {}
            SchemaChange::AddInitialProperties { object } => {
                add_initial_columns(group, object)?;
            }
            SchemaChange::AddProperty { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                add_column(group, key, property)?;
            }
            SchemaChange::RemoveProperty { .. } => {}
            SchemaChange::ChangePropertyType {
                class_name,
                old_property,
                new_property,
            } => {
                let key = table_key_for_class(group, class_name)?;
                replace_column(group, key, old_property, new_property)?;
            }
            SchemaChange::MakePropertyNullable { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                make_property_optional(group, key, property)?;
            }
            SchemaChange::MakePropertyRequired { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                make_property_required(group, key, property)?;
            }
            SchemaChange::ChangePrimaryKey { class_name, .. } => {
                let key = table_key_for_class(group, class_name)?;
                let table = group.table_mut(key).expect("key just resolved");
                table.set_primary_key_column(None)?;
            }
            SchemaChange::AddIndex { class_name, property, kind } => {
                let key = table_key_for_class(group, class_name)?;
                add_index(group, key, property, *kind)?;
            }
            SchemaChange::RemoveIndex { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                remove_index(group, key, property)?;
            }
        }
    }
    Ok(())
}

/// Post-migration applier: the deferred irreversible work.
///
/// When the callback ran, the change list is a fresh diff of the re-read
/// schema, so class/column creation has to be handled again (the callback
/// may have created classes of its own).
fn apply_post_migration_changes(
    group: &mut Group,
    changes: &[SchemaChange],
    initial_schema: &Schema,
    did_reread_schema: DidRereadSchema,
    handle_backlinks: HandleBacklinks,
) -> Result<(), MigrationError> {
    for change in changes {
        match change {
            SchemaChange::RemoveProperty { class_name, property } => {
                // A removal whose column was not in the pre-migration schema
                // either means the callback dropped a rename step.
                if !initial_schema.is_empty() {
                    let existed = initial_schema
                        .find(class_name)
                        .is_some_and(|o| o.property_for_name(&property.name).is_some());
                    if !existed {
                        return Err(MigrationError::InvalidProperty {
                            class_name: class_name.clone(),
                            property: property.name.clone(),
                        });
                    }
                }
                let key = table_key_for_class(group, class_name)?;
                remove_column_by_name(group, key, &property.name)?;
            }
            SchemaChange::ChangePrimaryKey { class_name, property, .. } => {
                let key = table_key_for_class(group, class_name)?;
                set_primary_key(group, key, property.as_ref())?;
            }
            SchemaChange::AddTable { object } => {
                create_table(group, object)?;
            }
            SchemaChange::AddInitialProperties { object } => {
                if did_reread_schema == DidRereadSchema::Yes {
                    add_initial_columns(group, object)?;
                }
                // Otherwise the pre-migration applier already added them.
            }
            SchemaChange::AddIndex { class_name, property, kind } => {
                let key = table_key_for_class(group, class_name)?;
                add_index(group, key, property, *kind)?;
            }
            SchemaChange::RemoveIndex { class_name, property } => {
                let key = table_key_for_class(group, class_name)?;
                remove_index(group, key, property)?;
            }
            SchemaChange::ChangeTableType { object, new_type, .. } => {
                let key = table_key_for_class(group, &object.name)?;
                group.set_table_type(
                    key,
                    *new_type,
                    handle_backlinks == HandleBacklinks::Automatically,
                )?;
            }
            SchemaChange::RemoveTable { .. }
            | SchemaChange::ChangePropertyType { .. }
            | SchemaChange::MakePropertyNullable { .. }
            | SchemaChange::MakePropertyRequired { .. }
            | SchemaChange::AddProperty { .. } => {}
        }
    }
    Ok(())
}

fn run_migration_function(
    txn: &mut Transaction<'_>,
    target_schema: &mut Schema,
    migration: MigrationFunction<'_>,
) -> Result<(), MigrationError> {
    debug!("calling migration function");
    let started = Instant::now();
    migration(txn, target_schema)?;
    debug!(
        elapsed_us = started.elapsed().as_micros() as u64,
        "migration function finished"
    );
    Ok(())
}

/// Make the group structurally conform to `target_schema`, under `mode`.
///
/// `changes` is the precomputed diff of the persisted schema against the
/// target. On success the target schema comes back with its storage handles
/// bound. The caller owns the transaction: nothing here commits or rolls
/// back.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(txn, target_schema, changes, migration_function))]
pub fn apply_schema_changes(
    txn: &mut Transaction<'_>,
    schema_version: u64,
    target_schema: &mut Schema,
    target_schema_version: u64,
    mode: SchemaMode,
    changes: &[SchemaChange],
    handle_backlinks_automatically: bool,
    migration_function: Option<MigrationFunction<'_>>,
    set_schema_version_on_version_decrease: bool,
) -> Result<(), MigrationError> {
    let started = Instant::now();
    if schema_version == NOT_VERSIONED {
        debug!(target_schema_version, ?mode, "creating schema");
    } else {
        debug!(schema_version, target_schema_version, ?mode, "migrating schema");
    }

    create_metadata_table(txn).map_err(MigrationError::from)?;

    if mode.is_additive() {
        let set_version = schema_version < target_schema_version
            || schema_version == NOT_VERSIONED
            || set_schema_version_on_version_decrease;
        let update_indexes = true;
        apply_additive_changes(txn, changes, update_indexes)?;
        if set_version {
            set_schema_version(txn, target_schema_version)?;
        }
        set_schema_keys(txn, target_schema);
        log_applied(started, changes);
        return Ok(());
    }

    if schema_version == NOT_VERSIONED {
        if mode != SchemaMode::ReadOnly {
            create_initial_tables(txn, changes)?;
        }
        set_schema_version(txn, target_schema_version)?;
        set_schema_keys(txn, target_schema);
        log_applied(started, changes);
        return Ok(());
    }

    if matches!(mode, SchemaMode::Immutable | SchemaMode::ReadOnly) {
        verify_compatible_for_immutable_and_readonly(changes)?;
        set_schema_keys(txn, target_schema);
        return Ok(());
    }

    if mode.is_reset() && (needs_migration(changes) || target_schema_version < schema_version) {
        return Err(MigrationError::FileResetRequired {
            schema_version,
            target_schema_version,
        });
    }

    if target_schema_version < schema_version {
        return Err(MigrationError::InvalidSchemaVersion {
            old_version: schema_version,
            new_version: target_schema_version,
        });
    }

    if mode == SchemaMode::Manual {
        if let Some(migration) = migration_function {
            run_migration_function(txn, target_schema, migration)?;
        }
        let persisted = schema_from_group(txn);
        verify_no_changes_required(&persisted.compare(target_schema, mode))?;
        txn.validate_primary_columns().map_err(MigrationError::from)?;
        set_schema_keys(txn, target_schema);
        set_schema_version(txn, target_schema_version)?;
        return Ok(());
    }

    if schema_version == target_schema_version {
        apply_non_migration_changes(txn, changes)?;
        set_schema_keys(txn, target_schema);
        return Ok(());
    }

    // Migration path. Without a callback every migration-requiring change
    // is a mismatch the caller has to resolve.
    if migration_function.is_none() {
        verify_no_migration_required(changes)?;
    }

    let old_schema = schema_from_group(txn);
    apply_pre_migration_changes(txn, changes)?;

    let handle_backlinks = if handle_backlinks_automatically {
        HandleBacklinks::Automatically
    } else {
        HandleBacklinks::Reject
    };

    if let Some(migration) = migration_function {
        // Bind the target's handles so the callback sees the transition
        // layout: old columns still present, new columns already created.
        set_schema_keys(txn, target_schema);
        run_migration_function(txn, target_schema, migration)?;

        // The callback may have changed the schema itself; re-read and
        // re-diff before finishing.
        let persisted = schema_from_group(txn);
        let post_changes = persisted.compare(target_schema, mode);
        apply_post_migration_changes(
            txn,
            &post_changes,
            &old_schema,
            DidRereadSchema::Yes,
            handle_backlinks,
        )?;
        txn.validate_primary_columns().map_err(MigrationError::from)?;
    } else {
        apply_post_migration_changes(
            txn,
            changes,
            &Schema::empty(),
            DidRereadSchema::No,
            handle_backlinks,
        )?;
    }

    set_schema_version(txn, target_schema_version)?;
    set_schema_keys(txn, target_schema);
    log_applied(started, changes);
    Ok(())
}

fn log_applied(started: Instant, changes: &[SchemaChange]) {
    debug!(
        elapsed_us = started.elapsed().as_micros() as u64,
        change_count = changes.len(),
        "schema changes applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CollectionKind, DataType, Value};

    fn dog_with_owner() -> Schema {
        Schema::new(vec![
            ObjectSchema::new("Dog")
                .with_property(Property::new("name", PropertyKind::String))
                .with_property(Property::object("owner", "Person")),
            ObjectSchema::new("Person")
                .with_property(Property::new("name", PropertyKind::String).primary()),
        ])
    }

    #[test]
    fn test_create_initial_tables_resolves_links() {
        let mut group = Group::new();
        let target = dog_with_owner();
        let changes = Schema::empty().compare(&target, SchemaMode::Automatic);

        create_initial_tables(&mut group, &changes).unwrap();

        let dog = group.get_table("class_Dog").unwrap();
        let owner = dog.column_key("owner").unwrap();
        let person = group.get_table("class_Person").unwrap();
        assert_eq!(dog.column(owner).unwrap().link_target, Some(person.key()));
        assert_eq!(
            person.primary_key_column(),
            person.column_key("name")
        );
    }

    #[test]
    fn test_create_initial_tables_is_idempotent() {
        let mut group = Group::new();
        let target = dog_with_owner();
        let changes = Schema::empty().compare(&target, SchemaMode::Automatic);

        create_initial_tables(&mut group, &changes).unwrap();
        let before = group.clone();
        create_initial_tables(&mut group, &changes).unwrap();
        assert_eq!(group, before);
    }

    #[test]
    fn test_apply_additive_changes_gates_indexes() {
        let old = Schema::new(vec![
            ObjectSchema::new("Dog").with_property(Property::new("name", PropertyKind::String))
        ]);
        let target = Schema::new(vec![ObjectSchema::new("Dog").with_property(
            Property::new("name", PropertyKind::String).with_index(IndexKind::General),
        )]);

        let mut group = Group::new();
        let initial = Schema::empty().compare(&old, SchemaMode::Automatic);
        create_initial_tables(&mut group, &initial).unwrap();

        let changes = old.compare(&target, SchemaMode::AdditiveExplicit);
        apply_additive_changes(&mut group, &changes, false).unwrap();
        let table = group.get_table("class_Dog").unwrap();
        let col = table.column_key("name").unwrap();
        assert_eq!(table.column(col).unwrap().index, IndexKind::None);

        apply_additive_changes(&mut group, &changes, true).unwrap();
        let table = group.get_table("class_Dog").unwrap();
        assert_eq!(table.column(col).unwrap().index, IndexKind::General);
    }

    #[test]
    fn test_apply_additive_changes_ignores_removals() {
        let old = Schema::new(vec![
            ObjectSchema::new("Dog")
                .with_property(Property::new("name", PropertyKind::String))
                .with_property(Property::new("age", PropertyKind::Int).nullable()),
            ObjectSchema::new("Cat").with_property(Property::new("name", PropertyKind::String)),
        ]);
        let target = Schema::new(vec![
            ObjectSchema::new("Dog").with_property(Property::new("name", PropertyKind::String))
        ]);

        let mut group = Group::new();
        let initial = Schema::empty().compare(&old, SchemaMode::Automatic);
        create_initial_tables(&mut group, &initial).unwrap();

        let changes = old.compare(&target, SchemaMode::AdditiveExplicit);
        apply_additive_changes(&mut group, &changes, true).unwrap();

        // Both the extra class and the extra column survive.
        assert!(group.get_table("class_Cat").is_some());
        let dog = group.get_table("class_Dog").unwrap();
        assert!(dog.column_key("age").is_some());
    }

    #[test]
    fn test_apply_non_migration_changes_collects_errors() {
        let old = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("name", PropertyKind::String))
            .with_property(Property::new("age", PropertyKind::Int).nullable())]);
        let target = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("name", PropertyKind::String))
            .with_property(Property::new("age", PropertyKind::Int))
            .with_property(Property::new("breed", PropertyKind::String))]);

        let mut group = Group::new();
        let initial = Schema::empty().compare(&old, SchemaMode::Automatic);
        create_initial_tables(&mut group, &initial).unwrap();

        let changes = old.compare(&target, SchemaMode::Automatic);
        let err = apply_non_migration_changes(&mut group, &changes).unwrap_err();
        let MigrationError::SchemaMismatch { errors } = &err else {
            panic!("expected SchemaMismatch, got {err:?}");
        };
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_pre_migration_clears_primary_key_and_post_sets_it() {
        let old = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("name", PropertyKind::String).primary())
            .with_property(Property::new("tag", PropertyKind::Int))]);
        let target = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("name", PropertyKind::String))
            .with_property(Property::new("tag", PropertyKind::Int).primary())]);

        let mut group = Group::new();
        let initial = Schema::empty().compare(&old, SchemaMode::Automatic);
        create_initial_tables(&mut group, &initial).unwrap();

        let changes = old.compare(&target, SchemaMode::Automatic);
        apply_pre_migration_changes(&mut group, &changes).unwrap();
        assert!(group
            .get_table("class_Dog")
            .unwrap()
            .primary_key_column()
            .is_none());

        apply_post_migration_changes(
            &mut group,
            &changes,
            &Schema::empty(),
            DidRereadSchema::No,
            HandleBacklinks::Reject,
        )
        .unwrap();
        let dog = group.get_table("class_Dog").unwrap();
        assert_eq!(dog.primary_key_column(), dog.column_key("tag"));
    }

    #[test]
    fn test_make_required_drops_column_data() {
        let old = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("age", PropertyKind::Int).nullable())]);
        let target = Schema::new(vec![
            ObjectSchema::new("Dog").with_property(Property::new("age", PropertyKind::Int))
        ]);

        let mut group = Group::new();
        let initial = Schema::empty().compare(&old, SchemaMode::Automatic);
        create_initial_tables(&mut group, &initial).unwrap();

        let table = group.get_table_mut("class_Dog").unwrap();
        let col = table.column_key("age").unwrap();
        let row = table.create_row();
        table.set_value(row, col, Value::Int(7)).unwrap();

        let changes = old.compare(&target, SchemaMode::Automatic);
        apply_pre_migration_changes(&mut group, &changes).unwrap();

        let table = group.get_table("class_Dog").unwrap();
        let col = table.column_key("age").unwrap();
        assert!(!table.column(col).unwrap().nullable);
        assert!(table.get_value(row, col).is_none());
    }

    #[test]
    fn test_post_migration_rejects_unmapped_removal() {
        let old = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("name", PropertyKind::String))]);

        let mut group = Group::new();
        let initial = Schema::empty().compare(&old, SchemaMode::Automatic);
        create_initial_tables(&mut group, &initial).unwrap();

        // Claim a property that never existed in the initial schema was
        // removed, as a dropped rename step would.
        let changes = vec![SchemaChange::RemoveProperty {
            class_name: "Dog".into(),
            property: Property::new("ghost", PropertyKind::Int),
        }];
        let err = apply_post_migration_changes(
            &mut group,
            &changes,
            &old,
            DidRereadSchema::Yes,
            HandleBacklinks::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidProperty { .. }));
    }

    #[test]
    fn test_replace_column_changes_type() {
        let old = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("tag", PropertyKind::Int))]);
        let target = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("tag", PropertyKind::String).nullable())]);

        let mut group = Group::new();
        let initial = Schema::empty().compare(&old, SchemaMode::Automatic);
        create_initial_tables(&mut group, &initial).unwrap();

        let changes = old.compare(&target, SchemaMode::Automatic);
        apply_pre_migration_changes(&mut group, &changes).unwrap();

        let table = group.get_table("class_Dog").unwrap();
        let col = table.column_key("tag").unwrap();
        let column = table.column(col).unwrap();
        assert_eq!(column.data_type, DataType::String);
        assert!(column.nullable);
        assert_eq!(column.collection, CollectionKind::None);
    }
}
