//! Strata core - embedded object database storage and schema evolution.
//!
//! The crate has three layers:
//! - [`storage`]: the table/column store ([`Group`], [`Table`],
//!   [`Transaction`]) persisted as a sled-backed snapshot by [`Store`],
//! - [`schema`]: the value-level schema model ([`Schema`], [`ObjectSchema`],
//!   [`Property`]) plus the schema view recovered from a group,
//! - [`migration`]: the diff/verify/apply pipeline that makes a group
//!   conform to a target schema under a [`SchemaMode`] policy.

pub mod error;
pub mod migration;
pub mod schema;
pub mod storage;

pub use error::Error;
pub use migration::{
    apply_schema_changes, get_schema_version, needs_migration, rename_property,
    set_schema_version, verify_compatible_for_immutable_and_readonly, verify_no_changes_required,
    verify_no_migration_required, verify_valid_additive_changes, verify_valid_external_changes,
    MigrationError, MigrationFunction, SchemaChange, SchemaMode, NOT_VERSIONED,
};
pub use schema::{
    delete_data_for_object, is_empty, object_type_for_table_name, schema_from_group,
    set_schema_keys, table_name_for_object_type, ObjectSchema, Property, PropertyKind, Schema,
    SchemaValidationError,
};
pub use storage::{
    CollectionKind, Column, ColumnKey, DataType, Group, IndexKind, Store, Table, TableKey,
    TableType, Transaction, Value,
};
