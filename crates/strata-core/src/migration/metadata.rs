//! The schema-version metadata record.
//!
//! A single hidden table holds one row with the current schema version.
//! Hidden tables never carry the class prefix, so they are invisible to the
//! schema view.

use crate::error::Error;
use crate::storage::{CollectionKind, DataType, Group, TableType, Value};

/// Sentinel meaning no schema has ever been written to the group.
pub const NOT_VERSIONED: u64 = u64::MAX;

const METADATA_TABLE: &str = "metadata";
const VERSION_COLUMN: &str = "version";

/// Ensure the metadata table exists with its version row.
pub(crate) fn create_metadata_table(group: &mut Group) -> Result<(), Error> {
    let key = group.get_or_add_table(METADATA_TABLE, TableType::TopLevel);
    let table = group.table_mut(key).expect("metadata table just ensured");
    if table.column_count() == 0 {
        let col = table.add_column(DataType::Int, VERSION_COLUMN, false, CollectionKind::None)?;
        let row = table.create_row();
        table.set_value(row, col, Value::Int(NOT_VERSIONED as i64))?;
    }
    Ok(())
}

/// Record the schema version, creating the metadata table if needed.
pub fn set_schema_version(group: &mut Group, version: u64) -> Result<(), Error> {
    create_metadata_table(group)?;
    let table = group
        .get_table_mut(METADATA_TABLE)
        .expect("metadata table just ensured");
    let col = table
        .column_key(VERSION_COLUMN)
        .expect("version column just ensured");
    let row = match table.row_keys().first() {
        Some(row) => *row,
        None => table.create_row(),
    };
    table.set_value(row, col, Value::Int(version as i64))
}

/// Read the schema version. [`NOT_VERSIONED`] when the metadata record has
/// never been written.
pub fn get_schema_version(group: &Group) -> u64 {
    let Some(table) = group.get_table(METADATA_TABLE) else {
        return NOT_VERSIONED;
    };
    let Some(col) = table.column_key(VERSION_COLUMN) else {
        return NOT_VERSIONED;
    };
    let Some(row) = table.row_keys().first().copied() else {
        return NOT_VERSIONED;
    };
    match table.get_value(row, col) {
        Some(Value::Int(version)) => *version as u64,
        _ => NOT_VERSIONED,
    }
}
