//! Tables, columns and rows.

use rkyv::{Archive, Deserialize, Serialize};

use super::value::{CollectionKind, DataType, IndexKind, TableType, Value};
use crate::error::Error;

/// Opaque, stable handle to a table within a group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Archive, Serialize, Deserialize,
)]
pub struct TableKey(u64);

impl TableKey {
    pub(crate) fn new(raw: u64) -> Self {
        TableKey(raw)
    }
}

/// Opaque, stable handle to a column within a table.
///
/// Keys are never reused: removing a column and adding one with the same
/// name yields a fresh key, which is what makes renames data-preserving and
/// remove-then-add data-destroying.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Archive, Serialize, Deserialize,
)]
pub struct ColumnKey(u64);

/// A column definition.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Column {
    /// Stable handle.
    pub key: ColumnKey,
    /// Column name, unique within the table.
    pub name: String,
    /// Cell type.
    pub data_type: DataType,
    /// Whether cells may be null.
    pub nullable: bool,
    /// Shape of the cells.
    pub collection: CollectionKind,
    /// Target table for link columns.
    pub link_target: Option<TableKey>,
    /// Search index carried by the column.
    pub index: IndexKind,
}

/// A row: sparse cells keyed by column. A missing cell reads as null.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Row {
    key: u64,
    values: Vec<(ColumnKey, Value)>,
}

impl Row {
    fn get(&self, col: ColumnKey) -> Option<&Value> {
        self.values.iter().find(|(k, _)| *k == col).map(|(_, v)| v)
    }

    fn set(&mut self, col: ColumnKey, value: Value) {
        match self.values.iter_mut().find(|(k, _)| *k == col) {
            Some(slot) => slot.1 = value,
            None => self.values.push((col, value)),
        }
    }

    fn clear(&mut self, col: ColumnKey) {
        self.values.retain(|(k, _)| *k != col);
    }
}

/// A table: typed columns plus rows.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Table {
    key: TableKey,
    name: String,
    table_type: TableType,
    columns: Vec<Column>,
    primary_key: Option<ColumnKey>,
    rows: Vec<Row>,
    next_column_key: u64,
    next_row_key: u64,
}

impl Table {
    pub(crate) fn new(key: TableKey, name: impl Into<String>, table_type: TableType) -> Self {
        Self {
            key,
            name: name.into(),
            table_type,
            columns: Vec::new(),
            primary_key: None,
            rows: Vec::new(),
            next_column_key: 0,
            next_row_key: 0,
        }
    }

    /// The table's stable handle.
    pub fn key(&self) -> TableKey {
        self.key
    }

    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table kind.
    pub fn table_type(&self) -> TableType {
        self.table_type
    }

    pub(crate) fn set_table_type_raw(&mut self, table_type: TableType) {
        self.table_type = table_type;
    }

    /// All columns, in creation order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Look up a column by handle.
    pub fn column(&self, key: ColumnKey) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    fn column_mut(&mut self, key: ColumnKey) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.key == key)
    }

    /// Look up a column handle by name.
    pub fn column_key(&self, name: &str) -> Option<ColumnKey> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.key)
    }

    fn alloc_column_key(&mut self) -> ColumnKey {
        let key = ColumnKey(self.next_column_key);
        self.next_column_key += 1;
        key
    }

    fn ensure_name_free(&self, name: &str) -> Result<(), Error> {
        if self.column_key(name).is_some() {
            return Err(Error::ColumnAlreadyExists {
                table: self.name.clone(),
                column: name.to_string(),
            });
        }
        Ok(())
    }

    /// Add a data column.
    pub fn add_column(
        &mut self,
        data_type: DataType,
        name: &str,
        nullable: bool,
        collection: CollectionKind,
    ) -> Result<ColumnKey, Error> {
        self.ensure_name_free(name)?;
        let key = self.alloc_column_key();
        self.columns.push(Column {
            key,
            name: name.to_string(),
            data_type,
            nullable,
            collection,
            link_target: None,
            index: IndexKind::None,
        });
        Ok(key)
    }

    /// Add a link column referring to rows of `target`. Link cells are
    /// always nullable.
    pub fn add_link_column(
        &mut self,
        target: TableKey,
        name: &str,
        collection: CollectionKind,
    ) -> Result<ColumnKey, Error> {
        self.ensure_name_free(name)?;
        let key = self.alloc_column_key();
        self.columns.push(Column {
            key,
            name: name.to_string(),
            data_type: DataType::Link,
            nullable: true,
            collection,
            link_target: Some(target),
            index: IndexKind::None,
        });
        Ok(key)
    }

    /// Remove a column and all of its cell data.
    pub fn remove_column(&mut self, key: ColumnKey) -> Result<(), Error> {
        if self.column(key).is_none() {
            return Err(Error::ColumnNotFound {
                table: self.name.clone(),
                column: format!("{key:?}"),
            });
        }
        self.columns.retain(|c| c.key != key);
        for row in &mut self.rows {
            row.clear(key);
        }
        if self.primary_key == Some(key) {
            self.primary_key = None;
        }
        Ok(())
    }

    /// Rename a column in place. Cell data is preserved because rows are
    /// keyed by column handle, not name.
    pub fn rename_column(&mut self, key: ColumnKey, new_name: &str) -> Result<(), Error> {
        if self.columns.iter().any(|c| c.name == new_name && c.key != key) {
            return Err(Error::ColumnAlreadyExists {
                table: self.name.clone(),
                column: new_name.to_string(),
            });
        }
        let table = self.name.clone();
        let column = self.column_mut(key).ok_or(Error::ColumnNotFound {
            table,
            column: format!("{key:?}"),
        })?;
        column.name = new_name.to_string();
        Ok(())
    }

    /// Change a column's nullability in place and return its (unchanged)
    /// handle.
    ///
    /// Widening never fails. Narrowing back-fills existing nulls with the
    /// type's zero value, or fails if `throw_on_null` is set and a null is
    /// present. Link and mixed columns cannot be narrowed.
    pub fn set_nullability(
        &mut self,
        key: ColumnKey,
        nullable: bool,
        throw_on_null: bool,
    ) -> Result<ColumnKey, Error> {
        let column = self.column(key).ok_or_else(|| Error::ColumnNotFound {
            table: self.name.clone(),
            column: format!("{key:?}"),
        })?;
        let (name, data_type) = (column.name.clone(), column.data_type);

        if !nullable {
            if matches!(data_type, DataType::Link | DataType::Mixed) {
                return Err(Error::NullConstraintViolation {
                    table: self.name.clone(),
                    column: name,
                });
            }
            let has_null = self
                .rows
                .iter()
                .any(|row| row.get(key).map_or(true, Value::is_null));
            if has_null {
                if throw_on_null {
                    return Err(Error::NullConstraintViolation {
                        table: self.name.clone(),
                        column: name,
                    });
                }
                let zero = Value::zero_for(data_type);
                for row in &mut self.rows {
                    if row.get(key).map_or(true, Value::is_null) {
                        row.set(key, zero.clone());
                    }
                }
            }
        }

        self.column_mut(key)
            .expect("column existence checked above")
            .nullable = nullable;
        Ok(key)
    }

    /// The current primary key column, if any.
    pub fn primary_key_column(&self) -> Option<ColumnKey> {
        self.primary_key
    }

    /// Set or clear the primary key column.
    pub fn set_primary_key_column(&mut self, col: Option<ColumnKey>) -> Result<(), Error> {
        if let Some(key) = col {
            if self.column(key).is_none() {
                return Err(Error::ColumnNotFound {
                    table: self.name.clone(),
                    column: format!("{key:?}"),
                });
            }
            if self.table_type == TableType::Embedded {
                return Err(Error::EmbeddedPrimaryKey {
                    table: self.name.clone(),
                });
            }
        }
        self.primary_key = col;
        Ok(())
    }

    /// Add a search index to a column.
    pub fn add_search_index(&mut self, key: ColumnKey, kind: IndexKind) -> Result<(), Error> {
        let table = self.name.clone();
        let column = self.column(key).ok_or_else(|| Error::ColumnNotFound {
            table: table.clone(),
            column: format!("{key:?}"),
        })?;
        let valid = match kind {
            IndexKind::None => true,
            IndexKind::General => {
                column.data_type.supports_search_index()
                    && column.collection == CollectionKind::None
            }
            IndexKind::Fulltext => {
                column.data_type == DataType::String
                    && !column.nullable
                    && column.collection == CollectionKind::None
            }
        };
        if !valid {
            return Err(Error::InvalidIndex {
                table,
                column: column.name.clone(),
            });
        }
        self.column_mut(key)
            .expect("column existence checked above")
            .index = kind;
        Ok(())
    }

    /// Add a full-text index to a string column.
    pub fn add_fulltext_index(&mut self, key: ColumnKey) -> Result<(), Error> {
        self.add_search_index(key, IndexKind::Fulltext)
    }

    /// Drop the search index of a column.
    pub fn remove_search_index(&mut self, key: ColumnKey) -> Result<(), Error> {
        let table = self.name.clone();
        let column = self.column_mut(key).ok_or(Error::ColumnNotFound {
            table,
            column: format!("{key:?}"),
        })?;
        column.index = IndexKind::None;
        Ok(())
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Create a row with all cells null and return its key.
    pub fn create_row(&mut self) -> u64 {
        let key = self.next_row_key;
        self.next_row_key += 1;
        self.rows.push(Row {
            key,
            values: Vec::new(),
        });
        key
    }

    /// Remove a row.
    pub fn remove_row(&mut self, row: u64) -> Result<(), Error> {
        let len = self.rows.len();
        self.rows.retain(|r| r.key != row);
        if self.rows.len() == len {
            return Err(Error::RowNotFound {
                table: self.name.clone(),
                row,
            });
        }
        Ok(())
    }

    /// Keys of all rows, in insertion order.
    pub fn row_keys(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.key).collect()
    }

    /// Read a cell. `None` means null.
    pub fn get_value(&self, row: u64, col: ColumnKey) -> Option<&Value> {
        self.rows
            .iter()
            .find(|r| r.key == row)
            .and_then(|r| r.get(col))
            .filter(|v| !v.is_null())
    }

    /// Write a cell. Storing [`Value::Null`] clears the cell and requires a
    /// nullable column.
    pub fn set_value(&mut self, row: u64, col: ColumnKey, value: Value) -> Result<(), Error> {
        let table = self.name.clone();
        let column = self.column(col).ok_or_else(|| Error::ColumnNotFound {
            table: table.clone(),
            column: format!("{col:?}"),
        })?;
        if !value.matches(column.data_type) {
            return Err(Error::TypeMismatch {
                table,
                column: column.name.clone(),
            });
        }
        if value.is_null() && !column.nullable {
            return Err(Error::NullConstraintViolation {
                table,
                column: column.name.clone(),
            });
        }
        let row_slot = self
            .rows
            .iter_mut()
            .find(|r| r.key == row)
            .ok_or(Error::RowNotFound { table, row })?;
        if value.is_null() {
            row_slot.clear(col);
        } else {
            row_slot.set(col, value);
        }
        Ok(())
    }

    pub(crate) fn rows_referencing(&self, target: TableKey) -> impl Iterator<Item = u64> + '_ {
        let link_cols: Vec<ColumnKey> = self
            .columns
            .iter()
            .filter(|c| c.link_target == Some(target))
            .map(|c| c.key)
            .collect();
        self.rows.iter().flat_map(move |row| {
            let matches: Vec<u64> = link_cols
                .iter()
                .filter_map(|col| match row.get(*col) {
                    Some(Value::Link(target_row)) => Some(*target_row),
                    _ => None,
                })
                .collect();
            matches.into_iter()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table() -> Table {
        Table::new(TableKey::new(0), "class_Dog", TableType::TopLevel)
    }

    #[test]
    fn test_add_and_lookup_columns() {
        let mut table = test_table();
        let name = table
            .add_column(DataType::String, "name", false, CollectionKind::None)
            .unwrap();
        let age = table
            .add_column(DataType::Int, "age", true, CollectionKind::None)
            .unwrap();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column_key("name"), Some(name));
        assert_eq!(table.column_key("age"), Some(age));
        assert!(table.column_key("missing").is_none());
        assert!(table.column(age).unwrap().nullable);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut table = test_table();
        table
            .add_column(DataType::Int, "age", false, CollectionKind::None)
            .unwrap();
        let result = table.add_column(DataType::Int, "age", false, CollectionKind::None);
        assert!(matches!(result, Err(Error::ColumnAlreadyExists { .. })));
    }

    #[test]
    fn test_rename_preserves_data() {
        let mut table = test_table();
        let col = table
            .add_column(DataType::String, "firstName", false, CollectionKind::None)
            .unwrap();
        let row = table.create_row();
        table.set_value(row, col, Value::String("Rex".into())).unwrap();

        table.rename_column(col, "name").unwrap();

        assert_eq!(table.column_key("name"), Some(col));
        assert!(table.column_key("firstName").is_none());
        assert_eq!(table.get_value(row, col), Some(&Value::String("Rex".into())));
    }

    #[test]
    fn test_remove_column_destroys_data() {
        let mut table = test_table();
        let col = table
            .add_column(DataType::Int, "age", true, CollectionKind::None)
            .unwrap();
        let row = table.create_row();
        table.set_value(row, col, Value::Int(3)).unwrap();

        table.remove_column(col).unwrap();
        let col2 = table
            .add_column(DataType::Int, "age", true, CollectionKind::None)
            .unwrap();

        assert_ne!(col, col2);
        assert!(table.get_value(row, col2).is_none());
    }

    #[test]
    fn test_set_nullability_widening() {
        let mut table = test_table();
        let col = table
            .add_column(DataType::Int, "age", false, CollectionKind::None)
            .unwrap();
        let key = table.set_nullability(col, true, false).unwrap();
        assert_eq!(key, col);
        assert!(table.column(col).unwrap().nullable);
    }

    #[test]
    fn test_set_nullability_narrowing_backfills() {
        let mut table = test_table();
        let col = table
            .add_column(DataType::Int, "age", true, CollectionKind::None)
            .unwrap();
        let row = table.create_row();

        table.set_nullability(col, false, false).unwrap();
        assert_eq!(table.get_value(row, col), Some(&Value::Int(0)));
    }

    #[test]
    fn test_set_nullability_narrowing_throws_on_null() {
        let mut table = test_table();
        let col = table
            .add_column(DataType::Int, "age", true, CollectionKind::None)
            .unwrap();
        table.create_row();

        let result = table.set_nullability(col, false, true);
        assert!(matches!(result, Err(Error::NullConstraintViolation { .. })));
    }

    #[test]
    fn test_primary_key_column() {
        let mut table = test_table();
        let col = table
            .add_column(DataType::String, "name", false, CollectionKind::None)
            .unwrap();

        table.set_primary_key_column(Some(col)).unwrap();
        assert_eq!(table.primary_key_column(), Some(col));

        table.set_primary_key_column(None).unwrap();
        assert!(table.primary_key_column().is_none());
    }

    #[test]
    fn test_embedded_table_rejects_primary_key() {
        let mut table = Table::new(TableKey::new(0), "class_Address", TableType::Embedded);
        let col = table
            .add_column(DataType::String, "street", false, CollectionKind::None)
            .unwrap();
        let result = table.set_primary_key_column(Some(col));
        assert!(matches!(result, Err(Error::EmbeddedPrimaryKey { .. })));
    }

    #[test]
    fn test_add_and_remove_search_index() {
        let mut table = test_table();
        let name = table
            .add_column(DataType::String, "name", false, CollectionKind::None)
            .unwrap();

        table.add_search_index(name, IndexKind::General).unwrap();
        assert_eq!(table.column(name).unwrap().index, IndexKind::General);

        table.remove_search_index(name).unwrap();
        assert_eq!(table.column(name).unwrap().index, IndexKind::None);

        table.add_fulltext_index(name).unwrap();
        assert_eq!(table.column(name).unwrap().index, IndexKind::Fulltext);
    }

    #[test]
    fn test_fulltext_requires_non_nullable_string() {
        let mut table = test_table();
        let bio = table
            .add_column(DataType::String, "bio", true, CollectionKind::None)
            .unwrap();
        let age = table
            .add_column(DataType::Int, "age", false, CollectionKind::None)
            .unwrap();

        assert!(matches!(
            table.add_fulltext_index(bio),
            Err(Error::InvalidIndex { .. })
        ));
        assert!(matches!(
            table.add_fulltext_index(age),
            Err(Error::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_general_index_rejected_on_unsupported_type() {
        let mut table = test_table();
        let weight = table
            .add_column(DataType::Double, "weight", false, CollectionKind::None)
            .unwrap();
        assert!(matches!(
            table.add_search_index(weight, IndexKind::General),
            Err(Error::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_null_rejected_on_required_column() {
        let mut table = test_table();
        let col = table
            .add_column(DataType::String, "name", false, CollectionKind::None)
            .unwrap();
        let row = table.create_row();
        let result = table.set_value(row, col, Value::Null);
        assert!(matches!(result, Err(Error::NullConstraintViolation { .. })));
    }
}
