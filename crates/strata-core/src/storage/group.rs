//! The group: an ordered collection of tables.

use rkyv::{Archive, Deserialize, Serialize};

use super::table::{Table, TableKey};
use super::value::{CollectionKind, DataType, TableType};
use crate::error::Error;

/// An ordered collection of tables plus the table-key allocator.
///
/// A group is the unit of persistence: the whole structure is serialized as
/// one snapshot by [`Store`](super::Store).
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Group {
    tables: Vec<Table>,
    next_table_key: u64,
}

impl Group {
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            next_table_key: 0,
        }
    }

    /// Number of tables.
    pub fn size(&self) -> usize {
        self.tables.len()
    }

    /// All tables in creation order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Keys of all tables in creation order.
    pub fn table_keys(&self) -> Vec<TableKey> {
        self.tables.iter().map(|t| t.key()).collect()
    }

    /// Name of a table, by key.
    pub fn table_name(&self, key: TableKey) -> Option<&str> {
        self.table(key).map(|t| t.name())
    }

    /// Look up a table by key.
    pub fn table(&self, key: TableKey) -> Option<&Table> {
        self.tables.iter().find(|t| t.key() == key)
    }

    /// Look up a table by key, mutably.
    pub fn table_mut(&mut self, key: TableKey) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.key() == key)
    }

    /// Look up a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Look up a table by name, mutably.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name() == name)
    }

    fn alloc_table_key(&mut self) -> TableKey {
        let key = TableKey::new(self.next_table_key);
        self.next_table_key += 1;
        key
    }

    /// Get an existing table by name or create it.
    pub fn get_or_add_table(&mut self, name: &str, table_type: TableType) -> TableKey {
        if let Some(table) = self.get_table(name) {
            return table.key();
        }
        let key = self.alloc_table_key();
        self.tables.push(Table::new(key, name, table_type));
        key
    }

    /// Create a table. Fails if a table with the name exists.
    pub fn add_table(&mut self, name: &str, table_type: TableType) -> Result<TableKey, Error> {
        if self.get_table(name).is_some() {
            return Err(Error::TableAlreadyExists {
                name: name.to_string(),
            });
        }
        let key = self.alloc_table_key();
        self.tables.push(Table::new(key, name, table_type));
        Ok(key)
    }

    /// Create a table together with its primary key column.
    pub fn add_table_with_primary_key(
        &mut self,
        name: &str,
        pk_type: DataType,
        pk_name: &str,
        nullable: bool,
        table_type: TableType,
    ) -> Result<TableKey, Error> {
        let key = self.add_table(name, table_type)?;
        let table = self.table_mut(key).expect("table just created");
        let col = table.add_column(pk_type, pk_name, nullable, CollectionKind::None)?;
        table.set_primary_key_column(Some(col))?;
        Ok(key)
    }

    /// Remove a table and all of its data.
    pub fn remove_table(&mut self, key: TableKey) -> Result<(), Error> {
        if self.table(key).is_none() {
            return Err(Error::TableNotFound {
                name: format!("{key:?}"),
            });
        }
        self.tables.retain(|t| t.key() != key);
        Ok(())
    }

    /// Change the kind of a table.
    ///
    /// Converting to [`TableType::Embedded`] requires the table to have no
    /// primary key, and every row must be the target of at least one
    /// incoming link. Rows without incoming links are deleted when
    /// `handle_backlinks_automatically` is set, otherwise the conversion
    /// fails.
    pub fn set_table_type(
        &mut self,
        key: TableKey,
        table_type: TableType,
        handle_backlinks_automatically: bool,
    ) -> Result<(), Error> {
        let table = self.table(key).ok_or_else(|| Error::TableNotFound {
            name: format!("{key:?}"),
        })?;

        if table_type == TableType::Embedded && table.table_type() != TableType::Embedded {
            if table.primary_key_column().is_some() {
                return Err(Error::EmbeddedPrimaryKey {
                    table: table.name().to_string(),
                });
            }
            let mut orphans: Vec<u64> = table.row_keys();
            for other in &self.tables {
                for linked_row in other.rows_referencing(key) {
                    orphans.retain(|r| *r != linked_row);
                }
            }
            if !orphans.is_empty() {
                if !handle_backlinks_automatically {
                    return Err(Error::EmbeddedOrphans {
                        table: table.name().to_string(),
                        count: orphans.len(),
                    });
                }
                let table = self.table_mut(key).expect("looked up above");
                for row in orphans {
                    table.remove_row(row)?;
                }
            }
        }

        self.table_mut(key)
            .expect("looked up above")
            .set_table_type_raw(table_type);
        Ok(())
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Value;

    #[test]
    fn test_get_or_add_table() {
        let mut group = Group::new();
        let a = group.get_or_add_table("class_Dog", TableType::TopLevel);
        let b = group.get_or_add_table("class_Dog", TableType::TopLevel);
        assert_eq!(a, b);
        assert_eq!(group.size(), 1);
    }

    #[test]
    fn test_add_table_rejects_duplicates() {
        let mut group = Group::new();
        group.add_table("class_Dog", TableType::TopLevel).unwrap();
        let result = group.add_table("class_Dog", TableType::TopLevel);
        assert!(matches!(result, Err(Error::TableAlreadyExists { .. })));
    }

    #[test]
    fn test_add_table_with_primary_key() {
        let mut group = Group::new();
        let key = group
            .add_table_with_primary_key(
                "class_Person",
                DataType::String,
                "name",
                false,
                TableType::TopLevel,
            )
            .unwrap();

        let table = group.table(key).unwrap();
        let pk_col = table.column_key("name").unwrap();
        assert_eq!(table.primary_key_column(), Some(pk_col));
    }

    #[test]
    fn test_remove_table() {
        let mut group = Group::new();
        let key = group.add_table("class_Dog", TableType::TopLevel).unwrap();
        group.remove_table(key).unwrap();
        assert_eq!(group.size(), 0);
        assert!(matches!(
            group.remove_table(key),
            Err(Error::TableNotFound { .. })
        ));
    }

    #[test]
    fn test_table_keys_stable_after_removal() {
        let mut group = Group::new();
        let a = group.add_table("class_A", TableType::TopLevel).unwrap();
        let b = group.add_table("class_B", TableType::TopLevel).unwrap();
        group.remove_table(a).unwrap();
        let c = group.add_table("class_C", TableType::TopLevel).unwrap();

        assert_ne!(a, c);
        assert_eq!(group.table_name(b), Some("class_B"));
        assert_eq!(group.table_name(c), Some("class_C"));
    }

    #[test]
    fn test_set_table_type_embedded_requires_links() {
        let mut group = Group::new();
        let address = group.add_table("class_Address", TableType::TopLevel).unwrap();
        group.table_mut(address).unwrap().create_row();

        // No table links to class_Address, so the row is an orphan.
        let result = group.set_table_type(address, TableType::Embedded, false);
        assert!(matches!(result, Err(Error::EmbeddedOrphans { count: 1, .. })));

        group
            .set_table_type(address, TableType::Embedded, true)
            .unwrap();
        let table = group.table(address).unwrap();
        assert_eq!(table.table_type(), TableType::Embedded);
        assert!(table.is_empty());
    }

    #[test]
    fn test_set_table_type_embedded_keeps_linked_rows() {
        let mut group = Group::new();
        let address = group.add_table("class_Address", TableType::TopLevel).unwrap();
        let person = group.add_table("class_Person", TableType::TopLevel).unwrap();

        let addr_row = group.table_mut(address).unwrap().create_row();
        let link_col = group
            .table_mut(person)
            .unwrap()
            .add_link_column(address, "home", CollectionKind::None)
            .unwrap();
        let person_row = group.table_mut(person).unwrap().create_row();
        group
            .table_mut(person)
            .unwrap()
            .set_value(person_row, link_col, Value::Link(addr_row))
            .unwrap();

        group
            .set_table_type(address, TableType::Embedded, false)
            .unwrap();
        assert_eq!(group.table(address).unwrap().row_count(), 1);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut group = Group::new();
        let key = group
            .add_table_with_primary_key(
                "class_Dog",
                DataType::String,
                "name",
                false,
                TableType::TopLevel,
            )
            .unwrap();
        let table = group.table_mut(key).unwrap();
        let age = table
            .add_column(DataType::Int, "age", true, CollectionKind::None)
            .unwrap();
        let row = table.create_row();
        table.set_value(row, age, Value::Int(4)).unwrap();

        let bytes = group.to_bytes().unwrap();
        let decoded = Group::from_bytes(&bytes).unwrap();
        assert_eq!(group, decoded);
    }
}
