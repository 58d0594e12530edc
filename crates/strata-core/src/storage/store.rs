//! Durable container for a group.

use sled::{Db, Tree};

use super::group::Group;
use super::transaction::Transaction;
use crate::error::Error;

/// Tree name for the group snapshot.
const GROUP_TREE: &str = "store:group";

/// Key of the serialized snapshot within the tree.
const SNAPSHOT_KEY: &[u8] = b"snapshot";

/// Sled-backed container holding the committed group.
///
/// The whole group is serialized as one snapshot; a write transaction works
/// on a copy and swaps it in atomically on commit.
pub struct Store {
    tree: Tree,
    group: Group,
}

impl Store {
    /// Open or create a store using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let tree = db.open_tree(GROUP_TREE)?;
        let group = match tree.get(SNAPSHOT_KEY)? {
            Some(bytes) => Group::from_bytes(&bytes)?,
            None => Group::new(),
        };
        Ok(Self { tree, group })
    }

    /// The committed group.
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Begin a write transaction over a working copy of the group.
    pub fn begin_write(&mut self) -> Transaction<'_> {
        Transaction::new(self)
    }

    pub(super) fn working_copy(&self) -> Group {
        self.group.clone()
    }

    pub(super) fn install(&mut self, group: Group) -> Result<(), Error> {
        let bytes = group.to_bytes()?;
        self.tree.insert(SNAPSHOT_KEY, bytes)?;
        self.group = group;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CollectionKind, DataType, TableType, Value};

    fn temp_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn test_open_empty() {
        let db = temp_db();
        let store = Store::open(&db).unwrap();
        assert_eq!(store.group().size(), 0);
    }

    #[test]
    fn test_commit_persists() {
        let db = temp_db();
        {
            let mut store = Store::open(&db).unwrap();
            let mut txn = store.begin_write();
            let key = txn.add_table("class_Dog", TableType::TopLevel).unwrap();
            let table = txn.table_mut(key).unwrap();
            let col = table
                .add_column(DataType::String, "name", false, CollectionKind::None)
                .unwrap();
            let row = table.create_row();
            table.set_value(row, col, Value::String("Rex".into())).unwrap();
            txn.commit().unwrap();
        }

        let store = Store::open(&db).unwrap();
        let table = store.group().get_table("class_Dog").unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_rollback_discards() {
        let db = temp_db();
        let mut store = Store::open(&db).unwrap();
        {
            let mut txn = store.begin_write();
            txn.add_table("class_Dog", TableType::TopLevel).unwrap();
            txn.rollback();
        }
        assert_eq!(store.group().size(), 0);

        // Dropping without commit behaves like rollback.
        {
            let mut txn = store.begin_write();
            txn.add_table("class_Cat", TableType::TopLevel).unwrap();
        }
        assert_eq!(store.group().size(), 0);
    }
}
