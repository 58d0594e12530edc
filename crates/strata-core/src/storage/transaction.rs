//! Write transactions over a group.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use super::group::Group;
use super::store::Store;
use super::value::Value;
use crate::error::Error;

/// A write transaction.
///
/// Mutations apply to a working copy of the committed group; nothing is
/// persisted until [`commit`](Transaction::commit). Dropping the transaction
/// discards the working copy. All [`Group`] and table APIs are available
/// through deref.
pub struct Transaction<'a> {
    store: &'a mut Store,
    working: Group,
}

impl<'a> Transaction<'a> {
    pub(super) fn new(store: &'a mut Store) -> Self {
        let working = store.working_copy();
        Self { store, working }
    }

    /// Persist the working copy and make it the committed group.
    pub fn commit(self) -> Result<(), Error> {
        self.store.install(self.working)
    }

    /// Discard the working copy.
    pub fn rollback(self) {}

    /// Check every primary key column for null and duplicate values.
    pub fn validate_primary_columns(&self) -> Result<(), Error> {
        for table in self.working.tables() {
            let Some(pk) = table.primary_key_column() else {
                continue;
            };
            let nullable = table.column(pk).map(|c| c.nullable).unwrap_or(false);
            let mut seen = HashSet::new();
            for row in table.row_keys() {
                let value = table.get_value(row, pk);
                if value.is_none() && !nullable {
                    return Err(Error::NullPrimaryKey {
                        table: table.name().to_string(),
                    });
                }
                if let Some(key) = hashable_key(value) {
                    if !seen.insert(key) {
                        return Err(Error::DuplicatePrimaryKey {
                            table: table.name().to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Hashable projection of a primary key cell. Types that cannot legally be
/// primary keys (floats, links) project to `None` and skip duplicate
/// detection.
fn hashable_key(value: Option<&Value>) -> Option<PkKey<'_>> {
    match value {
        None | Some(Value::Null) => Some(PkKey::Null),
        Some(Value::Bool(b)) => Some(PkKey::Bool(*b)),
        Some(Value::Int(i)) => Some(PkKey::Int(*i)),
        Some(Value::String(s)) => Some(PkKey::Str(s)),
        Some(Value::Binary(b)) => Some(PkKey::Bytes(b)),
        Some(Value::Timestamp(t)) => Some(PkKey::Timestamp(*t)),
        Some(Value::ObjectId(o)) => Some(PkKey::ObjectId(o)),
        Some(Value::Decimal(d)) => Some(PkKey::Bytes(d)),
        Some(Value::Uuid(u)) => Some(PkKey::Uuid(u)),
        Some(Value::Float(_)) | Some(Value::Double(_)) | Some(Value::Link(_)) => None,
    }
}

#[derive(PartialEq, Eq, Hash)]
enum PkKey<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'a str),
    Bytes(&'a [u8]),
    Timestamp(i64),
    ObjectId(&'a [u8; 12]),
    Uuid(&'a [u8; 16]),
}

impl Deref for Transaction<'_> {
    type Target = Group;

    fn deref(&self) -> &Group {
        &self.working
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Group {
        &mut self.working
    }
}
