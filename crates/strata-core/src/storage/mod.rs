//! Table/column storage: groups, tables, transactions and the durable store.
//!
//! The schema engine treats this layer as a plain data store: tables hold
//! typed columns and sparse rows, a [`Group`] is the unit of persistence,
//! and a [`Store`] keeps the committed snapshot in sled. Handles
//! ([`TableKey`], [`ColumnKey`]) are stable for the lifetime of the object
//! they name.

mod group;
mod store;
mod table;
mod transaction;
mod value;

pub use group::Group;
pub use store::Store;
pub use table::{Column, ColumnKey, Table, TableKey};
pub use transaction::Transaction;
pub use value::{CollectionKind, DataType, IndexKind, TableType, Value};
