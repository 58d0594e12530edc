//! Schema diffing.
//!
//! Compares a persisted schema against a target schema and produces the
//! ordered change list the appliers consume.

use super::SchemaMode;
use crate::schema::{ObjectSchema, Property, Schema};
use crate::storage::{IndexKind, TableType};

/// A single structural difference between two schemas.
///
/// Variants carry owned clones of the definitions they concern, so a change
/// list stays valid while the group and the schemas are mutated during
/// apply.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    /// Class exists in the target schema only.
    AddTable {
        /// The class to create.
        object: ObjectSchema,
    },
    /// Class exists in the persisted schema only. Never applied
    /// automatically; data stays in place.
    RemoveTable {
        /// The orphaned class.
        object: ObjectSchema,
    },
    /// The class kind changed (top-level / embedded / asymmetric).
    ChangeTableType {
        /// The class, as declared in the target schema.
        object: ObjectSchema,
        /// Persisted kind.
        old_type: TableType,
        /// Target kind.
        new_type: TableType,
    },
    /// Companion of [`SchemaChange::AddTable`]: create the new class's
    /// columns in a second pass, once every table of the target schema
    /// exists and link columns can resolve their targets.
    AddInitialProperties {
        /// The class whose columns to create.
        object: ObjectSchema,
    },
    /// Property exists in the target class only.
    AddProperty {
        /// Owning class.
        class_name: String,
        /// The property to add.
        property: Property,
    },
    /// Property exists in the persisted class only.
    RemoveProperty {
        /// Owning class.
        class_name: String,
        /// The property to remove.
        property: Property,
    },
    /// The property's column shape (kind, collection or link target)
    /// changed.
    ChangePropertyType {
        /// Owning class.
        class_name: String,
        /// Persisted shape.
        old_property: Property,
        /// Target shape.
        new_property: Property,
    },
    /// The property became nullable.
    MakePropertyNullable {
        /// Owning class.
        class_name: String,
        /// The property, as declared in the target schema.
        property: Property,
    },
    /// The property became required.
    MakePropertyRequired {
        /// Owning class.
        class_name: String,
        /// The property, as declared in the target schema.
        property: Property,
    },
    /// The primary key moved, appeared or disappeared.
    ChangePrimaryKey {
        /// Owning class.
        class_name: String,
        /// Persisted primary key name, if any.
        old_primary_key: Option<String>,
        /// Target primary key property; `None` removes the key.
        property: Option<Property>,
    },
    /// A search index was requested on the property.
    AddIndex {
        /// Owning class.
        class_name: String,
        /// The property to index.
        property: Property,
        /// The requested index kind.
        kind: IndexKind,
    },
    /// The property's search index was dropped.
    RemoveIndex {
        /// Owning class.
        class_name: String,
        /// The property to unindex.
        property: Property,
    },
}

impl Schema {
    /// Compute the ordered change list turning `self` into `target`.
    ///
    /// All `AddTable` entries come first (in target order), then table
    /// removals, then the paired `AddInitialProperties` entries, then
    /// per-class changes in target order. In
    /// [`SchemaMode::AdditiveDiscovered`] property removals are suppressed:
    /// a discovered schema may be a subset view of the file.
    pub fn compare(&self, target: &Schema, mode: SchemaMode) -> Vec<SchemaChange> {
        let mut changes = Vec::new();

        let added: Vec<&ObjectSchema> = target
            .iter()
            .filter(|object| self.find(&object.name).is_none())
            .collect();

        for object in &added {
            changes.push(SchemaChange::AddTable {
                object: (*object).clone(),
            });
        }
        for object in self {
            if target.find(&object.name).is_none() {
                changes.push(SchemaChange::RemoveTable {
                    object: object.clone(),
                });
            }
        }
        for object in &added {
            changes.push(SchemaChange::AddInitialProperties {
                object: (*object).clone(),
            });
        }

        for target_object in target {
            if let Some(existing) = self.find(&target_object.name) {
                compare_objects(existing, target_object, mode, &mut changes);
            }
        }

        changes
    }
}

fn compare_objects(
    existing: &ObjectSchema,
    target: &ObjectSchema,
    mode: SchemaMode,
    changes: &mut Vec<SchemaChange>,
) {
    if existing.table_type != target.table_type {
        changes.push(SchemaChange::ChangeTableType {
            object: target.clone(),
            old_type: existing.table_type,
            new_type: target.table_type,
        });
    }

    for property in &target.persisted_properties {
        let Some(old) = existing.persisted_property(&property.name) else {
            changes.push(SchemaChange::AddProperty {
                class_name: target.name.clone(),
                property: property.clone(),
            });
            continue;
        };

        if !old.same_shape(property) {
            // Replacing the column re-creates nullability and indexes, so
            // those differences are folded into the type change.
            changes.push(SchemaChange::ChangePropertyType {
                class_name: target.name.clone(),
                old_property: old.clone(),
                new_property: property.clone(),
            });
            continue;
        }

        if !old.nullable && property.nullable {
            changes.push(SchemaChange::MakePropertyNullable {
                class_name: target.name.clone(),
                property: property.clone(),
            });
        } else if old.nullable && !property.nullable {
            changes.push(SchemaChange::MakePropertyRequired {
                class_name: target.name.clone(),
                property: property.clone(),
            });
        }

        if old.index != property.index {
            if old.index != IndexKind::None {
                changes.push(SchemaChange::RemoveIndex {
                    class_name: target.name.clone(),
                    property: old.clone(),
                });
            }
            if property.index != IndexKind::None {
                changes.push(SchemaChange::AddIndex {
                    class_name: target.name.clone(),
                    property: property.clone(),
                    kind: property.index,
                });
            }
        }
    }

    if mode != SchemaMode::AdditiveDiscovered {
        for old in &existing.persisted_properties {
            if target.persisted_property(&old.name).is_none() {
                changes.push(SchemaChange::RemoveProperty {
                    class_name: target.name.clone(),
                    property: old.clone(),
                });
            }
        }
    }

    if existing.primary_key != target.primary_key {
        changes.push(SchemaChange::ChangePrimaryKey {
            class_name: target.name.clone(),
            old_primary_key: existing.primary_key.clone(),
            property: target.primary_key_property().cloned(),
        });
    }
}
