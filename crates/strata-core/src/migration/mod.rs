//! Schema evolution for the object store.
//!
//! Clients declare a target [`Schema`](crate::schema::Schema); this module
//! makes a persisted group structurally conform to it:
//! - [`Schema::compare`](crate::schema::Schema::compare) produces the
//!   ordered [`SchemaChange`] list,
//! - the verifiers decide which changes are legal under the chosen
//!   [`SchemaMode`],
//! - [`apply_schema_changes`] drives the appliers and, when a migration is
//!   required, the user migration callback between the pre and post phases,
//! - the metadata record tracks the schema version.
//!
//! # Modes
//!
//! | Mode | Legal changes | Behavior |
//! |------|---------------|----------|
//! | `Automatic` | all | migration-requiring changes need a callback and a version bump |
//! | `Immutable` / `ReadOnly` | read-compatible ones | verify only, no writes |
//! | `SoftResetFile` / `HardResetFile` | all | signal a file reset instead of migrating |
//! | `AdditiveDiscovered` / `AdditiveExplicit` | schema-enlarging | removals tolerated, never applied |
//! | `Manual` | none | the callback does everything, then the schemas must match |

mod apply;
mod diff;
mod error;
mod metadata;
mod rename;
mod verify;

pub use apply::{apply_schema_changes, MigrationFunction};
pub use diff::SchemaChange;
pub use error::MigrationError;
pub use metadata::{get_schema_version, set_schema_version, NOT_VERSIONED};
pub use rename::rename_property;
pub use verify::{
    needs_migration, verify_compatible_for_immutable_and_readonly, verify_no_changes_required,
    verify_no_migration_required, verify_valid_additive_changes, verify_valid_external_changes,
};

/// Policy deciding which schema changes are legal and how they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Apply any change. Migration-requiring changes need a version bump
    /// and a migration callback.
    Automatic,
    /// The file is opened without write access; the diff is verified only
    /// to confirm the persisted schema can be read.
    Immutable,
    /// Like `Immutable`, but against a file other processes may write to.
    ReadOnly,
    /// Delete and recreate the file when a migration would be required.
    SoftResetFile,
    /// Delete and recreate the file on any schema mismatch.
    HardResetFile,
    /// Accept only schema-enlarging changes; the target schema is a
    /// discovered, possibly partial view of the file.
    AdditiveDiscovered,
    /// Accept only schema-enlarging changes declared explicitly by the
    /// application.
    AdditiveExplicit,
    /// The migration callback performs all changes itself; afterwards the
    /// persisted schema must match the target exactly.
    Manual,
}

impl SchemaMode {
    /// Whether the mode accepts only additive changes.
    pub fn is_additive(self) -> bool {
        matches!(
            self,
            SchemaMode::AdditiveDiscovered | SchemaMode::AdditiveExplicit
        )
    }

    pub(crate) fn is_reset(self) -> bool {
        matches!(self, SchemaMode::SoftResetFile | SchemaMode::HardResetFile)
    }
}
