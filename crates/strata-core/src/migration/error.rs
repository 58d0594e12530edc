//! Schema-policy error types.

use thiserror::Error;

use crate::schema::{bullet_list, SchemaValidationError};

/// Appended to errors that typically show up while iterating on a schema.
const DEVELOPMENT_MODE_HINT: &str = "If your app is running in development mode, you can delete \
                                     the database file and restart the app to update your schema.";

fn list_message(header: &str, errors: &[String]) -> String {
    format!("{header}{}", bullet_list(errors))
}

fn hinted_message(header: &str, errors: &[String]) -> String {
    format!("{header}{}\n{DEVELOPMENT_MODE_HINT}", bullet_list(errors))
}

/// Errors raised by the schema evolution pipeline.
///
/// Verifiers accumulate every offending change before raising, so the
/// message-list variants describe the full set of problems at once.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The target schema version is older than the persisted one.
    #[error("provided schema version {new_version} is less than last set version {old_version}")]
    InvalidSchemaVersion {
        /// Version currently recorded in the file.
        old_version: u64,
        /// Version the caller asked for.
        new_version: u64,
    },

    /// The persisted schema requires changes the mode forbids, or the user
    /// failed to perform them.
    #[error("{}", list_message("migration is required due to the following errors:", .errors))]
    SchemaMismatch {
        /// One message per offending change.
        errors: Vec<String>,
    },

    /// Changes not permitted while the file is open read-only.
    #[error("{}", list_message("the following changes cannot be made in read-only schema mode:", .errors))]
    InvalidReadOnlySchemaChange {
        /// One message per offending change.
        errors: Vec<String>,
    },

    /// Changes not permitted in additive-only modes.
    #[error("{}", hinted_message("the following changes cannot be made in additive-only schema mode:", .errors))]
    InvalidAdditiveSchemaChange {
        /// One message per offending change.
        errors: Vec<String>,
    },

    /// Another writer changed the schema in a way this process cannot accept.
    #[error("{}", hinted_message("unsupported schema changes were made by another client or process:", .errors))]
    InvalidExternalSchemaChange {
        /// One message per offending change.
        errors: Vec<String>,
    },

    /// A post-migration property removal has no persisted source; a rename
    /// step was probably dropped inside the migration callback.
    #[error("renamed property '{class_name}.{property}' does not exist")]
    InvalidProperty {
        /// Class the property belongs to.
        class_name: String,
        /// The missing property.
        property: String,
    },

    /// A rename was requested against a class without a backing table.
    #[error("cannot rename properties for type '{class_name}' because {reason}")]
    NoSuchTable {
        /// Class the rename targeted.
        class_name: String,
        /// Why the class is unavailable.
        reason: String,
    },

    /// A rename would change the property in a way renames cannot express.
    #[error("{message}")]
    IllegalOperation {
        /// Description of the rejected operation.
        message: String,
    },

    /// A reset-mode open needs a migration; the caller must delete and
    /// recreate the file.
    #[error("opening with schema version {target_schema_version} requires migrating the file at \
             schema version {schema_version}; the file must be reset")]
    FileResetRequired {
        /// Version currently recorded in the file.
        schema_version: u64,
        /// Version the caller asked for.
        target_schema_version: u64,
    },

    /// The target schema violates its intrinsic invariants.
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] crate::error::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_lists_every_change() {
        let err = MigrationError::SchemaMismatch {
            errors: vec![
                "Property 'Dog.age' has been made required.".into(),
                "Class 'Cat' has been added.".into(),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("migration is required"));
        assert!(message.contains("\n- Property 'Dog.age' has been made required."));
        assert!(message.contains("\n- Class 'Cat' has been added."));
    }

    #[test]
    fn test_additive_error_appends_hint() {
        let err = MigrationError::InvalidAdditiveSchemaChange {
            errors: vec!["Property 'Dog.age' has been removed.".into()],
        };
        assert!(err.to_string().contains("development mode"));
    }

    #[test]
    fn test_version_error_message() {
        let err = MigrationError::InvalidSchemaVersion {
            old_version: 5,
            new_version: 3,
        };
        assert_eq!(
            err.to_string(),
            "provided schema version 3 is less than last set version 5"
        );
    }
}
