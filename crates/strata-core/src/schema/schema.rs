//! The schema: an ordered set of object classes.

use thiserror::Error;

use super::object::ObjectSchema;
use super::property::PropertyKind;
use crate::storage::{CollectionKind, IndexKind, TableType};

/// Intrinsic schema violations, accumulated across the whole schema.
#[derive(Debug, Error)]
#[error("schema validation failed due to the following errors:{}", bullet_list(.errors))]
pub struct SchemaValidationError {
    /// One message per violation.
    pub errors: Vec<String>,
}

pub(crate) fn bullet_list(errors: &[String]) -> String {
    let mut out = String::new();
    for error in errors {
        out.push_str("\n- ");
        out.push_str(error);
    }
    out
}

/// An ordered set of object classes, indexed by class name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    objects: Vec<ObjectSchema>,
}

impl Schema {
    /// Build a schema from classes. Classes are kept sorted by name so diff
    /// output is stable.
    pub fn new(mut objects: Vec<ObjectSchema>) -> Self {
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Self { objects }
    }

    /// The empty schema.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the schema has no classes.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up a class by name.
    pub fn find(&self, name: &str) -> Option<&ObjectSchema> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Look up a class by name, mutably.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut ObjectSchema> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    /// Iterate classes in name order.
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectSchema> {
        self.objects.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, ObjectSchema> {
        self.objects.iter_mut()
    }

    /// Check the intrinsic invariants of the schema and report every
    /// violation at once.
    pub fn validate(&self) -> Result<(), SchemaValidationError> {
        let mut errors = Vec::new();

        for window in self.objects.windows(2) {
            if window[0].name == window[1].name {
                errors.push(format!("Class '{}' is declared twice.", window[0].name));
            }
        }

        for object in &self.objects {
            self.validate_object(object, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError { errors })
        }
    }

    fn validate_object(&self, object: &ObjectSchema, errors: &mut Vec<String>) {
        let mut seen = std::collections::HashSet::new();
        for property in object
            .persisted_properties
            .iter()
            .chain(&object.computed_properties)
        {
            if !seen.insert(property.name.as_str()) {
                errors.push(format!(
                    "Property '{}.{}' is declared twice.",
                    object.name, property.name
                ));
            }
        }

        let primary_count = object
            .persisted_properties
            .iter()
            .filter(|p| p.is_primary)
            .count();
        if primary_count > 1 {
            errors.push(format!(
                "Class '{}' has more than one primary key property.",
                object.name
            ));
        }
        match (&object.primary_key, primary_count) {
            (Some(name), _) if object.persisted_property(name).is_none() => {
                errors.push(format!(
                    "Primary key property '{}.{}' does not exist.",
                    object.name, name
                ));
            }
            (Some(name), 0) => {
                errors.push(format!(
                    "Primary key property '{}.{}' is not marked primary.",
                    object.name, name
                ));
            }
            (None, n) if n > 0 => {
                errors.push(format!(
                    "Class '{}' has a primary property but no primary key name.",
                    object.name
                ));
            }
            _ => {}
        }
        if let Some(pk) = object.primary_key_property() {
            if !matches!(
                pk.kind,
                PropertyKind::Int | PropertyKind::String | PropertyKind::ObjectId | PropertyKind::Uuid
            ) {
                errors.push(format!(
                    "Primary key property '{}.{}' cannot be of type '{}'.",
                    object.name,
                    pk.name,
                    pk.type_description()
                ));
            }
            if pk.collection != CollectionKind::None {
                errors.push(format!(
                    "Primary key property '{}.{}' cannot be a collection.",
                    object.name, pk.name
                ));
            }
        }
        if object.table_type == TableType::Embedded && object.primary_key.is_some() {
            errors.push(format!(
                "Embedded class '{}' cannot have a primary key.",
                object.name
            ));
        }

        for property in &object.persisted_properties {
            if property.is_computed() {
                errors.push(format!(
                    "Property '{}.{}' of type 'linking objects' cannot be persisted.",
                    object.name, property.name
                ));
                continue;
            }
            if property.kind == PropertyKind::Object {
                match property.object_type.as_deref().and_then(|t| self.find(t)) {
                    None => errors.push(format!(
                        "Property '{}.{}' of type 'object' has unknown object type '{}'.",
                        object.name,
                        property.name,
                        property.object_type.as_deref().unwrap_or("")
                    )),
                    Some(target) if target.table_type == TableType::TopLevelAsymmetric => {
                        errors.push(format!(
                            "Property '{}.{}' cannot link to asymmetric class '{}'.",
                            object.name, property.name, target.name
                        ));
                    }
                    Some(_) => {}
                }
                if property.collection == CollectionKind::None && !property.nullable {
                    errors.push(format!(
                        "Property '{}.{}' of type 'object' must be optional.",
                        object.name, property.name
                    ));
                }
            }
            match property.index {
                IndexKind::None => {}
                IndexKind::General => {
                    let indexable = matches!(
                        property.kind,
                        PropertyKind::Int
                            | PropertyKind::Bool
                            | PropertyKind::String
                            | PropertyKind::Date
                            | PropertyKind::ObjectId
                            | PropertyKind::Uuid
                    ) && property.collection == CollectionKind::None;
                    if !indexable {
                        errors.push(format!(
                            "Property '{}.{}' of type '{}' cannot be indexed.",
                            object.name,
                            property.name,
                            property.type_description()
                        ));
                    }
                }
                IndexKind::Fulltext => {
                    if property.kind != PropertyKind::String
                        || property.nullable
                        || property.collection != CollectionKind::None
                    {
                        errors.push(format!(
                            "Full-text index on '{}.{}' requires a required string property.",
                            object.name, property.name
                        ));
                    }
                }
            }
        }

        for property in &object.computed_properties {
            if !property.is_computed() {
                errors.push(format!(
                    "Property '{}.{}' of type '{}' cannot be computed.",
                    object.name,
                    property.name,
                    property.type_description()
                ));
                continue;
            }
            let Some(target) = property.object_type.as_deref().and_then(|t| self.find(t)) else {
                errors.push(format!(
                    "Property '{}.{}' of type 'linking objects' has unknown object type '{}'.",
                    object.name,
                    property.name,
                    property.object_type.as_deref().unwrap_or("")
                ));
                continue;
            };
            let Some(origin_name) = property.link_origin_property.as_deref() else {
                errors.push(format!(
                    "Property '{}.{}' of type 'linking objects' must name an origin property.",
                    object.name, property.name
                ));
                continue;
            };
            match target.persisted_property(origin_name) {
                None => errors.push(format!(
                    "Property '{}.{}' declares an origin property '{}.{}' that does not exist.",
                    object.name, property.name, target.name, origin_name
                )),
                Some(origin) if origin.kind != PropertyKind::Object => errors.push(format!(
                    "Origin property '{}.{}' of linking objects property '{}.{}' is not a link.",
                    target.name, origin_name, object.name, property.name
                )),
                Some(origin) if origin.object_type.as_deref() != Some(object.name.as_str()) => {
                    errors.push(format!(
                        "Origin property '{}.{}' links to class '{}', not '{}'.",
                        target.name,
                        origin_name,
                        origin.object_type.as_deref().unwrap_or(""),
                        object.name
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

impl From<Vec<ObjectSchema>> for Schema {
    fn from(objects: Vec<ObjectSchema>) -> Self {
        Schema::new(objects)
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a ObjectSchema;
    type IntoIter = std::slice::Iter<'a, ObjectSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Property;

    fn dog_class() -> ObjectSchema {
        ObjectSchema::new("Dog")
            .with_property(Property::new("name", PropertyKind::String))
            .with_property(Property::new("age", PropertyKind::Int).nullable())
            .with_property(Property::object("owner", "Person"))
    }

    fn person_class() -> ObjectSchema {
        ObjectSchema::new("Person")
            .with_property(Property::new("name", PropertyKind::String).primary())
            .with_property(Property::linking_objects("dogs", "Dog", "owner"))
    }

    #[test]
    fn test_valid_schema() {
        let schema = Schema::new(vec![dog_class(), person_class()]);
        schema.validate().unwrap();
    }

    #[test]
    fn test_classes_sorted_by_name() {
        let schema = Schema::new(vec![person_class(), dog_class()]);
        let names: Vec<_> = schema.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Dog", "Person"]);
    }

    #[test]
    fn test_unknown_link_target() {
        let schema = Schema::new(vec![dog_class()]);
        let err = schema.validate().unwrap_err();
        assert!(err
            .errors
            .iter()
            .any(|e| e.contains("unknown object type 'Person'")));
    }

    #[test]
    fn test_duplicate_class() {
        let schema = Schema::new(vec![
            ObjectSchema::new("Dog").with_property(Property::new("a", PropertyKind::Int)),
            ObjectSchema::new("Dog").with_property(Property::new("b", PropertyKind::Int)),
        ]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("declared twice")));
    }

    #[test]
    fn test_two_primary_keys() {
        let schema = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("a", PropertyKind::Int).primary())
            .with_property(Property::new("b", PropertyKind::String).primary())]);
        let err = schema.validate().unwrap_err();
        assert!(err
            .errors
            .iter()
            .any(|e| e.contains("more than one primary key")));
    }

    #[test]
    fn test_invalid_primary_key_type() {
        let schema = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("weight", PropertyKind::Double).primary())]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("cannot be of type")));
    }

    #[test]
    fn test_embedded_class_with_primary_key() {
        let schema = Schema::new(vec![ObjectSchema::new("Address")
            .with_table_type(TableType::Embedded)
            .with_property(Property::new("id", PropertyKind::Int).primary())]);
        let err = schema.validate().unwrap_err();
        assert!(err
            .errors
            .iter()
            .any(|e| e.contains("Embedded class 'Address'")));
    }

    #[test]
    fn test_link_to_asymmetric_class() {
        let schema = Schema::new(vec![
            ObjectSchema::new("Event")
                .with_table_type(TableType::TopLevelAsymmetric)
                .with_property(Property::new("id", PropertyKind::Int)),
            ObjectSchema::new("Log").with_property(Property::object("event", "Event")),
        ]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("asymmetric")));
    }

    #[test]
    fn test_required_single_link_rejected() {
        let mut link = Property::object("owner", "Person");
        link.nullable = false;
        let schema = Schema::new(vec![
            ObjectSchema::new("Dog").with_property(link),
            ObjectSchema::new("Person").with_property(Property::new("name", PropertyKind::String)),
        ]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("must be optional")));
    }

    #[test]
    fn test_invalid_index_combination() {
        let schema = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("weight", PropertyKind::Double).with_index(IndexKind::General))]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("cannot be indexed")));
    }

    #[test]
    fn test_fulltext_requires_required_string() {
        let schema = Schema::new(vec![ObjectSchema::new("Doc").with_property(
            Property::new("body", PropertyKind::String)
                .nullable()
                .with_index(IndexKind::Fulltext),
        )]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("Full-text index")));
    }

    #[test]
    fn test_linking_objects_origin_checks() {
        // Origin missing on target.
        let schema = Schema::new(vec![
            ObjectSchema::new("Dog").with_property(Property::new("name", PropertyKind::String)),
            ObjectSchema::new("Person")
                .with_property(Property::new("name", PropertyKind::String))
                .with_property(Property::linking_objects("dogs", "Dog", "owner")),
        ]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("does not exist")));

        // Origin links to the wrong class.
        let schema = Schema::new(vec![
            ObjectSchema::new("Bone").with_property(Property::new("id", PropertyKind::Int)),
            ObjectSchema::new("Dog").with_property(Property::object("favorite", "Bone")),
            ObjectSchema::new("Person")
                .with_property(Property::new("name", PropertyKind::String))
                .with_property(Property::linking_objects("dogs", "Dog", "favorite")),
        ]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("links to class 'Bone'")));
    }

    #[test]
    fn test_multiple_errors_accumulate() {
        let schema = Schema::new(vec![ObjectSchema::new("Dog")
            .with_property(Property::new("weight", PropertyKind::Double).primary())
            .with_property(Property::object("owner", "Missing"))]);
        let err = schema.validate().unwrap_err();
        assert!(err.errors.len() >= 2);
        let message = err.to_string();
        assert!(message.contains("schema validation failed"));
        assert!(message.contains("\n- "));
    }
}
