//! Object class definitions.

use super::property::Property;
use crate::storage::{TableKey, TableType};

/// An object class: a named set of typed properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    /// Class name, unique within the schema.
    pub name: String,
    /// Kind of the backing table.
    pub table_type: TableType,
    /// Properties stored as columns, in declaration order.
    pub persisted_properties: Vec<Property>,
    /// Computed backlink properties.
    pub computed_properties: Vec<Property>,
    /// Name of the primary key property, if any.
    pub primary_key: Option<String>,
    /// Storage handle, populated when the schema is bound to a group.
    pub table_key: Option<TableKey>,
}

impl ObjectSchema {
    /// Create an empty top-level class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_type: TableType::TopLevel,
            persisted_properties: Vec::new(),
            computed_properties: Vec::new(),
            primary_key: None,
            table_key: None,
        }
    }

    /// Set the backing table kind.
    pub fn with_table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    /// Add a property. Computed properties are routed to the computed list;
    /// a property marked primary records the class primary key.
    pub fn with_property(mut self, property: Property) -> Self {
        if property.is_computed() {
            self.computed_properties.push(property);
        } else {
            if property.is_primary {
                self.primary_key = Some(property.name.clone());
            }
            self.persisted_properties.push(property);
        }
        self
    }

    /// Look up a property by name, persisted first.
    pub fn property_for_name(&self, name: &str) -> Option<&Property> {
        self.persisted_property(name)
            .or_else(|| self.computed_properties.iter().find(|p| p.name == name))
    }

    /// Look up a persisted property by name.
    pub fn persisted_property(&self, name: &str) -> Option<&Property> {
        self.persisted_properties.iter().find(|p| p.name == name)
    }

    pub(crate) fn persisted_property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.persisted_properties.iter_mut().find(|p| p.name == name)
    }

    /// The primary key property, if one is declared.
    pub fn primary_key_property(&self) -> Option<&Property> {
        self.primary_key
            .as_deref()
            .and_then(|name| self.persisted_property(name))
    }
}
