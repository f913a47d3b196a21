use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BinderError, Result};
use crate::item::MetadataValue;

/// Type of a project-defined metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    /// Stored as an ISO `YYYY-MM-DD` string
    Date,
    Checkbox,
    List { options: Vec<String> },
}

/// Definition of a custom metadata column (e.g. "POV").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Key used in an item's `custom_metadata` map
    pub id: String,
    /// Display name
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Registry of custom metadata fields, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRegistry {
    fields: Vec<FieldDef>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_defs(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Register a new field. Returns error if the ID is taken.
    pub fn register(&mut self, field: FieldDef) -> Result<()> {
        if self.get(&field.id).is_some() {
            return Err(BinderError::InvalidMetadata {
                field: field.id,
                message: "field already registered".into(),
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// Get a field by ID.
    pub fn get(&self, id: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// List all registered fields in registration order.
    pub fn list(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Check a metadata map against the registered fields.
    ///
    /// Keys with no registered field are accepted as-is.
    pub fn validate(&self, metadata: &BTreeMap<String, MetadataValue>) -> Result<()> {
        for (key, value) in metadata {
            let Some(def) = self.get(key) else {
                continue;
            };
            if let Err(message) = value_matches(&def.kind, value) {
                return Err(BinderError::InvalidMetadata {
                    field: key.clone(),
                    message,
                });
            }
        }
        Ok(())
    }
}

fn value_matches(kind: &FieldKind, value: &MetadataValue) -> std::result::Result<(), String> {
    match (kind, value) {
        (FieldKind::Text, MetadataValue::Text(_)) => Ok(()),
        (FieldKind::Checkbox, MetadataValue::Bool(_)) => Ok(()),
        (FieldKind::Date, MetadataValue::Text(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|_| ())
            .map_err(|e| format!("expected YYYY-MM-DD date, got '{}': {}", s, e)),
        (FieldKind::List { options }, MetadataValue::Text(s)) => {
            if options.iter().any(|o| o == s) {
                Ok(())
            } else {
                Err(format!("'{}' is not one of {:?}", s, options))
            }
        }
        (kind, value) => Err(format!(
            "expected {}, got {}",
            kind_name(kind),
            value_type_name(value)
        )),
    }
}

fn kind_name(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Date => "date",
        FieldKind::Checkbox => "checkbox",
        FieldKind::List { .. } => "list",
    }
}

fn value_type_name(value: &MetadataValue) -> &'static str {
    match value {
        MetadataValue::Bool(_) => "bool",
        MetadataValue::Text(_) => "text",
    }
}
