//! Schema catalog of one record type.

use chrono::{Local, Utc};
use indexmap::IndexMap;

use crate::error::{OrmError, Result};
use crate::value::Value;

use super::field::{FieldDescriptor, FieldType, RawField};

/// Name of the identity field when the schema does not declare an `id` type.
pub const DEFAULT_IDENTITY_FIELD: &str = "Id";

/// Immutable field catalog parsed from a describe payload.
///
/// Fields are keyed by their lower-cased name and kept in schema order.
#[derive(Debug, Clone)]
pub struct Metadata {
    name: Option<String>,
    fields: IndexMap<String, FieldDescriptor>,
    source: serde_json::Value,
}

impl Metadata {
    /// Build a catalog from a raw describe payload.
    pub fn parse(source: serde_json::Value) -> Result<Self> {
        let raw_fields = source
            .get("fields")
            .and_then(|f| f.as_array())
            .ok_or_else(|| OrmError::schema("payload has no 'fields' list"))?;

        let mut fields = IndexMap::with_capacity(raw_fields.len());
        for raw in raw_fields {
            let raw: RawField = serde_json::from_value(raw.clone())
                .map_err(|e| OrmError::schema(format!("invalid field entry: {}", e)))?;
            let field = FieldDescriptor::from_raw(raw);
            fields.insert(field.name.to_lowercase(), field);
        }

        let name = source
            .get("name")
            .and_then(|n| n.as_str())
            .map(|s| s.to_string());

        Ok(Self {
            name,
            fields,
            source,
        })
    }

    /// Type name reported by the describe payload, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_lowercase())
    }

    /// Non-failing lookup.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(&name.to_lowercase())
    }

    /// All fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.values().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The original describe payload.
    pub fn describe(&self) -> &serde_json::Value {
        &self.source
    }

    /// Name of the identity field.
    pub fn identity_field(&self) -> &str {
        self.fields
            .values()
            .find(|f| f.field_type == FieldType::Identity)
            .map(|f| f.name.as_str())
            .unwrap_or(DEFAULT_IDENTITY_FIELD)
    }

    /// Placeholder value suitable for building a create payload in tests.
    pub fn sample_value(&self, field: &FieldDescriptor) -> Value {
        match field.field_type {
            FieldType::Integer | FieldType::Double | FieldType::Currency => Value::Int(1),
            FieldType::Boolean => Value::Bool(false),
            FieldType::String | FieldType::TextArea => Value::String("Test Value".to_string()),
            FieldType::Date => Value::Date(Local::now().date_naive()),
            FieldType::DateTime => Value::DateTime(Utc::now()),
            FieldType::Url => Value::String("https://example.org/".to_string()),
            FieldType::Phone => Value::String("555-555-5555".to_string()),
            FieldType::Picklist => self
                .field(&field.name)
                .and_then(|f| f.picklist_values().first())
                .map(|entry| Value::String(entry.value.clone()))
                .unwrap_or(Value::Null),
            _ => Value::Int(1),
        }
    }
}
