//! Field descriptors parsed from a describe payload.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::value::Value;

/// Field type as reported by the describe call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    String,
    Boolean,
    Double,
    Date,
    DateTime,
    TextArea,
    Address,
    Phone,
    Url,
    Currency,
    Picklist,
    Identity,
    Reference,
    /// Any type this crate has no special handling for.
    Other(String),
}

impl FieldType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "int" => FieldType::Integer,
            "string" => FieldType::String,
            "boolean" => FieldType::Boolean,
            "double" => FieldType::Double,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "textarea" => FieldType::TextArea,
            "address" => FieldType::Address,
            "phone" => FieldType::Phone,
            "url" => FieldType::Url,
            "currency" => FieldType::Currency,
            "picklist" => FieldType::Picklist,
            "id" => FieldType::Identity,
            "reference" => FieldType::Reference,
            other => FieldType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Integer => "int",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Double => "double",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::TextArea => "textarea",
            FieldType::Address => "address",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::Currency => "currency",
            FieldType::Picklist => "picklist",
            FieldType::Identity => "id",
            FieldType::Reference => "reference",
            FieldType::Other(s) => s,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Double | FieldType::Currency
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable picklist option.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PicklistEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

/// Type-specific attributes of a field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldFacets {
    #[default]
    None,
    Integer {
        digits: Option<u32>,
    },
    Double {
        scale: Option<u32>,
        precision: Option<u32>,
    },
    Reference {
        reference_to: Vec<String>,
        relationship_name: Option<String>,
    },
    Picklist(Vec<PicklistEntry>),
}

/// A single schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub field_type: FieldType,
    pub default_value: Value,
    pub can_create: bool,
    pub can_update: bool,
    pub facets: FieldFacets,
}

impl FieldDescriptor {
    pub fn picklist_values(&self) -> &[PicklistEntry] {
        match &self.facets {
            FieldFacets::Picklist(values) => values,
            _ => &[],
        }
    }

    pub fn reference_to(&self) -> &[String] {
        match &self.facets {
            FieldFacets::Reference { reference_to, .. } => reference_to,
            _ => &[],
        }
    }

    pub(crate) fn from_raw(raw: RawField) -> Self {
        let field_type = FieldType::parse(&raw.field_type);

        let facets = match field_type {
            FieldType::Integer => FieldFacets::Integer { digits: raw.digits },
            FieldType::Double => FieldFacets::Double {
                scale: raw.scale,
                precision: raw.precision,
            },
            FieldType::Reference => FieldFacets::Reference {
                reference_to: raw.reference_to,
                relationship_name: raw.relationship_name,
            },
            FieldType::Picklist => FieldFacets::Picklist(raw.picklist_values),
            _ => FieldFacets::None,
        };

        Self {
            label: raw.label.unwrap_or_else(|| raw.name.clone()),
            name: raw.name,
            required: !raw.nillable,
            field_type,
            default_value: Value::from_json(&raw.default_value),
            can_create: raw.createable,
            can_update: raw.updateable,
            facets,
        }
    }
}

/// Field entry as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawField {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub field_type: String,
    #[serde(default = "default_true")]
    pub nillable: bool,
    #[serde(default)]
    pub default_value: serde_json::Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub createable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updateable: bool,
    #[serde(default)]
    pub digits: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reference_to: Vec<String>,
    #[serde(default)]
    pub relationship_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub picklist_values: Vec<PicklistEntry>,
}

fn default_true() -> bool {
    true
}

/// Describe payloads send `null` for absent strings and lists.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
