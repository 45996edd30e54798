//! Metadata-governed record container and its remote lifecycle.
//!
//! A record without an identity value is transient; `save()` creates it
//! remotely and stores the server-assigned id, after which `save()` updates
//! and `delete()` removes it.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;

use crate::cache::CacheEntry;
use crate::connection::Connection;
use crate::error::{OrmError, Result};
use crate::http::HttpRequest;
use crate::value::{Value, DATETIME_FORMAT, DATE_FORMAT};

use super::field::{FieldDescriptor, FieldType};
use super::metadata::Metadata;
use super::resource::ResourceType;

const HTTP_CREATED: u16 = 201;
const HTTP_NO_CONTENT: u16 = 204;
const HTTP_NOT_FOUND: u16 = 404;

/// One remote entity instance.
#[derive(Debug, Clone)]
pub struct Record {
    resource: ResourceType,
    metadata: Arc<Metadata>,
    attributes: IndexMap<String, Value>,
    original: IndexMap<String, Value>,
}

impl Record {
    /// An empty, not yet persisted record.
    pub fn new(resource: ResourceType, metadata: Arc<Metadata>) -> Self {
        Self {
            resource,
            metadata,
            attributes: IndexMap::new(),
            original: IndexMap::new(),
        }
    }

    /// An empty record, loading the type's metadata through `conn` if needed.
    pub fn build(conn: &Connection, resource: &ResourceType) -> Result<Self> {
        let metadata = conn.metadata(resource)?;
        Ok(Self::new(resource.clone(), metadata))
    }

    /// Build a record from a JSON object returned by the API.
    ///
    /// Keys that are not schema fields (such as the `attributes` envelope)
    /// are skipped. Values are coerced according to their field type.
    pub fn hydrate(
        resource: ResourceType,
        metadata: Arc<Metadata>,
        payload: &serde_json::Value,
    ) -> Result<Self> {
        let object = payload.as_object().ok_or_else(|| {
            OrmError::schema(format!("{} payload is not an object", resource))
        })?;

        let mut attributes = IndexMap::with_capacity(object.len());
        for (key, raw) in object {
            match metadata.field(key) {
                Some(field) => {
                    attributes.insert(key.to_lowercase(), coerce(field, raw));
                }
                None => tracing::trace!(resource = %resource, key = %key, "skipping non-field key"),
            }
        }

        Ok(Self {
            resource,
            metadata,
            original: attributes.clone(),
            attributes,
        })
    }

    /// Build a record from already-typed values. Every key must be a field.
    pub fn from_values<I, K>(
        resource: ResourceType,
        metadata: Arc<Metadata>,
        values: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut record = Self::new(resource, metadata);
        for (key, value) in values {
            record.set(key.as_ref(), value)?;
        }
        record.original = record.attributes.clone();
        Ok(record)
    }

    pub fn resource(&self) -> &ResourceType {
        &self.resource
    }

    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    /// Current value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(&key.to_lowercase())
    }

    /// Like [`Record::get`] but fails for names outside the schema.
    pub fn try_get(&self, key: &str) -> Result<Option<&Value>> {
        if !self.metadata.has_field(key) {
            return Err(OrmError::unknown_field(key));
        }
        Ok(self.get(key))
    }

    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// Current value of `key`, or the result of `default` when unset.
    pub fn get_or_else<F>(&self, key: &str, default: F) -> Value
    where
        F: FnOnce() -> Value,
    {
        self.get(key).cloned().unwrap_or_else(default)
    }

    /// Set a field value. Fails for names outside the schema.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        if !self.metadata.has_field(key) {
            return Err(OrmError::unknown_field(key));
        }
        self.attributes.insert(key.to_lowercase(), value.into());
        Ok(self)
    }

    /// Clear a field value.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.attributes.shift_remove(&key.to_lowercase())
    }

    /// Values as loaded, before any `set`.
    pub fn original(&self) -> &IndexMap<String, Value> {
        &self.original
    }

    /// Raw attribute map keyed by lower-cased field name.
    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    /// Non-null values in schema order, keyed by the schema's field name.
    pub fn as_map(&self) -> IndexMap<String, Value> {
        self.metadata
            .fields()
            .filter_map(|field| {
                self.attributes
                    .get(&field.name.to_lowercase())
                    .filter(|v| !v.is_null())
                    .map(|v| (field.name.clone(), v.clone()))
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        fields_to_json(self.as_map())
    }

    /// Every field name known to the schema.
    pub fn field_list(&self) -> Vec<&str> {
        self.metadata.field_names()
    }

    pub fn id(&self) -> Option<&str> {
        self.get(self.metadata.identity_field())
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn is_persisted(&self) -> bool {
        self.id().is_some()
    }

    /// Fetch one record by id.
    pub fn find(conn: &Connection, resource: &ResourceType, id: &str) -> Result<Self> {
        let metadata = conn.metadata(resource)?;

        if let Some(cached) = conn.cache_lookup(resource.name(), id) {
            return Self::hydrate(resource.clone(), metadata, &cached);
        }

        let response = conn.transport().send(HttpRequest::get(resource.item_path(id)))?;
        if response.status == HTTP_NOT_FOUND {
            return Err(OrmError::not_found(resource.name(), id));
        }
        if !response.is_success() {
            return Err(OrmError::http(format!(
                "GET {} returned HTTP {}: {}",
                resource.item_path(id),
                response.status,
                response.body
            )));
        }

        let payload = response
            .json()?
            .filter(|p| !p.is_null())
            .ok_or_else(|| OrmError::not_found(resource.name(), id))?;

        let entry = CacheEntry::new(payload.clone()).with_remote_times(
            payload.get("CreatedDate").and_then(parse_remote_time),
            payload.get("LastModifiedDate").and_then(parse_remote_time),
        );
        conn.cache_store(resource.name(), id, entry);

        Self::hydrate(resource.clone(), metadata, &payload)
    }

    /// Create or update the record remotely. Returns the record id.
    pub fn save(&mut self, conn: &Connection) -> Result<String> {
        match self.id().map(|s| s.to_string()) {
            Some(id) => self.update(conn, id),
            None => self.create(conn),
        }
    }

    /// Fields sent on create: creatable, non-null, never the identity.
    pub fn create_payload(&self) -> serde_json::Value {
        let identity = self.metadata.identity_field().to_lowercase();
        self.payload_where(|field| field.can_create && field.name.to_lowercase() != identity)
    }

    /// Fields sent on update: updatable, non-null, no compound address fields.
    pub fn update_payload(&self) -> serde_json::Value {
        let identity = self.metadata.identity_field().to_lowercase();
        self.payload_where(|field| {
            field.can_update
                && field.field_type != FieldType::Address
                && field.name.to_lowercase() != identity
        })
    }

    fn payload_where<F>(&self, keep: F) -> serde_json::Value
    where
        F: Fn(&FieldDescriptor) -> bool,
    {
        let map = self.as_map();
        fields_to_json(
            map.into_iter()
                .filter(|(name, _)| self.metadata.field(name).map(&keep).unwrap_or(false)),
        )
    }

    fn create(&mut self, conn: &Connection) -> Result<String> {
        let request = HttpRequest::post(self.resource.collection_path(), self.create_payload());
        let response = conn.transport().send(request)?;

        if response.status != HTTP_CREATED {
            return Err(OrmError::create(
                self.resource.name(),
                format!("HTTP {}: {}", response.status, response.body),
            ));
        }

        let id = response
            .header("Location")
            .and_then(id_from_location)
            .ok_or_else(|| OrmError::create(self.resource.name(), "missing Location header"))?;

        tracing::debug!(resource = %self.resource, %id, "record created");
        let identity = self.metadata.identity_field().to_lowercase();
        self.attributes.insert(identity, Value::Reference(id.clone()));
        Ok(id)
    }

    fn update(&mut self, conn: &Connection, id: String) -> Result<String> {
        let request = HttpRequest::patch(self.resource.item_path(&id), self.update_payload());
        let response = conn.transport().send(request)?;

        if response.status != HTTP_NO_CONTENT {
            return Err(OrmError::Update {
                resource: self.resource.name().to_string(),
                id,
                status: response.status,
            });
        }

        tracing::debug!(resource = %self.resource, %id, "record updated");
        Ok(id)
    }

    /// Remove the record remotely. The record must not be saved again afterwards.
    pub fn delete(&self, conn: &Connection) -> Result<()> {
        let delete_error = |id: &str, message: String| OrmError::Delete {
            resource: self.resource.name().to_string(),
            id: id.to_string(),
            message,
        };

        let id = self
            .id()
            .ok_or_else(|| delete_error("", "record has no id".to_string()))?;

        let response = conn
            .transport()
            .send(HttpRequest::delete(self.resource.item_path(id)))
            .map_err(|e| delete_error(id, e.to_string()))?;

        if response.status != HTTP_NO_CONTENT {
            return Err(delete_error(id, format!("HTTP {}", response.status)));
        }

        tracing::debug!(resource = %self.resource, id, "record deleted");
        Ok(())
    }
}

fn fields_to_json<I>(fields: I) -> serde_json::Value
where
    I: IntoIterator<Item = (String, Value)>,
{
    serde_json::Value::Object(
        fields
            .into_iter()
            .map(|(name, value)| (name, value.to_json()))
            .collect(),
    )
}

/// Trailing path segment of a `Location` header.
pub fn id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_remote_time(json: &serde_json::Value) -> Option<DateTime<Utc>> {
    json.as_str().and_then(parse_datetime)
}

/// Typed value for `raw` according to the field's declared type.
fn coerce(field: &FieldDescriptor, raw: &serde_json::Value) -> Value {
    if raw.is_null() {
        return Value::Null;
    }

    let typed = match field.field_type {
        FieldType::Date => raw
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            .map(Value::Date),
        FieldType::DateTime => raw.as_str().and_then(parse_datetime).map(Value::DateTime),
        FieldType::Identity | FieldType::Reference => {
            raw.as_str().map(|s| Value::Reference(s.to_string()))
        }
        FieldType::Integer => raw.as_i64().map(Value::Int),
        FieldType::Double | FieldType::Currency => raw.as_f64().map(Value::Float),
        FieldType::Boolean => raw.as_bool().map(Value::Bool),
        _ => None,
    };

    typed.unwrap_or_else(|| Value::from_json(raw))
}
