//! Record type registration and endpoint paths.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use lazy_static::lazy_static;

/// Root of every record endpoint.
pub const SOBJECTS_ROOT: &str = "sobjects";

/// Types registered out of the box.
pub const STANDARD_TYPES: &[&str] = &["Account", "Contact", "Lead", "Opportunity", "Order"];

lazy_static! {
    /// Lower-cased type name to registered type.
    static ref RESOURCE_REGISTRY: RwLock<HashMap<String, ResourceType>> = {
        let mut map = HashMap::new();
        for name in STANDARD_TYPES {
            let resource = ResourceType::unregistered(name);
            map.insert(name.to_lowercase(), resource);
        }
        RwLock::new(map)
    };
}

/// A remote record type with its endpoint path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceType {
    name: String,
    path: String,
}

impl ResourceType {
    fn unregistered(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: format!("{}/{}", SOBJECTS_ROOT, name),
        }
    }

    /// Register a type under the default `sobjects/<Name>` path.
    pub fn new(name: &str) -> Self {
        Self::with_path(name, &format!("{}/{}", SOBJECTS_ROOT, name))
    }

    /// Register a type under an explicit path.
    pub fn with_path(name: &str, path: &str) -> Self {
        let resource = Self {
            name: name.to_string(),
            path: path.trim_end_matches('/').to_string(),
        };
        if let Ok(mut registry) = RESOURCE_REGISTRY.write() {
            registry.insert(name.to_lowercase(), resource.clone());
        }
        resource
    }

    /// Case-insensitive lookup of a registered type.
    pub fn lookup(name: &str) -> Option<Self> {
        RESOURCE_REGISTRY
            .read()
            .ok()
            .and_then(|registry| registry.get(&name.to_lowercase()).cloned())
    }

    /// Registered type for `name`, registering it with the default path when unknown.
    pub fn resolve(name: &str) -> Self {
        Self::lookup(name).unwrap_or_else(|| Self::new(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn collection_path(&self) -> String {
        format!("{}/", self.path)
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, id)
    }

    pub fn describe_path(&self) -> String {
        format!("{}/describe", self.path)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_types_are_registered() {
        let contact = ResourceType::lookup("contact").unwrap();
        assert_eq!(contact.name(), "Contact");
        assert_eq!(contact.path(), "sobjects/Contact");
        assert!(ResourceType::lookup("Order").is_some());
    }

    #[test]
    fn test_endpoint_paths() {
        let lead = ResourceType::lookup("Lead").unwrap();
        assert_eq!(lead.collection_path(), "sobjects/Lead/");
        assert_eq!(lead.item_path("00Q1"), "sobjects/Lead/00Q1");
        assert_eq!(lead.describe_path(), "sobjects/Lead/describe");
    }

    #[test]
    fn test_custom_registration() {
        assert!(ResourceType::lookup("Invoice__c").is_none());
        let invoice = ResourceType::with_path("Invoice__c", "sobjects/Invoice__c/");
        assert_eq!(invoice.path(), "sobjects/Invoice__c");
        assert_eq!(ResourceType::lookup("invoice__c"), Some(invoice));
    }
}
