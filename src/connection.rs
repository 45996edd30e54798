//! Authenticated session shared by records and builders.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::auth::Authenticator;
use crate::cache::{CacheEntry, ResponseCache};
use crate::error::{OrmError, Result};
use crate::http::{ReqwestTransport, Transport};
use crate::model::metadata::Metadata;
use crate::model::query::Query;
use crate::model::registry::MetadataRegistry;
use crate::model::resource::ResourceType;
use crate::model::search::Search;

/// REST API version segment of the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApiVersion {
    V35,
    V36,
    #[default]
    V37,
    Custom(String),
}

impl ApiVersion {
    pub fn as_str(&self) -> &str {
        match self {
            ApiVersion::V35 => "v35.0",
            ApiVersion::V36 => "v36.0",
            ApiVersion::V37 => "v37.0",
            ApiVersion::Custom(s) => s,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let normalized = if s.starts_with('v') {
            s.to_string()
        } else {
            format!("v{}", s)
        };

        let numeric = normalized[1..]
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if !numeric || normalized.len() < 2 {
            return Err(OrmError::Config(format!("Invalid API version '{}'", s)));
        }

        Ok(match normalized.as_str() {
            "v35.0" => ApiVersion::V35,
            "v36.0" => ApiVersion::V36,
            "v37.0" => ApiVersion::V37,
            _ => ApiVersion::Custom(normalized),
        })
    }
}

/// Root of the REST API for an instance and version.
pub fn base_url(instance_url: &str, version: &ApiVersion) -> String {
    format!(
        "{}/services/data/{}/",
        instance_url.trim_end_matches('/'),
        version
    )
}

/// One authenticated session: transport, metadata registry and optional cache.
pub struct Connection {
    transport: Arc<dyn Transport>,
    registry: MetadataRegistry,
    cache: Option<Arc<dyn ResponseCache>>,
    version: ApiVersion,
}

impl Connection {
    /// Authenticate and build a `reqwest` transport against the instance.
    pub fn open(auth: &dyn Authenticator, version: ApiVersion) -> Result<Self> {
        let instance_url = auth.instance_url()?;
        let token = auth.access_token()?;
        let url = base_url(&instance_url, &version);
        tracing::info!(%url, "connection established");

        let transport = ReqwestTransport::new(&url, &token)?;
        Ok(Self {
            transport: Arc::new(transport),
            registry: MetadataRegistry::new(),
            cache: None,
            version,
        })
    }

    /// Use an already-configured transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            registry: MetadataRegistry::new(),
            cache: None,
            version: ApiVersion::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn version(&self) -> &ApiVersion {
        &self.version
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&dyn ResponseCache> {
        self.cache.as_deref()
    }

    /// Metadata for `resource`, loading it on first use.
    pub fn metadata(&self, resource: &ResourceType) -> Result<Arc<Metadata>> {
        self.registry.get_or_load(self.transport(), resource)
    }

    /// Start a query against this connection.
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    /// Start a free-text search against this connection.
    pub fn search(&self) -> Search<'_> {
        Search::new(self)
    }

    /// Cached body for (kind, key). Cache failures are logged and treated as misses.
    pub(crate) fn cache_lookup(&self, kind: &str, key: &str) -> Option<serde_json::Value> {
        let cache = self.cache.as_ref()?;
        match cache.get(kind, key) {
            Ok(entry) => {
                if entry.is_some() {
                    tracing::debug!(kind, key, "cache hit");
                }
                entry.map(|e| e.data)
            }
            Err(e) => {
                tracing::warn!(kind, key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    pub(crate) fn cache_store(&self, kind: &str, key: &str, entry: CacheEntry) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(kind, key, entry) {
                tracing::warn!(kind, key, error = %e, "cache store failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_parse() {
        assert_eq!("v37.0".parse::<ApiVersion>().unwrap(), ApiVersion::V37);
        assert_eq!("36.0".parse::<ApiVersion>().unwrap(), ApiVersion::V36);
        assert_eq!(
            "v58.0".parse::<ApiVersion>().unwrap(),
            ApiVersion::Custom("v58.0".into())
        );
        assert!("latest".parse::<ApiVersion>().is_err());
        assert!("v".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_base_url() {
        assert_eq!(
            base_url("https://na1.example.com/", &ApiVersion::V37),
            "https://na1.example.com/services/data/v37.0/"
        );
    }
}
