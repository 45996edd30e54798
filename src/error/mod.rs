//! Error types for every layer of the mapper.

use thiserror::Error;

/// Errors raised by metadata parsing, records, builders and the transport.
#[derive(Debug, Error)]
pub enum OrmError {
    #[error("Unable to decode metadata: {0}")]
    Schema(String),

    #[error("Unknown attribute: {0}")]
    UnknownField(String),

    #[error("No {resource} found with id '{id}'")]
    NotFound { resource: String, id: String },

    #[error("Incomplete query: {0}")]
    IncompleteQuery(String),

    #[error("Incomplete search: {0}")]
    IncompleteSearch(String),

    #[error("Search group must be one of: ALL, NAME, EMAIL, PHONE, SIDEBAR (got '{0}')")]
    InvalidSearchScope(String),

    #[error("Invalid join '{0}'")]
    InvalidJoin(String),

    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("Could not load query results: {0}")]
    QueryExecution(String),

    #[error("Could not load search results: {0}")]
    SearchExecution(String),

    #[error("Unable to create {resource}: {message}")]
    Create { resource: String, message: String },

    #[error("Unable to update {resource} '{id}': HTTP {status}")]
    Update {
        resource: String,
        id: String,
        status: u16,
    },

    #[error("Unable to delete {resource} '{id}': {message}")]
    Delete {
        resource: String,
        id: String,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl OrmError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField(name.into())
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn create(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Create {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::Http(message.into())
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// True for errors caused by builder misuse rather than the remote side.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownField(_)
                | Self::IncompleteQuery(_)
                | Self::IncompleteSearch(_)
                | Self::InvalidSearchScope(_)
                | Self::InvalidJoin(_)
                | Self::InvalidPredicate(_)
        )
    }
}

impl From<reqwest::Error> for OrmError {
    fn from(e: reqwest::Error) -> Self {
        OrmError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrmError>;
