//! Metadata-driven record model and the query/search builders.
//!
//! Field sets, types and mutability rules are discovered at runtime from the
//! remote describe endpoint rather than known at compile time:
//! - Field descriptors and per-type metadata
//! - Records validated against that metadata, with create/update/delete
//! - Chainable query builder (`SELECT ... WHERE ...`)
//! - Chainable free-text search builder (`FIND {...} IN ...`)
//!
//! # Example Usage
//!
//! ```ignore
//! let contact = ResourceType::resolve("Contact");
//! let mut record = Record::build(&conn, &contact)?;
//! record.set("LastName", "Smith")?.set("Email", "smith@example.com")?;
//! let id = record.save(&conn)?;
//!
//! let rows = conn.query().select("Id").from("Contact").where_clause("Id", id).execute()?;
//! ```

pub(crate) mod clause;
pub mod escape;
pub mod field;
pub mod metadata;
pub mod query;
pub mod record;
pub mod registry;
pub mod resource;
pub mod search;

pub use field::{FieldDescriptor, FieldFacets, FieldType, PicklistEntry};
pub use metadata::Metadata;
pub use query::{Join, Query, QueryResult};
pub use record::Record;
pub use registry::MetadataRegistry;
pub use resource::ResourceType;
pub use search::{Search, SearchJoin, SearchResult, SearchScope};
