//! Chainable builder for `SELECT ... FROM ... WHERE ... limit n` queries.
//!
//! ```ignore
//! let result = conn
//!     .query()
//!     .select_all(["Id", "Name"])
//!     .from("Contact")
//!     .where_like("Email", "%@test.com")
//!     .limit(10)
//!     .execute()?;
//! ```

use std::fmt;
use std::str::FromStr;

use crate::cache::{content_hash, CacheEntry};
use crate::connection::Connection;
use crate::error::{OrmError, Result};
use crate::http::HttpRequest;
use crate::value::Value;

use super::clause::{Expression, SelectList};
use super::escape::escape;
use super::metadata::Metadata;
use super::record::Record;
use super::registry::MetadataRegistry;
use super::resource::ResourceType;

/// Endpoint of the query resource.
pub const QUERY_PATH: &str = "query/";

/// How a predicate attaches to the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Join {
    #[default]
    And,
    Or,
}

impl Join {
    pub fn token(&self) -> &'static str {
        match self {
            Join::And => " AND ",
            Join::Or => " OR ",
        }
    }
}

impl FromStr for Join {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "and" => Ok(Join::And),
            "or" => Ok(Join::Or),
            _ => Err(OrmError::InvalidJoin(s.to_string())),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct QueryState {
    select: SelectList,
    from: String,
    filter: Expression,
    limit: Option<u64>,
    error: Option<String>,
}

/// Rendered predicate value: numbers and booleans bare, everything else
/// quoted and escaped.
fn render_value(value: &Value) -> String {
    match value {
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => value.to_string(),
        other => format!("'{}'", escape(&other.to_string())),
    }
}

fn compile(state: &QueryState, registry: &MetadataRegistry) -> Result<String> {
    if let Some(error) = &state.error {
        return Err(OrmError::InvalidPredicate(error.clone()));
    }

    if state.from.is_empty() {
        return Err(OrmError::IncompleteQuery(
            "Nothing specified for From in query".to_string(),
        ));
    }

    let select = if state.select.is_empty() {
        let metadata = registry.cached(&state.from).ok_or_else(|| {
            OrmError::IncompleteQuery(format!(
                "No fields selected and metadata for {} is not loaded",
                state.from
            ))
        })?;
        all_fields(&metadata)
    } else {
        state.select.as_str().to_string()
    };

    let mut query = format!("SELECT {} FROM {}", select, escape(&state.from));

    if !state.filter.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(state.filter.as_str());
    }

    if let Some(limit) = state.limit.filter(|l| *l > 0) {
        query.push_str(&format!(" limit {}", limit));
    }

    Ok(query)
}

fn all_fields(metadata: &Metadata) -> String {
    let mut select = SelectList::default();
    for field in metadata.fields() {
        select.push(&field.name);
    }
    select.as_str().to_string()
}

/// Query builder bound to a connection. Reusable: state is cleared after
/// every `execute`.
pub struct Query<'c> {
    conn: &'c Connection,
    state: QueryState,
}

impl<'c> Query<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            state: QueryState::default(),
        }
    }

    /// Add a column. `*` clears the list, selecting every schema field.
    pub fn select(&mut self, field: &str) -> &mut Self {
        self.state.select.push(field);
        self
    }

    pub fn select_all<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            self.state.select.push(field.as_ref());
        }
        self
    }

    pub fn from(&mut self, resource: &str) -> &mut Self {
        self.state.from = resource.to_string();
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.state.limit = Some(limit);
        self
    }

    /// `key = value`, joined with AND.
    pub fn where_clause(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.where_with(key, value, "=", Join::And)
    }

    /// `key <operator> value`, joined with AND.
    pub fn where_op(&mut self, key: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
        self.where_with(key, value, operator, Join::And)
    }

    pub fn or_where(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.where_with(key, value, "=", Join::Or)
    }

    pub fn or_where_op(&mut self, key: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
        self.where_with(key, value, operator, Join::Or)
    }

    pub fn where_like(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.where_with(key, value, "like", Join::And)
    }

    pub fn or_where_like(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.where_with(key, value, "like", Join::Or)
    }

    pub fn where_not_like(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.where_with(key, value, "notlike", Join::And)
    }

    pub fn or_where_not_like(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.where_with(key, value, "notlike", Join::Or)
    }

    /// Append one predicate.
    ///
    /// Operators containing "like" render as `LIKE`; if they also contain
    /// "not" the predicate becomes `(NOT key LIKE 'value')`. A null value is
    /// recorded as an error and reported when the query is compiled.
    pub fn where_with(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        operator: &str,
        join: Join,
    ) -> &mut Self {
        let value = value.into();
        if value.is_null() {
            self.state
                .error
                .get_or_insert_with(|| format!("No value specified for where('{}')", key));
            return self;
        }

        let lowered = operator.to_lowercase();
        let is_like = lowered.contains("like");
        let negated = is_like && lowered.contains("not");
        let operator = if is_like { "LIKE" } else { operator.trim() };

        let predicate = format!("{} {} {}", escape(key), operator, render_value(&value));

        let filter = &mut self.state.filter;
        filter.join(join.token());
        if negated {
            filter.push_str(&format!("(NOT {})", predicate));
        } else {
            filter.push_str(&predicate);
        }
        self
    }

    /// One equality predicate per pair, all joined with AND.
    pub fn where_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.where_map_with(pairs, "=", Join::And)
    }

    pub fn where_map_with<I, K, V>(&mut self, pairs: I, operator: &str, join: Join) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in pairs {
            self.where_with(key.as_ref(), value, operator, join);
        }
        self
    }

    /// Parenthesized sub-expression joined with AND.
    pub fn where_group<F>(&mut self, group: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.group(Join::And, group)
    }

    pub fn or_where_group<F>(&mut self, group: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.group(Join::Or, group)
    }

    fn group<F>(&mut self, join: Join, group: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let mark = self.state.filter.begin_group(join.token());
        group(self);
        self.state.filter.end_group(mark);
        self
    }

    /// Discard all accumulated state.
    pub fn reset(&mut self) -> &mut Self {
        self.state = QueryState::default();
        self
    }

    /// Query text for the current state.
    ///
    /// With no explicit columns every field of the target type is selected,
    /// which requires its metadata to be loaded on the connection already.
    pub fn compiled(&self) -> Result<String> {
        compile(&self.state, self.conn.registry())
    }

    /// Run the query. The builder is left empty whether or not it succeeds.
    pub fn execute(&mut self) -> Result<QueryResult> {
        let state = std::mem::take(&mut self.state);

        if state.select.is_empty() && !state.from.is_empty() && state.error.is_none() {
            self.conn.metadata(&ResourceType::resolve(&state.from))?;
        }

        let query = compile(&state, self.conn.registry())?;
        tracing::debug!(%query, "executing query");

        let kind = format!("Query{}", state.from);
        let key = content_hash(&query);
        if let Some(cached) = self.conn.cache_lookup(&kind, &key) {
            return QueryResult::from_json(&state.from, &cached);
        }

        let path = format!("{}?q={}", QUERY_PATH, urlencoding::encode(&query));
        let response = self.conn.transport().send(HttpRequest::get(path))?;
        if !response.is_success() {
            return Err(OrmError::QueryExecution(format!(
                "HTTP {}: {}",
                response.status, response.body
            )));
        }

        let body = response
            .json()
            .map_err(|e| OrmError::QueryExecution(e.to_string()))?
            .ok_or_else(|| OrmError::QueryExecution("empty response".to_string()))?;

        let result = QueryResult::from_json(&state.from, &body)?;
        if result.total_size > 0 {
            self.conn.cache_store(&kind, &key, CacheEntry::new(body));
        }
        Ok(result)
    }
}

/// Rows returned by one query execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub resource: String,
    pub total_size: u64,
    pub done: bool,
    pub next_records_url: Option<String>,
    pub records: Vec<serde_json::Value>,
}

impl QueryResult {
    pub fn from_json(resource: &str, body: &serde_json::Value) -> Result<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| OrmError::QueryExecution("response is not an object".to_string()))?;

        Ok(Self {
            resource: resource.to_string(),
            total_size: object.get("totalSize").and_then(|v| v.as_u64()).unwrap_or(0),
            done: object.get("done").and_then(|v| v.as_bool()).unwrap_or(true),
            next_records_url: object
                .get("nextRecordsUrl")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            records: object
                .get("records")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default(),
        })
    }

    pub fn count(&self) -> u64 {
        self.total_size
    }

    pub fn records(&self) -> &[serde_json::Value] {
        &self.records
    }

    /// Hydrate every row as a record of the queried type.
    pub fn into_records(self, conn: &Connection) -> Result<Vec<Record>> {
        let resource = ResourceType::resolve(&self.resource);
        let metadata = conn.metadata(&resource)?;
        self.records
            .iter()
            .map(|row| Record::hydrate(resource.clone(), metadata.clone(), row))
            .collect()
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} {} records",
            self.records.len(),
            self.total_size,
            self.resource
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;
    use crate::model::metadata::tests::contact_describe;
    use std::sync::Arc;

    fn conn() -> Connection {
        Connection::with_transport(Arc::new(MockTransport::new()))
    }

    #[test]
    fn test_end_to_end_compile() {
        let conn = conn();
        let mut q = conn.query();
        q.select_all(["Id", "Name"])
            .from("Contact")
            .where_op("Email", "LIKE", "%@test.com")
            .limit(10);
        assert_eq!(
            q.compiled().unwrap(),
            "SELECT Id, Name FROM Contact WHERE Email LIKE '%@test.com' limit 10"
        );
    }

    #[test]
    fn test_select_star_resets_previous_columns() {
        let conn = conn();
        let mut q = conn.query();
        q.select_all(["Id", "Phone"]).select("*").select("Name").from("Contact");
        assert_eq!(q.compiled().unwrap(), "SELECT Name FROM Contact");
    }

    #[test]
    fn test_and_or_joins() {
        let conn = conn();
        let mut q = conn.query();
        q.select("Id")
            .from("Contact")
            .where_op("Age", ">", 5)
            .where_op("Age", ">", 5);
        assert!(q.compiled().unwrap().ends_with("WHERE Age > 5 AND Age > 5"));

        q.reset();
        q.select("Id")
            .from("Contact")
            .where_op("Age", ">", 5)
            .or_where_op("Age", ">", 5);
        assert!(q.compiled().unwrap().ends_with("WHERE Age > 5 OR Age > 5"));
    }

    #[test]
    fn test_group_has_no_leading_join() {
        let conn = conn();
        let mut q = conn.query();
        q.select("Id").from("Lead").where_group(|g| {
            g.where_clause("Status", "Open").or_where("Status", "New");
        });
        assert_eq!(
            q.compiled().unwrap(),
            "SELECT Id FROM Lead WHERE (Status = 'Open' OR Status = 'New')"
        );

        q.where_clause("IsConverted", false).or_where_group(|g| {
            g.where_op("Rating", "!=", "Cold");
        });
        assert_eq!(
            q.compiled().unwrap(),
            "SELECT Id FROM Lead WHERE (Status = 'Open' OR Status = 'New') \
             AND IsConverted = false OR (Rating != 'Cold')"
        );
    }

    #[test]
    fn test_not_like_wraps_predicate() {
        let conn = conn();
        let mut q = conn.query();
        q.select("Id")
            .from("Contact")
            .where_not_like("Email", "%spam%")
            .or_where_like("Name", "Jo%");
        assert_eq!(
            q.compiled().unwrap(),
            "SELECT Id FROM Contact WHERE (NOT Email LIKE '%spam%') OR Name LIKE 'Jo%'"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        let conn = conn();
        let mut q = conn.query();
        q.select("Id").from("Contact").where_clause("LastName", "O'Brien");
        assert_eq!(
            q.compiled().unwrap(),
            "SELECT Id FROM Contact WHERE LastName = 'O\\'Brien'"
        );
    }

    #[test]
    fn test_where_map() {
        let conn = conn();
        let mut q = conn.query();
        q.select("Id")
            .from("Account")
            .where_map([("Name", Value::from("Acme")), ("NumberOfEmployees", Value::from(10))]);
        assert_eq!(
            q.compiled().unwrap(),
            "SELECT Id FROM Account WHERE Name = 'Acme' AND NumberOfEmployees = 10"
        );
    }

    #[test]
    fn test_missing_from_fails() {
        let conn = conn();
        let mut q = conn.query();
        q.select("Id");
        assert!(matches!(q.compiled(), Err(OrmError::IncompleteQuery(_))));
    }

    #[test]
    fn test_null_value_fails_on_compile() {
        let conn = conn();
        let mut q = conn.query();
        q.select("Id").from("Contact").where_clause("Email", Value::Null);
        assert!(matches!(q.compiled(), Err(OrmError::InvalidPredicate(_))));
    }

    #[test]
    fn test_default_select_uses_loaded_metadata() {
        let conn = conn();
        let contact = ResourceType::resolve("Contact");
        conn.registry()
            .insert(&contact, Metadata::parse(contact_describe()).unwrap())
            .unwrap();

        let mut q = conn.query();
        q.from("Contact").limit(1);
        let compiled = q.compiled().unwrap();
        assert!(compiled.starts_with("SELECT Id, LastName, Email, Birthdate"));
        assert!(compiled.ends_with("Description FROM Contact limit 1"));
    }

    #[test]
    fn test_default_select_without_metadata_fails() {
        let conn = conn();
        let mut q = conn.query();
        q.from("Opportunity");
        assert!(matches!(q.compiled(), Err(OrmError::IncompleteQuery(_))));
    }

    #[test]
    fn test_join_from_str() {
        assert_eq!("OR".parse::<Join>().unwrap(), Join::Or);
        assert!("xor".parse::<Join>().is_err());
    }
}
