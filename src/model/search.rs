//! Chainable builder for `FIND {...} IN <SCOPE> FIELDS RETURNING Type(...)`.

use std::fmt;
use std::str::FromStr;

use crate::cache::{content_hash, CacheEntry};
use crate::connection::Connection;
use crate::error::{OrmError, Result};
use crate::http::HttpRequest;

use super::clause::{Expression, SelectList};
use super::escape::{escape, ucfirst};
use super::record::Record;
use super::resource::ResourceType;

/// Endpoint of the search resource.
pub const SEARCH_PATH: &str = "search/";

/// Field subset a free-text search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    All,
    Name,
    Email,
    Phone,
    Sidebar,
}

impl SearchScope {
    pub const VARIANTS: &'static [SearchScope] = &[
        SearchScope::All,
        SearchScope::Name,
        SearchScope::Email,
        SearchScope::Phone,
        SearchScope::Sidebar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::All => "ALL",
            SearchScope::Name => "NAME",
            SearchScope::Email => "EMAIL",
            SearchScope::Phone => "PHONE",
            SearchScope::Sidebar => "SIDEBAR",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        Self::VARIANTS
            .iter()
            .find(|scope| scope.as_str() == upper)
            .copied()
            .ok_or_else(|| OrmError::InvalidSearchScope(s.to_string()))
    }
}

/// How a search term attaches to the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchJoin {
    #[default]
    And,
    Or,
    AndNot,
}

impl SearchJoin {
    pub fn token(&self) -> &'static str {
        match self {
            SearchJoin::And => " AND ",
            SearchJoin::Or => " OR ",
            SearchJoin::AndNot => " AND NOT ",
        }
    }
}

impl FromStr for SearchJoin {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "and" => Ok(SearchJoin::And),
            "or" => Ok(SearchJoin::Or),
            "andnot" | "and not" => Ok(SearchJoin::AndNot),
            _ => Err(OrmError::InvalidJoin(s.to_string())),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct SearchState {
    select: SelectList,
    /// Type name as given, used to resolve the record type.
    resource: String,
    /// Capitalized and escaped form rendered after RETURNING.
    from: String,
    find: Expression,
    scope: Option<SearchScope>,
    error: Option<String>,
}

impl SearchState {
    fn compile(&self) -> Result<String> {
        if let Some(error) = &self.error {
            return Err(OrmError::InvalidPredicate(error.clone()));
        }
        if self.from.is_empty() {
            return Err(incomplete("Nothing specified for From in search query"));
        }
        if self.select.is_empty() {
            return Err(incomplete("Nothing specified for Select in search query"));
        }
        let scope = self
            .scope
            .ok_or_else(|| incomplete("Nothing specified for Search Group in search query"))?;
        if self.find.is_empty() {
            return Err(incomplete("Nothing specified for Find in search query"));
        }

        Ok(format!(
            "FIND {{{}}} IN {} FIELDS RETURNING {}({})",
            self.find.as_str(),
            scope,
            self.from,
            self.select.as_str()
        ))
    }
}

fn incomplete(message: &str) -> OrmError {
    OrmError::IncompleteSearch(message.to_string())
}

/// Search builder bound to a connection. State is cleared after every
/// `execute`.
pub struct Search<'c> {
    conn: &'c Connection,
    state: SearchState,
}

impl<'c> Search<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            state: SearchState::default(),
        }
    }

    /// Add a returned column. `*` clears the list.
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
        self.state.resource = resource.to_string();
        self.state.from = escape(&ucfirst(resource));
        self
    }

    /// Set the scope from a case-insensitive name.
    pub fn in_scope(&mut self, scope: &str) -> Result<&mut Self> {
        let scope = scope.parse::<SearchScope>()?;
        Ok(self.scope(scope))
    }

    pub fn scope(&mut self, scope: SearchScope) -> &mut Self {
        self.state.scope = Some(scope);
        self
    }

    pub fn find(&mut self, term: &str) -> &mut Self {
        self.find_with(term, SearchJoin::And)
    }

    pub fn or_find(&mut self, term: &str) -> &mut Self {
        self.find_with(term, SearchJoin::Or)
    }

    pub fn not_find(&mut self, term: &str) -> &mut Self {
        self.find_with(term, SearchJoin::AndNot)
    }

    /// Append one term.
    ///
    /// A term wrapped in double quotes is kept as an exact phrase with its
    /// quotes; its content is still escaped.
    pub fn find_with(&mut self, term: &str, join: SearchJoin) -> &mut Self {
        let term = term.trim();
        if term.is_empty() {
            self.state
                .error
                .get_or_insert_with(|| "Empty value for find()".to_string());
            return self;
        }

        let rendered = match term.strip_prefix('"') {
            Some(rest) => match rest.strip_suffix('"') {
                Some(phrase) => format!("\"{}\"", escape(phrase)),
                None => {
                    self.state
                        .error
                        .get_or_insert_with(|| "Mismatched quotes for find() value".to_string());
                    return self;
                }
            },
            None => escape(term),
        };

        self.state.find.join(join.token());
        self.state.find.push_str(&rendered);
        self
    }

    /// One term per item, each attached with `join`.
    pub fn find_all<I, S>(&mut self, terms: I, join: SearchJoin) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in terms {
            self.find_with(term.as_ref(), join);
        }
        self
    }

    /// Parenthesized group of terms joined with AND.
    pub fn find_group<F>(&mut self, group: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.group(SearchJoin::And, group)
    }

    pub fn or_find_group<F>(&mut self, group: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.group(SearchJoin::Or, group)
    }

    fn group<F>(&mut self, join: SearchJoin, group: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let mark = self.state.find.begin_group(join.token());
        group(self);
        self.state.find.end_group(mark);
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.state = SearchState::default();
        self
    }

    pub fn compiled(&self) -> Result<String> {
        self.state.compile()
    }

    /// Run the search. The builder is left empty whether or not it succeeds.
    pub fn execute(&mut self) -> Result<SearchResult> {
        let state = std::mem::take(&mut self.state);
        let search = state.compile()?;
        tracing::debug!(%search, "executing search");

        let kind = format!("Search{}", state.from);
        let key = content_hash(&search);
        if let Some(cached) = self.conn.cache_lookup(&kind, &key) {
            return SearchResult::from_json(&state.resource, &cached);
        }

        let path = format!("{}?q={}", SEARCH_PATH, urlencoding::encode(&search));
        let response = self.conn.transport().send(HttpRequest::get(path))?;
        if !response.is_success() {
            return Err(OrmError::SearchExecution(format!(
                "HTTP {}: {}",
                response.status, response.body
            )));
        }

        let body = response
            .json()
            .map_err(|e| OrmError::SearchExecution(e.to_string()))?
            .ok_or_else(|| OrmError::SearchExecution("Could not load results".to_string()))?;

        let result = SearchResult::from_json(&state.resource, &body)?;
        if result.total_size > 0 {
            self.conn.cache_store(&kind, &key, CacheEntry::new(body));
        }
        Ok(result)
    }
}

/// Rows returned by one search execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub resource: String,
    pub total_size: u64,
    pub records: Vec<serde_json::Value>,
}

impl SearchResult {
    /// Parse a search body. When a `searchRecords` list is present its
    /// length is the count, whatever `totalSize` says.
    pub fn from_json(resource: &str, body: &serde_json::Value) -> Result<Self> {
        let (total_size, records) = match body {
            serde_json::Value::Array(rows) => (rows.len() as u64, rows.clone()),
            serde_json::Value::Object(object) => {
                let reported = object.get("totalSize").and_then(|v| v.as_u64()).unwrap_or(0);
                match object.get("searchRecords").and_then(|v| v.as_array()) {
                    Some(rows) if !rows.is_empty() => (rows.len() as u64, rows.clone()),
                    _ => (reported, Vec::new()),
                }
            }
            _ => {
                return Err(OrmError::SearchExecution(
                    "Could not load results".to_string(),
                ))
            }
        };

        Ok(Self {
            resource: resource.to_string(),
            total_size,
            records,
        })
    }

    pub fn count(&self) -> u64 {
        self.total_size
    }

    pub fn records(&self) -> &[serde_json::Value] {
        &self.records
    }

    pub fn into_records(self, conn: &Connection) -> Result<Vec<Record>> {
        let resource = ResourceType::resolve(&self.resource);
        let metadata = conn.metadata(&resource)?;
        self.records
            .iter()
            .map(|row| Record::hydrate(resource.clone(), metadata.clone(), row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;
    use std::sync::Arc;

    fn conn() -> Connection {
        Connection::with_transport(Arc::new(MockTransport::new()))
    }

    #[test]
    fn test_exact_phrase_search() {
        let conn = conn();
        let mut s = conn.search();
        s.select("Name")
            .from("contact")
            .in_scope("email")
            .unwrap()
            .find("\"john@example.com\"");
        assert_eq!(
            s.compiled().unwrap(),
            "FIND {\"john@example.com\"} IN EMAIL FIELDS RETURNING Contact(Name)"
        );
    }

    #[test]
    fn test_join_tokens() {
        let conn = conn();
        let mut s = conn.search();
        s.select_all(["Id", "Name"])
            .from("Lead")
            .scope(SearchScope::Name)
            .find("acme")
            .or_find("globex")
            .not_find("initech");
        assert_eq!(
            s.compiled().unwrap(),
            "FIND {acme OR globex AND NOT initech} IN NAME FIELDS RETURNING Lead(Id, Name)"
        );
    }

    #[test]
    fn test_groups() {
        let conn = conn();
        let mut s = conn.search();
        s.select("Id")
            .from("Account")
            .scope(SearchScope::All)
            .find("cloud")
            .find_group(|g| {
                g.find("storage").or_find("compute");
            });
        assert_eq!(
            s.compiled().unwrap(),
            "FIND {cloud AND (storage OR compute)} IN ALL FIELDS RETURNING Account(Id)"
        );
    }

    #[test]
    fn test_term_ending_in_paren_keeps_join() {
        let conn = conn();
        let mut s = conn.search();
        s.select("Id")
            .from("Account")
            .scope(SearchScope::All)
            .find("acme(")
            .find("globex");
        assert_eq!(
            s.compiled().unwrap(),
            "FIND {acme( AND globex} IN ALL FIELDS RETURNING Account(Id)"
        );
    }

    #[test]
    fn test_find_all() {
        let conn = conn();
        let mut s = conn.search();
        s.select("Id")
            .from("Contact")
            .scope(SearchScope::Phone)
            .find_all(["555", "556"], SearchJoin::Or);
        assert_eq!(
            s.compiled().unwrap(),
            "FIND {555 OR 556} IN PHONE FIELDS RETURNING Contact(Id)"
        );
    }

    #[test]
    fn test_mismatched_quotes() {
        let conn = conn();
        let mut s = conn.search();
        s.select("Id")
            .from("Contact")
            .scope(SearchScope::All)
            .find("\"open phrase");
        let err = s.compiled().unwrap_err();
        assert!(err.to_string().contains("Mismatched quotes"));
    }

    #[test]
    fn test_missing_components_have_distinct_errors() {
        let conn = conn();
        let mut s = conn.search();
        s.find("x");
        let no_from = s.compiled().unwrap_err().to_string();
        assert!(no_from.contains("From"));

        s.from("Contact");
        let no_select = s.compiled().unwrap_err().to_string();
        assert!(no_select.contains("Select"));

        s.select("Name");
        let no_scope = s.compiled().unwrap_err();
        assert!(matches!(no_scope, OrmError::IncompleteSearch(_)));
        assert!(no_scope.to_string().contains("Search Group"));
        assert_ne!(no_scope.to_string(), no_select);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("sidebar".parse::<SearchScope>().unwrap(), SearchScope::Sidebar);
        assert!(matches!(
            "everything".parse::<SearchScope>(),
            Err(OrmError::InvalidSearchScope(_))
        ));
        assert_eq!("and not".parse::<SearchJoin>().unwrap(), SearchJoin::AndNot);
    }

    #[test]
    fn test_search_records_override_total_size() {
        let body = serde_json::json!({
            "totalSize": 10,
            "searchRecords": [{"Id": "1"}, {"Id": "2"}]
        });
        let result = SearchResult::from_json("Contact", &body).unwrap();
        assert_eq!(result.count(), 2);

        let body = serde_json::json!({"totalSize": 3});
        assert_eq!(SearchResult::from_json("Contact", &body).unwrap().count(), 3);
    }
}
