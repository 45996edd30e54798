mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{contact_describe, mock_connection};
use salesforce_orm::{MemoryCache, OrmError, SearchScope};

#[test]
fn test_compiles_exact_phrase_search() {
    let (_, conn) = mock_connection();
    let mut search = conn.search();
    search
        .select("Name")
        .from("contact")
        .in_scope("email")
        .unwrap()
        .find("\"john@example.com\"");

    assert_eq!(
        search.compiled().unwrap(),
        "FIND {\"john@example.com\"} IN EMAIL FIELDS RETURNING Contact(Name)"
    );
}

#[test]
fn test_invalid_scope_is_rejected() {
    let (_, conn) = mock_connection();
    let mut search = conn.search();
    let err = search.in_scope("everywhere").err().unwrap();
    assert!(matches!(err, OrmError::InvalidSearchScope(_)));
}

#[test]
fn test_missing_scope_differs_from_missing_select() {
    let (_, conn) = mock_connection();
    let mut search = conn.search();
    search.from("Contact").find("ada");
    let no_select = search.compiled().unwrap_err().to_string();

    search.select("Name");
    let no_scope = search.compiled().unwrap_err().to_string();

    assert_ne!(no_select, no_scope);
    assert!(no_scope.contains("Search Group"));
}

#[test]
fn test_search_records_length_wins() {
    let (transport, conn) = mock_connection();
    transport.push_json(
        200,
        json!({
            "totalSize": 40,
            "searchRecords": [
                {"attributes": {"type": "Contact"}, "Id": "003A", "LastName": "Lovelace"},
                {"attributes": {"type": "Contact"}, "Id": "003B", "LastName": "Byron"}
            ]
        }),
    );

    let result = conn
        .search()
        .select_all(["Id", "LastName"])
        .from("Contact")
        .scope(SearchScope::Name)
        .find("lovelace")
        .or_find("byron")
        .execute()
        .unwrap();

    assert_eq!(result.count(), 2);
    let request = transport.last_request().unwrap();
    assert!(request.path.starts_with("search/?q=FIND%20%7Blovelace%20OR%20byron%7D"));
}

#[test]
fn test_execute_resets_and_rejects_empty_builder() {
    let (transport, conn) = mock_connection();
    transport.push_json(200, json!({"searchRecords": []}));

    let mut search = conn.search();
    search
        .select("Id")
        .from("Lead")
        .scope(SearchScope::All)
        .find("acme");
    let result = search.execute().unwrap();
    assert_eq!(result.count(), 0);

    let err = search.execute().unwrap_err();
    assert!(matches!(err, OrmError::IncompleteSearch(_)));
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn test_mismatched_quotes_fail_execute_without_request() {
    let (transport, conn) = mock_connection();
    let err = conn
        .search()
        .select("Id")
        .from("Contact")
        .scope(SearchScope::All)
        .find("\"unterminated")
        .execute()
        .unwrap_err();

    assert!(err.to_string().contains("Mismatched quotes"));
    assert!(transport.requests().is_empty());
}

#[test]
fn test_cached_search_and_hydration() {
    let (transport, conn) = mock_connection();
    let conn = conn.with_cache(Arc::new(MemoryCache::default()));
    transport
        .push_json(
            200,
            json!({"searchRecords": [{"Id": "003A", "LastName": "Lovelace"}]}),
        )
        .push_json(200, contact_describe());

    let run = || {
        conn.search()
            .select_all(["Id", "LastName"])
            .from("Contact")
            .scope(SearchScope::Name)
            .find("lovelace")
            .execute()
            .unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);

    let records = second.into_records(&conn).unwrap();
    assert_eq!(records[0].id(), Some("003A"));
    assert_eq!(transport.requests().len(), 2);
}
