mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::json;

use common::{contact_describe, mock_connection};
use salesforce_orm::{
    CacheEntry, HttpResponse, MemoryCache, OrmError, Record, ResourceType, ResponseCache, Value,
};

fn contact() -> ResourceType {
    ResourceType::resolve("Contact")
}

#[test]
fn test_create_assigns_id_from_location() {
    let (transport, conn) = mock_connection();
    transport.push_json(200, contact_describe()).push(
        HttpResponse::new(201, r#"{"id":"003ABC","success":true}"#)
            .with_header("Location", "/services/data/v37.0/sobjects/Contact/003ABC"),
    );

    let mut record = Record::build(&conn, &contact()).unwrap();
    record
        .set("LastName", "Lovelace")
        .unwrap()
        .set("Email", "ada@example.com")
        .unwrap();
    assert!(!record.is_persisted());

    let id = record.save(&conn).unwrap();
    assert_eq!(id, "003ABC");
    assert_eq!(record.id(), Some("003ABC"));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "sobjects/Contact/");
    assert_eq!(
        request.body.unwrap(),
        json!({"LastName": "Lovelace", "Email": "ada@example.com"})
    );
}

#[test]
fn test_create_without_location_fails() {
    let (transport, conn) = mock_connection();
    transport
        .push_json(200, contact_describe())
        .push(HttpResponse::new(201, "{}"));

    let mut record = Record::build(&conn, &contact()).unwrap();
    record.set("LastName", "Lovelace").unwrap();
    let err = record.save(&conn).unwrap_err();
    assert!(matches!(err, OrmError::Create { .. }));
    assert!(!record.is_persisted());
}

#[test]
fn test_update_patches_updatable_fields() {
    let (transport, conn) = mock_connection();
    transport
        .push_json(200, contact_describe())
        .push_json(
            200,
            json!({
                "attributes": {"type": "Contact"},
                "Id": "003ABC",
                "LastName": "Lovelace",
                "MailingAddress": {"city": "London"},
                "CreatedDate": "2016-05-01T10:00:00.000+0000"
            }),
        )
        .push(HttpResponse::new(204, ""));

    let mut record = Record::find(&conn, &contact(), "003ABC").unwrap();
    record.set("LastName", "King").unwrap();
    let id = record.save(&conn).unwrap();
    assert_eq!(id, "003ABC");

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(request.path, "sobjects/Contact/003ABC");
    assert_eq!(request.body.unwrap(), json!({"LastName": "King"}));
}

#[test]
fn test_rejected_update_is_an_error() {
    let (transport, conn) = mock_connection();
    transport
        .push_json(200, contact_describe())
        .push_json(400, json!([{"errorCode": "INVALID_FIELD"}]));

    let metadata = conn.metadata(&contact()).unwrap();
    let mut record = Record::from_values(
        contact(),
        metadata,
        [("Id", Value::Reference("003ABC".into())), ("LastName", "King".into())],
    )
    .unwrap();

    let err = record.save(&conn).unwrap_err();
    assert!(matches!(err, OrmError::Update { status: 400, .. }));
}

#[test]
fn test_delete() {
    let (transport, conn) = mock_connection();
    transport
        .push_json(200, contact_describe())
        .push(HttpResponse::new(204, ""))
        .push_error("connection reset");

    let metadata = conn.metadata(&contact()).unwrap();
    let record = Record::from_values(
        contact(),
        metadata,
        [("Id", Value::Reference("003ABC".into()))],
    )
    .unwrap();

    record.delete(&conn).unwrap();
    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path, "sobjects/Contact/003ABC");

    let err = record.delete(&conn).unwrap_err();
    assert!(matches!(err, OrmError::Delete { .. }));
}

#[test]
fn test_find_missing_record() {
    let (transport, conn) = mock_connection();
    transport
        .push_json(200, contact_describe())
        .push_json(404, json!([{"errorCode": "NOT_FOUND"}]));

    let err = Record::find(&conn, &contact(), "003ZZZ").unwrap_err();
    assert!(matches!(err, OrmError::NotFound { .. }));
}

#[test]
fn test_find_populates_cache() {
    let (transport, conn) = mock_connection();
    let cache = Arc::new(MemoryCache::default());
    let conn = conn.with_cache(cache.clone());
    transport.push_json(200, contact_describe()).push_json(
        200,
        json!({
            "Id": "003ABC",
            "LastName": "Lovelace",
            "CreatedDate": "2016-05-01T10:00:00.000+0000"
        }),
    );

    let first = Record::find(&conn, &contact(), "003ABC").unwrap();
    let second = Record::find(&conn, &contact(), "003ABC").unwrap();
    assert_eq!(first.as_map(), second.as_map());
    assert_eq!(transport.requests().len(), 2);

    let entry: CacheEntry = cache.get("Contact", "003ABC").unwrap().unwrap();
    assert!(entry.remote_created_at.is_some());
    assert!(entry.remote_updated_at.is_none());
}

#[test]
fn test_unknown_field_is_rejected() {
    let (transport, conn) = mock_connection();
    transport.push_json(200, contact_describe());

    let mut record = Record::build(&conn, &contact()).unwrap();
    let err = record.set("FavouriteColour", "blue").unwrap_err();
    assert_eq!(err.to_string(), "Unknown attribute: FavouriteColour");
    assert_eq!(record.get_or("Email", "none"), Value::from("none"));
}

#[test]
fn test_broken_describe_is_schema_error() {
    let (transport, conn) = mock_connection();
    transport.push_json(200, json!({"name": "Contact"}));

    let err = Record::build(&conn, &contact()).unwrap_err();
    assert!(matches!(err, OrmError::Schema(_)));
}
