//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use salesforce_orm::{Connection, MockTransport};
use serde_json::{json, Value};

pub fn contact_describe() -> Value {
    json!({
        "name": "Contact",
        "fields": [
            {"name": "Id", "label": "Contact ID", "type": "id", "nillable": false,
             "createable": false, "updateable": false},
            {"name": "LastName", "label": "Last Name", "type": "string", "nillable": false,
             "createable": true, "updateable": true},
            {"name": "Email", "label": "Email", "type": "email", "nillable": true,
             "createable": true, "updateable": true},
            {"name": "Birthdate", "label": "Birthdate", "type": "date", "nillable": true,
             "createable": true, "updateable": true},
            {"name": "MailingAddress", "label": "Mailing Address", "type": "address", "nillable": true,
             "createable": false, "updateable": false},
            {"name": "NumberOfEmployees", "label": "Employees", "type": "int", "nillable": true,
             "createable": true, "updateable": true, "digits": 8},
            {"name": "CreatedDate", "label": "Created Date", "type": "datetime", "nillable": false,
             "createable": false, "updateable": false}
        ]
    })
}

/// A connection over a fresh scripted transport.
pub fn mock_connection() -> (Arc<MockTransport>, Connection) {
    let transport = Arc::new(MockTransport::new());
    let conn = Connection::with_transport(transport.clone());
    (transport, conn)
}
