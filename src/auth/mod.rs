//! Authentication strategies.

use std::sync::Mutex;

use serde::Deserialize;

use crate::error::{OrmError, Result};
use crate::http::shared_client;

/// Default OAuth token endpoint for the password grant.
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com/services/oauth2/token";

const GRANT_TYPE: &str = "password";

/// Supplies the bearer token and instance URL for a session.
pub trait Authenticator: Send + Sync {
    fn access_token(&self) -> Result<String>;
    fn instance_url(&self) -> Result<String>;
}

/// Token response of the OAuth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub instance_url: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub issued_at: Option<String>,
}

/// OAuth resource-owner password credentials grant.
///
/// Logs in on first use and reuses the session afterwards.
pub struct PasswordAuth {
    login_url: String,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
    security_token: String,
    session: Mutex<Option<Session>>,
}

impl PasswordAuth {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        username: &str,
        password: &str,
        security_token: &str,
    ) -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            security_token: security_token.to_string(),
            session: Mutex::new(None),
        }
    }

    pub fn with_login_url(mut self, login_url: &str) -> Self {
        self.login_url = login_url.to_string();
        self
    }

    /// Form parameters posted to the token endpoint.
    pub(crate) fn form_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("grant_type", GRANT_TYPE.to_string()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
            ("username", self.username.clone()),
            (
                "password",
                format!("{}{}", self.password, self.security_token),
            ),
        ]
    }

    fn login(&self) -> Result<Session> {
        let mut guard = self
            .session
            .lock()
            .map_err(|e| OrmError::Auth(format!("Session lock poisoned: {}", e)))?;

        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        tracing::info!(username = %self.username, url = %self.login_url, "logging in");

        let response = shared_client()?
            .post(&self.login_url)
            .form(&self.form_params())
            .send()
            .map_err(|e| OrmError::Auth(format!("Unable to reach login endpoint: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| OrmError::Auth(format!("Failed to read login response: {}", e)))?;

        if !status.is_success() {
            return Err(OrmError::Auth(format!("HTTP {}: {}", status, text)));
        }

        let session: Session = serde_json::from_str(&text)
            .map_err(|e| OrmError::Auth(format!("Unable to decode login response: {}", e)))?;

        *guard = Some(session.clone());
        Ok(session)
    }
}

impl Authenticator for PasswordAuth {
    fn access_token(&self) -> Result<String> {
        Ok(self.login()?.access_token)
    }

    fn instance_url(&self) -> Result<String> {
        Ok(self.login()?.instance_url)
    }
}

/// An already-issued token.
#[derive(Debug, Clone)]
pub struct StaticToken {
    access_token: String,
    instance_url: String,
}

impl StaticToken {
    pub fn new(access_token: &str, instance_url: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            instance_url: instance_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Authenticator for StaticToken {
    fn access_token(&self) -> Result<String> {
        Ok(self.access_token.clone())
    }

    fn instance_url(&self) -> Result<String> {
        Ok(self.instance_url.clone())
    }
}
