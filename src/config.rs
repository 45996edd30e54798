//! Connection settings read from the environment and `.env` files.

use std::path::Path;

use crate::auth::{PasswordAuth, DEFAULT_LOGIN_URL};
use crate::connection::ApiVersion;
use crate::error::{OrmError, Result};

pub const ENV_CLIENT_ID: &str = "SALESFORCE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SALESFORCE_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "SALESFORCE_USERNAME";
pub const ENV_PASSWORD: &str = "SALESFORCE_PASSWORD";
pub const ENV_TOKEN: &str = "SALESFORCE_TOKEN";
pub const ENV_LOGIN_URL: &str = "SALESFORCE_LOGIN_URL";
pub const ENV_API_VERSION: &str = "SALESFORCE_API_VERSION";

/// Everything needed to open a password-grant connection.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub security_token: String,
    pub login_url: String,
    pub api_version: ApiVersion,
}

impl Config {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| OrmError::Config(format!("{} is not set", key)))
        };

        let api_version = match lookup(ENV_API_VERSION) {
            Some(v) if !v.is_empty() => v.parse()?,
            _ => ApiVersion::default(),
        };

        Ok(Self {
            client_id: required(ENV_CLIENT_ID)?,
            client_secret: required(ENV_CLIENT_SECRET)?,
            username: required(ENV_USERNAME)?,
            password: required(ENV_PASSWORD)?,
            security_token: required(ENV_TOKEN)?,
            login_url: lookup(ENV_LOGIN_URL)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            api_version,
        })
    }

    pub fn authenticator(&self) -> PasswordAuth {
        PasswordAuth::new(
            &self.client_id,
            &self.client_secret,
            &self.username,
            &self.password,
            &self.security_token,
        )
        .with_login_url(&self.login_url)
    }
}

/// Parse `KEY=VALUE` lines of a `.env` file.
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        let value = value.trim().trim_matches('"').trim_matches('\'');
        pairs.push((key.to_string(), value.to_string()));
    }

    pairs
}

/// Load a `.env` file from `folder` into the process environment.
///
/// Missing files are ignored. Returns the number of variables set.
pub fn load_env_file(folder: &Path, filename: &str, override_existing: bool) -> usize {
    let env_file = folder.join(filename);
    let Ok(content) = std::fs::read_to_string(&env_file) else {
        return 0;
    };

    let mut loaded = 0;
    for (key, value) in parse_env_file(&content) {
        if override_existing || std::env::var(&key).is_err() {
            // Only called from the binary before any worker threads exist.
            unsafe { std::env::set_var(&key, &value) };
            loaded += 1;
        }
    }

    tracing::debug!(path = %env_file.display(), loaded, "loaded env file");
    loaded
}
