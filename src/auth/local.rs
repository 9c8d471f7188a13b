//! File-backed identity provider for the `local` environment
//!
//! Users are a JSON object mapping usernames to Argon2id PHC hashes:
//!
//! ```json
//! { "dev-user": "$argon2id$v=19$m=19456,t=2,p=1$..." }
//! ```
//!
//! A successful login issues fresh random opaque tokens.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::password::verify_password;
use super::{IdentityProvider, SessionTokens, AUTH_FLOW_USER_SRP};
use crate::credentials::SecretString;
use crate::types::{ClientError, Result};

#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    users: HashMap<String, String>,
}

impl LocalIdentityProvider {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    /// Load the username → hash mapping from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let users = serde_json::from_str(&raw).map_err(|e| {
            ClientError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })?;
        Ok(Self::new(users))
    }
}

fn opaque_token() -> SecretString {
    SecretString::new(uuid::Uuid::new_v4().simple().to_string())
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn login(
        &self,
        flow: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionTokens> {
        if flow != AUTH_FLOW_USER_SRP {
            return Err(ClientError::Authentication(format!("unsupported flow {flow}")));
        }

        let hash = self
            .users
            .get(username)
            .ok_or_else(|| ClientError::Authentication("unknown user or bad password".into()))?;

        if !verify_password(password, hash)? {
            return Err(ClientError::Authentication("unknown user or bad password".into()));
        }

        debug!(username = %username, "Local login accepted");

        Ok(SessionTokens {
            access_token: opaque_token(),
            id_token: opaque_token(),
            refresh_token: opaque_token(),
        })
    }
}
