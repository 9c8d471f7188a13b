//! Session authentication
//!
//! Exchanges username and password for short-lived identity tokens through
//! an external identity provider. The provider protocol itself (SRP
//! exchange, federation, refresh) lives behind [`IdentityProvider`].

pub mod local;
pub mod password;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::credentials::SecretString;
use crate::types::{ClientError, Result};

pub use local::LocalIdentityProvider;

/// Secure remote password flow; the password never crosses the wire
pub const AUTH_FLOW_USER_SRP: &str = "USER_SRP_AUTH";

/// Tokens issued for one session. No refresh is performed.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: SecretString,
    /// Presented to the parameter store
    pub id_token: SecretString,
    pub refresh_token: SecretString,
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Log in with `flow`. Rejections are reported as
    /// [`ClientError::Authentication`].
    async fn login(&self, flow: &str, username: &str, password: &SecretString)
        -> Result<SessionTokens>;
}

/// Log in once and redact the password buffer, whatever the outcome.
///
/// No retry happens here; callers that want one must call again with a
/// fresh password.
pub async fn authenticate(
    provider: &dyn IdentityProvider,
    username: &str,
    password: &mut SecretString,
) -> Result<SessionTokens> {
    let result = provider.login(AUTH_FLOW_USER_SRP, username, password).await;
    password.redact();

    match result {
        Ok(tokens) => {
            info!(username = %username, "Authenticated");
            Ok(tokens)
        }
        Err(ClientError::Authentication(reason)) => {
            warn!(username = %username, "Authentication rejected");
            Err(ClientError::Authentication(reason))
        }
        Err(other) => {
            warn!(username = %username, "Identity provider failed");
            Err(ClientError::Authentication(format!("login: {other}")))
        }
    }
}
