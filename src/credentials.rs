//! Credential resolution
//!
//! Turns either explicit values or a configuration file into a validated
//! [`ClientIdentity`]. Exactly one source is consulted.
//!
//! # Secret handling
//!
//! Secrets live in [`SecretString`], an owned buffer that is zeroized in
//! place when redacted or dropped. The secret key is consumed by
//! payload-cipher derivation and redacted before resolution returns.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;
use zeroize::Zeroize;

use crate::config::{
    self, Environment, KEY_CLIENT_ID, KEY_ENVIRONMENT, KEY_PASSWORD, KEY_SECRET_KEY,
    KEY_TEMP_DIRECTORY, KEY_USERNAME,
};
use crate::rpc::crypto::ChaChaPayloadCipher;
use crate::types::{ClientError, Result};

/// Sentinel left behind in redacted secret buffers
pub const PROTECTED: &str = "PROTECTED";

// =============================================================================
// Secret buffer
// =============================================================================

/// Owned secret text, zeroized on redaction and on drop.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret. Callers must not copy it into long-lived storage.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wipe the buffer and leave the [`PROTECTED`] sentinel in its place.
    pub fn redact(&mut self) {
        self.0.zeroize();
        self.0.push_str(PROTECTED);
    }

    pub fn is_redacted(&self) -> bool {
        self.0 == PROTECTED
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Credentials passed directly by the caller
#[derive(Debug, Clone, Default)]
pub struct ExplicitCredentials {
    pub client_id: String,
    /// Environment name, validated during resolution
    pub environment: String,
    pub password: SecretString,
    pub secret_key: SecretString,
    pub temp_directory: PathBuf,
    pub username: String,
}

/// Where session credentials come from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    Explicit(ExplicitCredentials),
    /// JSON configuration file; explicit values are never mixed in
    ConfigFile(PathBuf),
}

// =============================================================================
// Resolved identity
// =============================================================================

/// Who the session acts as. Immutable once the session is established.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub client_id: String,
    pub username: String,
    pub environment: Environment,
    /// Redacted once the payload cipher has been derived
    pub secret_key: SecretString,
}

/// Output of credential resolution
#[derive(Debug)]
pub struct ResolvedCredentials {
    pub identity: ClientIdentity,
    /// Consumed (and redacted) by the session authenticator
    pub password: SecretString,
    pub temp_directory: PathBuf,
    /// Payload cipher derived from client id and secret key
    pub cipher: ChaChaPayloadCipher,
}

/// Resolve and validate session credentials.
pub fn resolve_credentials(source: CredentialSource) -> Result<ResolvedCredentials> {
    let mut explicit = match source {
        CredentialSource::Explicit(explicit) => explicit,
        CredentialSource::ConfigFile(path) => {
            debug!(path = %path.display(), "Loading credentials from configuration file");
            let mut map = config::load_config_map(&path)?;
            bind_config_map(&mut map)?
        }
    };

    let environment = validate(&explicit)?;

    let cipher = ChaChaPayloadCipher::derive(&explicit.client_id, explicit.secret_key.expose())?;
    explicit.secret_key.redact();

    debug!(
        client_id = %explicit.client_id,
        environment = %environment,
        "Credentials resolved"
    );

    Ok(ResolvedCredentials {
        identity: ClientIdentity {
            client_id: explicit.client_id,
            username: explicit.username,
            environment,
            secret_key: explicit.secret_key,
        },
        password: explicit.password,
        temp_directory: explicit.temp_directory,
        cipher,
    })
}

/// Bind configuration file keys by name.
///
/// The password and secret key entries in the map are wiped as soon as they
/// have been copied out, so the loaded mapping never holds a second
/// plaintext copy.
fn bind_config_map(
    map: &mut serde_json::Map<String, serde_json::Value>,
) -> Result<ExplicitCredentials> {
    let password = take_secret(map, KEY_PASSWORD)?;
    let secret_key = take_secret(map, KEY_SECRET_KEY)?;

    Ok(ExplicitCredentials {
        client_id: string_value(map, KEY_CLIENT_ID)?,
        environment: string_value(map, KEY_ENVIRONMENT)?,
        password,
        secret_key,
        temp_directory: PathBuf::from(string_value(map, KEY_TEMP_DIRECTORY)?),
        username: string_value(map, KEY_USERNAME)?,
    })
}

fn take_secret(
    map: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<SecretString> {
    let secret = match map.get_mut(key) {
        None | Some(serde_json::Value::Null) => SecretString::default(),
        Some(serde_json::Value::String(value)) => {
            let secret = SecretString::new(value.as_str());
            value.zeroize();
            value.push_str(PROTECTED);
            secret
        }
        Some(_) => return Err(ClientError::Configuration(format!("'{key}' must be a string"))),
    };
    Ok(secret)
}

fn string_value(map: &serde_json::Map<String, serde_json::Value>, key: &str) -> Result<String> {
    match map.get(key) {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ClientError::Configuration(format!("'{key}' must be a string"))),
    }
}

/// Check every required field; the first failure wins.
fn validate(credentials: &ExplicitCredentials) -> Result<Environment> {
    if credentials.client_id.trim().is_empty() {
        return Err(ClientError::MissingArgument(KEY_CLIENT_ID));
    }
    let environment: Environment = credentials.environment.parse()?;
    if credentials.password.is_empty() {
        return Err(ClientError::MissingArgument(KEY_PASSWORD));
    }
    if credentials.secret_key.is_empty() {
        return Err(ClientError::MissingArgument(KEY_SECRET_KEY));
    }
    if credentials.temp_directory.as_os_str().is_empty() {
        return Err(ClientError::MissingArgument(KEY_TEMP_DIRECTORY));
    }
    if credentials.username.trim().is_empty() {
        return Err(ClientError::MissingArgument(KEY_USERNAME));
    }
    Ok(environment)
}
