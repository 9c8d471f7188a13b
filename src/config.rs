//! Configuration for the NATS Connect client
//!
//! The library never reads process-wide state. Callers either build a
//! [`CredentialSource`] themselves or flatten [`ClientArgs`] into their own
//! clap parser and convert it once at startup.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::credentials::{CredentialSource, ExplicitCredentials, SecretString};
use crate::types::{ClientError, Result};

/// Config file key holding the NATS Connect client id
pub const KEY_CLIENT_ID: &str = "client_id";
/// Config file key holding the target environment
pub const KEY_ENVIRONMENT: &str = "environment";
/// Config file key holding the account password
pub const KEY_PASSWORD: &str = "password";
/// Config file key holding the NATS Connect secret key
pub const KEY_SECRET_KEY: &str = "secret_key";
/// Config file key holding the scratch directory for transport artifacts
pub const KEY_TEMP_DIRECTORY: &str = "temp_directory";
/// Config file key holding the account username
pub const KEY_USERNAME: &str = "username";

/// Deployment environment a session targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
    Local,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ClientError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            "local" => Ok(Self::Local),
            _ => Err(ClientError::InvalidEnvironment(value.to_string())),
        }
    }
}

/// Read a configuration file into a key/value mapping.
///
/// The document must be a JSON object. Values are returned untouched; the
/// credential resolver decides how to bind them.
pub fn load_config_map(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ClientError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;

    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(ClientError::Configuration(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
        Err(e) => Err(ClientError::Configuration(format!(
            "cannot parse {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Session arguments for command line tools built on this crate.
///
/// Use `#[command(flatten)]` to embed these in a larger parser. When
/// `--config` is given every other credential flag is ignored.
#[derive(Parser, Clone)]
pub struct ClientArgs {
    /// Configuration file holding all session credentials
    #[arg(short = 'c', long = "config", env = "NC_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// NATS Connect assigned client id
    #[arg(long, env = "NC_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Target environment (production, development or local)
    #[arg(long, env = "NC_ENVIRONMENT", default_value = "production")]
    pub environment: String,

    /// Account password
    #[arg(long, env = "NC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// NATS Connect assigned secret key
    #[arg(long, env = "NC_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Directory the client may write transport artifacts to
    #[arg(long, env = "NC_TEMP_DIRECTORY")]
    pub temp_directory: Option<PathBuf>,

    /// Account username
    #[arg(long, env = "NC_USERNAME")]
    pub username: Option<String>,
}

impl ClientArgs {
    /// Convert the parsed flags into a credential source, consuming them.
    pub fn into_credential_source(self) -> CredentialSource {
        if let Some(path) = self.config_file {
            return CredentialSource::ConfigFile(path);
        }

        CredentialSource::Explicit(ExplicitCredentials {
            client_id: self.client_id.unwrap_or_default(),
            environment: self.environment,
            password: SecretString::new(self.password.unwrap_or_default()),
            secret_key: SecretString::new(self.secret_key.unwrap_or_default()),
            temp_directory: self.temp_directory.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
        })
    }
}

impl fmt::Debug for ClientArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientArgs")
            .field("config_file", &self.config_file)
            .field("client_id", &self.client_id)
            .field("environment", &self.environment)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("temp_directory", &self.temp_directory)
            .field("username", &self.username)
            .finish()
    }
}
