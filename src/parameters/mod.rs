//! Connection parameter retrieval
//!
//! Bus address, shared token and TLS material live in a remote parameter
//! store, namespaced as `{prefix}/{environment}/{key}`. The prefix selects
//! the downstream product that owns the parameters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::Environment;
use crate::credentials::SecretString;
use crate::nats::transport::TransportConfig;
use crate::types::{ClientError, Result};

/// Parameter namespace of NATS Connect
pub const NC_PARAMETER_PREFIX: &str = "nc";

/// Parameter namespace of AI2C
pub const AI2C_PARAMETER_PREFIX: &str = "ai2c";

/// The six parameters a session needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKey {
    BusToken,
    BusPort,
    BusUrl,
    TlsCert,
    TlsPrivateKey,
    TlsCaBundle,
}

impl ParameterKey {
    pub const ALL: [Self; 6] = [
        Self::BusToken,
        Self::BusPort,
        Self::BusUrl,
        Self::TlsCert,
        Self::TlsPrivateKey,
        Self::TlsCaBundle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BusToken => "nats-token",
            Self::BusPort => "nats-port",
            Self::BusUrl => "nats-url",
            Self::TlsCert => "tls-cert",
            Self::TlsPrivateKey => "tls-private-key",
            Self::TlsCaBundle => "tls-ca-bundle",
        }
    }
}

/// Fully qualified parameter name
pub fn parameter_name(prefix: &str, environment: Environment, key: ParameterKey) -> String {
    format!("{}/{}/{}", prefix, environment, key.as_str())
}

/// One (name, value) pair returned by the store
#[derive(Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Remote key/value store holding connection secrets
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Look up `names` on behalf of the holder of `id_token`.
    ///
    /// Names the store does not know are simply absent from the result.
    async fn get_parameters(&self, id_token: &SecretString, names: &[String])
        -> Result<Vec<Parameter>>;
}

/// Fetch the six transport parameters and bind them by name.
///
/// Missing parameters leave their field at its zero value; the transport
/// provisioner refuses to connect with an incomplete configuration.
pub async fn fetch_transport_parameters(
    store: &dyn ParameterStore,
    id_token: &SecretString,
    environment: Environment,
    prefix: &str,
) -> Result<TransportConfig> {
    let names: HashMap<String, ParameterKey> = ParameterKey::ALL
        .iter()
        .map(|key| (parameter_name(prefix, environment, *key), *key))
        .collect();
    let requested: Vec<String> = names.keys().cloned().collect();

    let parameters = store
        .get_parameters(id_token, &requested)
        .await
        .map_err(|e| match e {
            ClientError::ParameterFetch(_) => e,
            other => ClientError::ParameterFetch(format!(
                "get_parameters({prefix}/{environment}): {other}"
            )),
        })?;

    let mut config = TransportConfig::default();
    for parameter in parameters {
        let Some(key) = names.get(&parameter.name) else {
            debug!(name = %parameter.name, "Ignoring unknown parameter");
            continue;
        };

        match key {
            ParameterKey::BusToken => config.shared_token = SecretString::new(parameter.value),
            ParameterKey::BusPort => match parameter.value.trim().parse::<u16>() {
                Ok(port) => config.bus_port = port,
                Err(_) => warn!(name = %parameter.name, "Bus port is not a valid port number"),
            },
            ParameterKey::BusUrl => config.bus_url = parameter.value,
            ParameterKey::TlsCert => config.tls.cert = parameter.value,
            ParameterKey::TlsPrivateKey => {
                config.tls.private_key = SecretString::new(parameter.value)
            }
            ParameterKey::TlsCaBundle => config.tls.ca_bundle = parameter.value,
        }
    }

    let missing = config.missing_fields();
    if missing.is_empty() {
        debug!(prefix = %prefix, environment = %environment, "Transport parameters fetched");
    } else {
        warn!(prefix = %prefix, environment = %environment, missing = ?missing, "Transport parameters incomplete");
    }

    Ok(config)
}

// =============================================================================
// In-memory store
// =============================================================================

/// Parameter store backed by a map, for local development and tests.
///
/// The id token is not checked.
#[derive(Debug, Default, Clone)]
pub struct MemoryParameterStore {
    values: HashMap<String, String>,
}

impl MemoryParameterStore {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Load a JSON object of fully qualified name → value
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClientError::ParameterFetch(format!("cannot read {}: {}", path.display(), e))
        })?;
        let values = serde_json::from_str(&raw).map_err(|e| {
            ClientError::ParameterFetch(format!("cannot parse {}: {}", path.display(), e))
        })?;
        Ok(Self::new(values))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

#[async_trait]
impl ParameterStore for MemoryParameterStore {
    async fn get_parameters(
        &self,
        _id_token: &SecretString,
        names: &[String],
    ) -> Result<Vec<Parameter>> {
        Ok(names
            .iter()
            .filter_map(|name| {
                self.values.get(name).map(|value| Parameter {
                    name: name.clone(),
                    value: value.clone(),
                })
            })
            .collect())
    }
}
