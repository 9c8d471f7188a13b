//! NATS client wrapper
//!
//! Opens the TLS connection described by a provisioned
//! [`TransportConfig`] and serves request/reply exchanges over it.

use async_nats::{Client, ConnectOptions, HeaderMap};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::transport::{BusConnector, TransportConfig};
use crate::rpc::{BusConnection, RpcHeaders, RPC_TIMEOUT};
use crate::types::{ClientError, Result};

/// Default ping interval for keep-alive
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

/// Initial connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Marker of a NATS user credentials document
const CREDS_JWT_MARKER: &str = "BEGIN NATS USER JWT";

/// Live connection to the NATS bus
#[derive(Clone)]
pub struct NatsConnection {
    client: Client,
    name: String,
}

impl NatsConnection {
    /// Connect using the written credentials and TLS files
    pub async fn connect(instance_name: &str, config: &TransportConfig) -> Result<Self> {
        let (Some(credentials_file), Some(tls_files)) = (&config.credentials_file, &config.tls_files)
        else {
            return Err(ClientError::IncompleteTransportConfig(vec![
                "credentials_file",
                "tls_files",
            ]));
        };

        let address = config.server_address();
        info!(instance_name = %instance_name, server = %address, "Connecting to NATS");

        // Don't use retry_on_initial_connect(); a session should fail fast
        let options = if config.shared_token.expose().contains(CREDS_JWT_MARKER) {
            ConnectOptions::with_credentials_file(credentials_file.clone())
                .await
                .map_err(|e| {
                    ClientError::Connection(format!(
                        "cannot load {}: {}",
                        credentials_file.display(),
                        e
                    ))
                })?
        } else {
            ConnectOptions::with_token(config.shared_token.expose().to_string())
        };

        let client = options
            .name(instance_name)
            .require_tls(true)
            .add_root_certificates(tls_files.ca_bundle.clone())
            .add_client_certificate(tls_files.cert.clone(), tls_files.private_key.clone())
            .ping_interval(DEFAULT_PING_INTERVAL)
            .connection_timeout(DEFAULT_CONNECT_TIMEOUT)
            .request_timeout(Some(RPC_TIMEOUT))
            .connect(address.as_str())
            .await?;

        info!(instance_name = %instance_name, "Connected to NATS");

        Ok(Self {
            client,
            name: instance_name.to_string(),
        })
    }

    /// Get the underlying NATS client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn to_header_map(headers: &RpcHeaders) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, values) in headers.iter() {
        for value in values {
            map.append(name, value.as_str());
        }
    }
    map
}

#[async_trait]
impl BusConnection for NatsConnection {
    async fn request(&self, subject: &str, headers: &RpcHeaders, payload: Bytes) -> Result<Bytes> {
        use async_nats::RequestErrorKind;

        let message = self
            .client
            .request_with_headers(subject.to_string(), to_header_map(headers), payload)
            .await
            .map_err(|e| match e.kind() {
                RequestErrorKind::TimedOut => ClientError::Timeout(subject.to_string()),
                RequestErrorKind::NoResponders => {
                    ClientError::Transport(format!("no responders on {subject}"))
                }
                _ => ClientError::Transport(format!("request to {subject} failed: {e}")),
            })?;

        Ok(message.payload)
    }
}

/// [`BusConnector`] backed by async-nats
#[derive(Debug, Clone, Copy, Default)]
pub struct NatsConnector;

#[async_trait]
impl BusConnector for NatsConnector {
    async fn connect(
        &self,
        instance_name: &str,
        config: &TransportConfig,
    ) -> Result<Arc<dyn BusConnection>> {
        let connection = NatsConnection::connect(instance_name, config).await?;
        Ok(Arc::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Connecting needs a running NATS server; only the pure helpers are
    // covered here.

    #[test]
    fn test_header_map_conversion() {
        let mut headers = RpcHeaders::new();
        headers.insert("clientId", "c1");
        headers.append("username", "u1");
        headers.append("username", "u2");

        let map = to_header_map(&headers);

        assert_eq!(map.get("clientId").map(|v| v.as_str()), Some("c1"));
        assert_eq!(map.get("username").map(|v| v.as_str()), Some("u1"));
    }

    #[tokio::test]
    async fn test_connect_requires_written_files() {
        let config = TransportConfig::default();
        let result = NatsConnection::connect("nc-c1", &config).await;
        assert!(matches!(
            result,
            Err(ClientError::IncompleteTransportConfig(_))
        ));
    }
}
