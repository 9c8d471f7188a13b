//! Transport provisioning
//!
//! Turns fetched connection parameters into an open bus connection: the
//! secret material is written to private files under the session's
//! temporary directory, an instance name is derived from the client id,
//! and a [`BusConnector`] opens the connection.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::KEY_CLIENT_ID;
use crate::credentials::SecretString;
use crate::rpc::BusConnection;
use crate::types::{ClientError, Result};

/// Credentials file holding the shared bus token
pub const CREDENTIALS_FILENAME: &str = "nats.creds";
pub const TLS_CA_BUNDLE_FILENAME: &str = "tls-ca-bundle.pem";
pub const TLS_CERT_FILENAME: &str = "tls-cert.pem";
pub const TLS_PRIVATE_KEY_FILENAME: &str = "tls-private-key.pem";

/// Prefix of every connection instance name
pub const INSTANCE_NAME_PREFIX: &str = "nc";

/// PEM material for mutual TLS
#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    pub cert: String,
    pub private_key: SecretString,
    pub ca_bundle: String,
}

/// On-disk locations of the TLS material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFilePaths {
    pub ca_bundle: PathBuf,
    pub cert: PathBuf,
    pub private_key: PathBuf,
}

/// Everything needed to open the bus connection
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    pub bus_url: String,
    pub bus_port: u16,
    pub shared_token: SecretString,
    pub tls: TlsMaterial,
    /// Set once the credentials file is written
    pub credentials_file: Option<PathBuf>,
    /// Set once the TLS files are written
    pub tls_files: Option<TlsFilePaths>,
}

impl TransportConfig {
    /// Network fields that are still unpopulated
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.bus_url.trim().is_empty() {
            missing.push("bus_url");
        }
        if self.bus_port == 0 {
            missing.push("bus_port");
        }
        if self.shared_token.is_empty() {
            missing.push("shared_token");
        }
        if self.tls.cert.is_empty() {
            missing.push("tls_cert");
        }
        if self.tls.private_key.is_empty() {
            missing.push("tls_private_key");
        }
        if self.tls.ca_bundle.is_empty() {
            missing.push("tls_ca_bundle");
        }
        missing
    }

    /// `tls://{url}:{port}`. A scheme or port already present in the URL
    /// is kept as-is.
    pub fn server_address(&self) -> String {
        let url = self.bus_url.trim().trim_end_matches('/');
        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("tls", url),
        };
        if authority_has_port(rest) {
            format!("{scheme}://{rest}")
        } else {
            format!("{scheme}://{rest}:{}", self.bus_port)
        }
    }
}

fn authority_has_port(rest: &str) -> bool {
    let authority = rest.split('/').next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    match host.rsplit_once(':') {
        // bare IPv6 literal without brackets has no separate port
        Some((h, _)) if h.contains(':') && !h.ends_with(']') => false,
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// An open bus connection, shared by every call of a session
#[derive(Clone)]
pub struct ConnectionHandle {
    pub instance_name: String,
    pub connection: Arc<dyn BusConnection>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("instance_name", &self.instance_name)
            .finish_non_exhaustive()
    }
}

/// Opens bus connections from a provisioned configuration
#[async_trait]
pub trait BusConnector: Send + Sync {
    /// Connect as `instance_name`. Failures are reported as
    /// [`ClientError::Connection`].
    async fn connect(
        &self,
        instance_name: &str,
        config: &TransportConfig,
    ) -> Result<Arc<dyn BusConnection>>;
}

/// `nc-` followed by the alphanumeric segments of the client id and the
/// first 8 hex digits of its SHA-256.
///
/// The segments keep the name readable; the digest keeps ids that only
/// differ in case or punctuation apart.
pub fn build_instance_name(client_id: &str) -> Result<String> {
    if client_id.trim().is_empty() {
        return Err(ClientError::MissingArgument(KEY_CLIENT_ID));
    }

    let digest = Sha256::digest(client_id.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();

    let segments: Vec<&str> = client_id
        .split(|c: char| !c.is_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        Ok(format!("{INSTANCE_NAME_PREFIX}-{suffix}"))
    } else {
        Ok(format!("{INSTANCE_NAME_PREFIX}-{}-{suffix}", segments.join("-")))
    }
}

/// Write the transport artifacts and open the connection.
///
/// Nothing is written when the configuration is incomplete. Any failure
/// after the first write removes every artifact written so far.
pub async fn provision_transport(
    mut config: TransportConfig,
    temp_directory: &Path,
    client_id: &str,
    connector: &dyn BusConnector,
) -> Result<(ConnectionHandle, TransportConfig)> {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        return Err(ClientError::IncompleteTransportConfig(missing));
    }
    let instance_name = build_instance_name(client_id)?;

    let mut written = Vec::with_capacity(4);
    match open_connection(&mut config, temp_directory, instance_name, connector, &mut written).await {
        Ok(handle) => {
            info!(
                instance_name = %handle.instance_name,
                server = %config.server_address(),
                "Bus connection established"
            );
            Ok((handle, config))
        }
        Err(e) => {
            remove_artifacts(&written).await;
            config.credentials_file = None;
            config.tls_files = None;
            Err(e)
        }
    }
}

async fn open_connection(
    config: &mut TransportConfig,
    temp_directory: &Path,
    instance_name: String,
    connector: &dyn BusConnector,
    written: &mut Vec<PathBuf>,
) -> Result<ConnectionHandle> {
    let credentials_file = temp_directory.join(CREDENTIALS_FILENAME);
    write_private_file(&credentials_file, config.shared_token.expose(), written).await?;
    config.credentials_file = Some(credentials_file);

    let tls_files = TlsFilePaths {
        ca_bundle: temp_directory.join(TLS_CA_BUNDLE_FILENAME),
        cert: temp_directory.join(TLS_CERT_FILENAME),
        private_key: temp_directory.join(TLS_PRIVATE_KEY_FILENAME),
    };
    write_private_file(&tls_files.ca_bundle, &config.tls.ca_bundle, written).await?;
    write_private_file(&tls_files.cert, &config.tls.cert, written).await?;
    write_private_file(&tls_files.private_key, config.tls.private_key.expose(), written).await?;
    config.tls_files = Some(tls_files);

    let connection = connector
        .connect(&instance_name, config)
        .await
        .map_err(|e| match e {
            ClientError::Connection(_) => e,
            other => ClientError::Connection(other.to_string()),
        })?;

    Ok(ConnectionHandle {
        instance_name,
        connection,
    })
}

async fn write_private_file(path: &Path, contents: &str, written: &mut Vec<PathBuf>) -> Result<()> {
    let to_error = |source| ClientError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await.map_err(to_error)?;
    written.push(path.to_path_buf());

    // mode() only applies on create; tighten a file that was already there
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(to_error)?;
    }

    file.write_all(contents.as_bytes()).await.map_err(to_error)?;
    file.flush().await.map_err(to_error)?;

    debug!(path = %path.display(), "Wrote transport artifact");
    Ok(())
}

async fn remove_artifacts(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove transport artifact");
        }
    }
}
