//! Session bootstrap
//!
//! [`Bootstrap`] runs the whole startup sequence once:
//!
//! 1. Resolve and validate credentials, deriving the payload cipher
//! 2. Log in with the identity provider (the password is redacted afterwards)
//! 3. Fetch the transport parameters with the issued id token
//! 4. Write the transport artifacts and open the bus connection
//!
//! The result is an [`NcClient`] that serves every endpoint over the one
//! shared connection.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::auth::{authenticate, IdentityProvider, SessionTokens};
use crate::credentials::{resolve_credentials, ClientIdentity, CredentialSource};
use crate::endpoints::Endpoint;
use crate::nats::transport::{provision_transport, BusConnector, ConnectionHandle};
use crate::parameters::{fetch_transport_parameters, ParameterStore, NC_PARAMETER_PREFIX};
use crate::rpc::crypto::PayloadCipher;
use crate::rpc::RpcExchange;
use crate::types::Result;

/// Collaborators used to establish a session
pub struct Bootstrap {
    identity_provider: Arc<dyn IdentityProvider>,
    parameter_store: Arc<dyn ParameterStore>,
    connector: Arc<dyn BusConnector>,
    parameter_prefix: String,
}

impl Bootstrap {
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        parameter_store: Arc<dyn ParameterStore>,
        connector: Arc<dyn BusConnector>,
    ) -> Self {
        Self {
            identity_provider,
            parameter_store,
            connector,
            parameter_prefix: NC_PARAMETER_PREFIX.to_string(),
        }
    }

    /// Read transport parameters from another product namespace
    pub fn with_parameter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.parameter_prefix = prefix.into();
        self
    }

    /// Establish a session. Stops at the first failing stage.
    pub async fn connect(&self, source: CredentialSource) -> Result<NcClient> {
        let resolved = resolve_credentials(source)?;
        let identity = resolved.identity;
        let mut password = resolved.password;

        let tokens = authenticate(
            self.identity_provider.as_ref(),
            &identity.username,
            &mut password,
        )
        .await?;

        let transport = fetch_transport_parameters(
            self.parameter_store.as_ref(),
            &tokens.id_token,
            identity.environment,
            &self.parameter_prefix,
        )
        .await?;

        let (handle, _transport) = provision_transport(
            transport,
            &resolved.temp_directory,
            &identity.client_id,
            self.connector.as_ref(),
        )
        .await?;

        info!(
            client_id = %identity.client_id,
            environment = %identity.environment,
            instance_name = %handle.instance_name,
            "Session established"
        );

        Ok(NcClient::from_parts(
            identity,
            tokens,
            handle,
            Arc::new(resolved.cipher),
        ))
    }
}

/// Handle to an established session.
///
/// Cheap to clone; clones share the connection. Calls may run concurrently,
/// each with its own reply timeout.
#[derive(Clone)]
pub struct NcClient {
    identity: Arc<ClientIdentity>,
    tokens: Arc<SessionTokens>,
    handle: ConnectionHandle,
    cipher: Arc<dyn PayloadCipher>,
}

impl NcClient {
    /// Assemble a client over an already open connection
    pub fn from_parts(
        identity: ClientIdentity,
        tokens: SessionTokens,
        handle: ConnectionHandle,
        cipher: Arc<dyn PayloadCipher>,
    ) -> Self {
        Self {
            identity: Arc::new(identity),
            tokens: Arc::new(tokens),
            handle,
            cipher,
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    pub fn instance_name(&self) -> &str {
        &self.handle.instance_name
    }

    /// Call endpoint `E`
    pub async fn call<E: Endpoint>(&self, request: &E::Request) -> Result<E::Reply> {
        self.dispatch::<E>(request, None).await
    }

    /// Call endpoint `E`, giving up early when `cancel` fires
    pub async fn call_with_cancel<E: Endpoint>(
        &self,
        request: &E::Request,
        cancel: &CancellationToken,
    ) -> Result<E::Reply> {
        self.dispatch::<E>(request, Some(cancel)).await
    }

    async fn dispatch<E: Endpoint>(
        &self,
        request: &E::Request,
        cancel: Option<&CancellationToken>,
    ) -> Result<E::Reply> {
        RpcExchange::seal(E::SUBJECT, request, &self.identity, self.cipher.as_ref())?
            .dispatch(self.handle.connection.as_ref(), cancel)
            .await
    }
}

impl std::fmt::Debug for NcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NcClient")
            .field("client_id", &self.identity.client_id)
            .field("username", &self.identity.username)
            .field("instance_name", &self.handle.instance_name)
            .finish_non_exhaustive()
    }
}
