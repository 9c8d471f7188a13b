//! NATS Connect client
//!
//! Bootstraps an authenticated session against NATS Connect and exposes its
//! backend operations as typed, encrypted request/reply calls over NATS.
//!
//! ## Session
//!
//! - **Credentials**: explicit values or a JSON configuration file
//! - **Authentication**: one login with the identity provider
//! - **Parameters**: bus address, shared token and TLS material from the
//!   parameter store
//! - **Transport**: private files for the secret material, one shared TLS
//!   connection
//!
//! ## Calls
//!
//! Every endpoint in [`endpoints`] is a method on [`NcClient`]. Requests are
//! JSON encoded and encrypted under a key derived from the client id and
//! secret key; replies come back as clear JSON.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod nats;
pub mod parameters;
pub mod rpc;
pub mod session;
pub mod types;

pub use auth::{IdentityProvider, LocalIdentityProvider, SessionTokens};
pub use config::{ClientArgs, Environment};
pub use credentials::{ClientIdentity, CredentialSource, ExplicitCredentials, SecretString};
pub use endpoints::Endpoint;
pub use nats::{BusConnector, ConnectionHandle, NatsConnector, TransportConfig};
pub use parameters::{MemoryParameterStore, ParameterStore};
pub use rpc::BusConnection;
pub use session::{Bootstrap, NcClient};
pub use types::{ClientError, Result};
