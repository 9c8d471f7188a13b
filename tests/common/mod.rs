//! Shared fixtures for integration tests
//!
//! The mock bus plays the backend: it decrypts every request with the
//! client's payload key, checks the routing headers and answers through a
//! per-test responder. Subjects the responder does not know never reply.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nats_connect_client::auth::AUTH_FLOW_USER_SRP;
use nats_connect_client::credentials::PROTECTED;
use nats_connect_client::nats::transport::build_instance_name;
use nats_connect_client::rpc::crypto::{ChaChaPayloadCipher, PayloadCipher};
use nats_connect_client::rpc::{RpcHeaders, HEADER_CLIENT_ID, HEADER_USERNAME};
use nats_connect_client::{
    BusConnection, BusConnector, ClientError, ClientIdentity, ConnectionHandle, Environment,
    IdentityProvider, NcClient, Result, SecretString, SessionTokens, TransportConfig,
};

pub const CLIENT_ID: &str = "c1";
pub const USERNAME: &str = "u1";
pub const SECRET_KEY: &str = "s1";

type Responder = dyn Fn(&str, &Value) -> Option<Value> + Send + Sync;

/// A request as the backend saw it after decryption
#[derive(Debug, Clone)]
pub struct Received {
    pub subject: String,
    pub headers: RpcHeaders,
    pub body: Value,
}

pub struct MockBus {
    cipher: ChaChaPayloadCipher,
    expected_client_id: String,
    expected_username: String,
    responder: Box<Responder>,
    received: Mutex<Vec<Received>>,
}

impl MockBus {
    pub fn new(
        responder: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            cipher: ChaChaPayloadCipher::derive(CLIENT_ID, SECRET_KEY).unwrap(),
            expected_client_id: CLIENT_ID.to_string(),
            expected_username: USERNAME.to_string(),
            responder: Box::new(responder),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl BusConnection for MockBus {
    async fn request(&self, subject: &str, headers: &RpcHeaders, payload: Bytes) -> Result<Bytes> {
        assert_eq!(headers.get(HEADER_CLIENT_ID), Some(self.expected_client_id.as_str()));
        assert_eq!(headers.get(HEADER_USERNAME), Some(self.expected_username.as_str()));

        let sealed = std::str::from_utf8(&payload).expect("ciphertext is base64 text");
        let plaintext = self.cipher.decrypt(sealed)?;
        let body: Value = serde_json::from_slice(&plaintext).expect("request body is JSON");

        self.received.lock().unwrap().push(Received {
            subject: subject.to_string(),
            headers: headers.clone(),
            body: body.clone(),
        });

        match (self.responder)(subject, &body) {
            Some(reply) => Ok(Bytes::from(serde_json::to_vec(&reply).unwrap())),
            None => std::future::pending().await,
        }
    }
}

/// Answers the team endpoints the way the backend would
pub fn teams_responder(subject: &str, body: &Value) -> Option<Value> {
    match subject {
        "SYNADIA.LIST_TEAMS" => Some(serde_json::json!({ "items": [{ "id": "team-42" }] })),
        "SYNADIA.GET_TEAM" => Some(serde_json::json!({
            "id": body["team_id"],
            "name": "Team",
        })),
        _ => None,
    }
}

pub fn identity() -> ClientIdentity {
    ClientIdentity {
        client_id: CLIENT_ID.into(),
        username: USERNAME.into(),
        environment: Environment::Local,
        secret_key: SecretString::new(PROTECTED),
    }
}

pub fn tokens() -> SessionTokens {
    SessionTokens {
        access_token: SecretString::new("access"),
        id_token: SecretString::new("id"),
        refresh_token: SecretString::new("refresh"),
    }
}

/// A client wired straight to `bus`, skipping the bootstrap
pub fn client_over(bus: Arc<MockBus>) -> NcClient {
    NcClient::from_parts(
        identity(),
        tokens(),
        ConnectionHandle {
            instance_name: build_instance_name(CLIENT_ID).unwrap(),
            connection: bus,
        },
        Arc::new(ChaChaPayloadCipher::derive(CLIENT_ID, SECRET_KEY).unwrap()),
    )
}

/// Accepts exactly one password
pub struct MockIdentityProvider {
    pub password: String,
    pub calls: AtomicUsize,
}

impl MockIdentityProvider {
    pub fn accepting(password: &str) -> Self {
        Self {
            password: password.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn login(
        &self,
        flow: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionTokens> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(flow, AUTH_FLOW_USER_SRP);
        if username == USERNAME && password.expose() == self.password {
            Ok(tokens())
        } else {
            Err(ClientError::Authentication("incorrect username or password".into()))
        }
    }
}

/// Hands out one mock bus and records the plaintext values of the
/// configuration it was asked to connect with
pub struct MockConnector {
    pub bus: Arc<MockBus>,
    pub calls: AtomicUsize,
    pub seen_instance_name: Mutex<Option<String>>,
    pub seen_values: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new(bus: Arc<MockBus>) -> Self {
        Self {
            bus,
            calls: AtomicUsize::new(0),
            seen_instance_name: Mutex::new(None),
            seen_values: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BusConnector for MockConnector {
    async fn connect(
        &self,
        instance_name: &str,
        config: &TransportConfig,
    ) -> Result<Arc<dyn BusConnection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_instance_name.lock().unwrap() = Some(instance_name.to_string());

        let mut values = vec![
            config.bus_url.clone(),
            config.shared_token.expose().to_string(),
            config.tls.cert.clone(),
            config.tls.private_key.expose().to_string(),
            config.tls.ca_bundle.clone(),
        ];
        values.extend(config.credentials_file.iter().map(|p| p.display().to_string()));
        if let Some(files) = &config.tls_files {
            for path in [&files.ca_bundle, &files.cert, &files.private_key] {
                values.push(path.display().to_string());
            }
        }
        *self.seen_values.lock().unwrap() = values;

        Ok(self.bus.clone())
    }
}
