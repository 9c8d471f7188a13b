//! Secure RPC envelope
//!
//! Every remote operation follows the same round trip:
//!
//! 1. JSON-encode the typed request
//! 2. Encrypt it under the per-client payload key
//! 3. Attach `clientId` and `username` headers in clear (routing and
//!    authorization data, not secrets)
//! 4. Send a request/reply exchange on the operation's subject, bounded by
//!    [`RPC_TIMEOUT`]
//! 5. JSON-decode the typed reply
//!
//! Replies travel back in clear JSON; only the request leg is encrypted.
//! Nothing here retries or deduplicates.

pub mod crypto;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::credentials::ClientIdentity;
use crate::types::{ClientError, Result};
use self::crypto::PayloadCipher;

/// Fixed reply timeout for every RPC call
pub const RPC_TIMEOUT: Duration = Duration::from_secs(2);

/// Header carrying the caller's client id
pub const HEADER_CLIENT_ID: &str = "clientId";

/// Header carrying the caller's username
pub const HEADER_USERNAME: &str = "username";

// =============================================================================
// Bus capability
// =============================================================================

/// Request/reply primitive of the message bus.
///
/// One connection is shared by every call of a session, so implementations
/// must support concurrent in-flight requests.
#[async_trait]
pub trait BusConnection: Send + Sync {
    /// Send `payload` on `subject` and wait for a single reply.
    ///
    /// Implementations report a missing reply as [`ClientError::Timeout`]
    /// and connection-level failures as [`ClientError::Transport`].
    async fn request(&self, subject: &str, headers: &RpcHeaders, payload: Bytes) -> Result<Bytes>;
}

/// Multi-valued message headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcHeaders(BTreeMap<String, Vec<String>>);

impl RpcHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values of `name` with `value`
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), vec![value.into()]);
    }

    /// Add `value` to the values of `name`
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// First value of `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|values| values.first()).map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// One sealed request, alive for a single round trip
#[derive(Debug, Clone)]
pub struct RpcExchange {
    pub subject: String,
    pub headers: RpcHeaders,
    /// Encrypted request body
    pub payload: Bytes,
    pub timeout: Duration,
}

impl RpcExchange {
    /// Encode, encrypt and address a request.
    pub fn seal<R: Serialize + ?Sized>(
        subject: &str,
        request: &R,
        identity: &ClientIdentity,
        cipher: &dyn PayloadCipher,
    ) -> Result<Self> {
        let encoded = serde_json::to_vec(request)
            .map_err(|e| ClientError::Serialization(format!("{subject}: {e}")))?;

        let sealed = cipher.encrypt(&encoded)?;

        let mut headers = RpcHeaders::new();
        headers.insert(HEADER_CLIENT_ID, identity.client_id.as_str());
        headers.insert(HEADER_USERNAME, identity.username.as_str());

        Ok(Self {
            subject: subject.to_string(),
            headers,
            payload: Bytes::from(sealed.into_bytes()),
            timeout: RPC_TIMEOUT,
        })
    }

    /// Send the exchange and decode the typed reply.
    ///
    /// A fired `cancel` token abandons the wait with [`ClientError::Cancelled`]
    /// without touching other calls on the same connection.
    pub async fn dispatch<Reply: DeserializeOwned>(
        self,
        bus: &dyn BusConnection,
        cancel: Option<&CancellationToken>,
    ) -> Result<Reply> {
        let Self {
            subject,
            headers,
            payload,
            timeout,
        } = self;

        let call_id = uuid::Uuid::new_v4();
        debug!(%call_id, subject = %subject, bytes = payload.len(), "Sending request");

        let exchange = tokio::time::timeout(timeout, bus.request(&subject, &headers, payload));

        let outcome = match cancel {
            Some(token) => tokio::select! {
                result = exchange => result,
                _ = token.cancelled() => {
                    debug!(%call_id, subject = %subject, "Request cancelled");
                    return Err(ClientError::Cancelled(subject.clone()));
                }
            },
            None => exchange.await,
        };

        let reply = outcome.map_err(|_| ClientError::Timeout(subject.clone()))??;

        debug!(%call_id, subject = %subject, bytes = reply.len(), "Reply received");

        serde_json::from_slice(&reply)
            .map_err(|e| ClientError::Deserialization(format!("{subject}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::credentials::SecretString;
    use crypto::ChaChaPayloadCipher;
    use serde::Deserialize;
    use std::time::Instant;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Ping {
        value: u32,
    }

    fn identity() -> ClientIdentity {
        ClientIdentity {
            client_id: "c1".into(),
            username: "u1".into(),
            environment: Environment::Local,
            secret_key: SecretString::new(crate::credentials::PROTECTED),
        }
    }

    /// Replies with a fixed body, or never replies when `body` is None
    struct FixedBus {
        body: Option<&'static str>,
    }

    #[async_trait]
    impl BusConnection for FixedBus {
        async fn request(&self, _subject: &str, _headers: &RpcHeaders, _payload: Bytes) -> Result<Bytes> {
            match self.body {
                Some(body) => Ok(Bytes::from_static(body.as_bytes())),
                None => std::future::pending().await,
            }
        }
    }

    struct NoResponders;

    #[async_trait]
    impl BusConnection for NoResponders {
        async fn request(&self, subject: &str, _headers: &RpcHeaders, _payload: Bytes) -> Result<Bytes> {
            Err(ClientError::Transport(format!("no responders on {subject}")))
        }
    }

    #[test]
    fn test_headers_multi_value() {
        let mut headers = RpcHeaders::new();
        headers.append("trace", "a");
        headers.append("trace", "b");
        headers.insert(HEADER_CLIENT_ID, "c1");

        assert_eq!(headers.get("trace"), Some("a"));
        assert_eq!(headers.get_all("trace"), ["a".to_string(), "b".to_string()]);
        assert_eq!(headers.get(HEADER_CLIENT_ID), Some("c1"));
        assert!(headers.get_all("missing").is_empty());

        headers.insert("trace", "c");
        assert_eq!(headers.get_all("trace"), ["c".to_string()]);
    }

    #[test]
    fn test_seal_sets_identity_headers_and_encrypts() {
        let cipher = ChaChaPayloadCipher::derive("c1", "s1").unwrap();
        let exchange = RpcExchange::seal("TEST.PING", &Ping { value: 7 }, &identity(), &cipher).unwrap();

        assert_eq!(exchange.subject, "TEST.PING");
        assert_eq!(exchange.timeout, RPC_TIMEOUT);
        assert_eq!(exchange.headers.get(HEADER_CLIENT_ID), Some("c1"));
        assert_eq!(exchange.headers.get(HEADER_USERNAME), Some("u1"));

        let sealed = std::str::from_utf8(&exchange.payload).unwrap();
        assert!(!sealed.contains("value"));
        let opened: Ping = serde_json::from_slice(&cipher.decrypt(sealed).unwrap()).unwrap();
        assert_eq!(opened, Ping { value: 7 });
    }

    #[tokio::test]
    async fn test_dispatch_decodes_reply() {
        let cipher = ChaChaPayloadCipher::derive("c1", "s1").unwrap();
        let exchange = RpcExchange::seal("TEST.PING", &Ping { value: 1 }, &identity(), &cipher).unwrap();

        let reply: Ping = exchange
            .dispatch(&FixedBus { body: Some(r#"{"value": 2}"#) }, None)
            .await
            .unwrap();
        assert_eq!(reply, Ping { value: 2 });
    }

    #[tokio::test]
    async fn test_dispatch_reply_shape_mismatch() {
        let cipher = ChaChaPayloadCipher::derive("c1", "s1").unwrap();
        let exchange = RpcExchange::seal("TEST.PING", &Ping { value: 1 }, &identity(), &cipher).unwrap();

        let result: Result<Ping> = exchange
            .dispatch(&FixedBus { body: Some(r#"{"items": []}"#) }, None)
            .await;
        assert!(matches!(result, Err(ClientError::Deserialization(_))));
    }

    #[tokio::test]
    async fn test_dispatch_times_out_after_two_seconds() {
        let cipher = ChaChaPayloadCipher::derive("c1", "s1").unwrap();
        let exchange = RpcExchange::seal("TEST.SILENT", &Ping { value: 1 }, &identity(), &cipher).unwrap();

        let started = Instant::now();
        let result: Result<Ping> = exchange.dispatch(&FixedBus { body: None }, None).await;
        let elapsed = started.elapsed();

        match result {
            Err(ClientError::Timeout(subject)) => assert_eq!(subject, "TEST.SILENT"),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_millis(2200));
    }

    #[tokio::test]
    async fn test_dispatch_cancelled() {
        let cipher = ChaChaPayloadCipher::derive("c1", "s1").unwrap();
        let exchange = RpcExchange::seal("TEST.SILENT", &Ping { value: 1 }, &identity(), &cipher).unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result: Result<Ping> = exchange.dispatch(&FixedBus { body: None }, Some(&token)).await;

        assert!(matches!(result, Err(ClientError::Cancelled(_))));
        assert!(started.elapsed() < RPC_TIMEOUT);
    }

    #[tokio::test]
    async fn test_dispatch_surfaces_transport_error() {
        let cipher = ChaChaPayloadCipher::derive("c1", "s1").unwrap();
        let exchange = RpcExchange::seal("TEST.NOBODY", &Ping { value: 1 }, &identity(), &cipher).unwrap();

        let result: Result<Ping> = exchange.dispatch(&NoResponders, None).await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
