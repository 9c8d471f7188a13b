//! NATS transport
//!
//! - `transport`: parameters to files to an open connection
//! - `client`: async-nats implementation of the bus capability

pub mod client;
pub mod transport;

pub use client::{NatsConnection, NatsConnector};
pub use transport::{
    build_instance_name, provision_transport, BusConnector, ConnectionHandle, TlsFilePaths,
    TlsMaterial, TransportConfig,
};
