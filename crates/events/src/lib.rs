//! Job status event publishing.
//!
//! This crate owns the connection to the message exchange:
//!
//! - [`BrokerConnector`] / [`BrokerChannel`] -- the seam between the
//!   publisher and a concrete transport.
//! - [`AmqpConnector`] -- the production transport, backed by `lapin`.
//! - [`InMemoryBroker`] -- an in-process transport with fault injection.
//! - [`JobUpdatePublisher`] -- serializes access to the shared channel and
//!   runs the bounded publish / reconnect / publish protocol.

pub mod amqp;
pub mod broker;
pub mod memory;
pub mod publisher;

pub use amqp::AmqpConnector;
pub use broker::{BrokerChannel, BrokerConnector, BrokerError};
pub use memory::InMemoryBroker;
pub use publisher::{JobUpdatePublisher, PublisherConfig, PublisherError, PublisherStats};
