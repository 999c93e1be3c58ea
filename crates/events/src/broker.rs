//! Transport seam between the publisher and a message broker.
//!
//! A [`BrokerConnector`] knows where the broker is and which exchange to
//! publish to; each call to [`connect`](BrokerConnector::connect) opens a
//! fresh [`BrokerChannel`]. The publisher never shares a channel between
//! two in-flight operations.

use std::time::Duration;

use async_trait::async_trait;

/// Opens channels to a broker exchange.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Open a new connection and channel ready for publishing.
    async fn connect(&self) -> Result<Box<dyn BrokerChannel>, BrokerError>;

    /// Exchange this connector publishes to (for logging).
    fn exchange(&self) -> &str;
}

/// A live channel able to send messages to the connector's exchange.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Send one message and wait for the broker to accept it.
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Release the channel and its connection.
    async fn close(self: Box<Self>) -> Result<(), BrokerError>;
}

/// Errors raised by a broker transport.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Could not open a connection or channel.
    #[error("Connection error: {0}")]
    Connect(String),

    /// A send or close on an open channel failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The broker negatively acknowledged the message.
    #[error("Broker rejected the message")]
    Nacked,

    /// The operation did not finish in time.
    #[error("Broker operation timed out after {0:?}")]
    Timeout(Duration),

    /// There is no open channel to publish on.
    #[error("Not connected to the broker")]
    NotConnected,
}
