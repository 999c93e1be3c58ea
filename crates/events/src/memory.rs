//! In-process broker transport.
//!
//! [`InMemoryBroker`] implements the broker seam without a network. It keeps
//! every delivered message, counts connects / publishes / closes, and can be
//! told to fail the next N connects or publishes. It also watches for two
//! misuses of a connection that the publisher must never commit:
//!
//! - an operation entering while another one is still in flight
//!   ([`overlap_count`](InMemoryBroker::overlap_count));
//! - a publish on a channel that already failed once
//!   ([`broken_reuse_count`](InMemoryBroker::broken_reuse_count)).
//!
//! Cloning an `InMemoryBroker` yields another handle to the same broker.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobstatus_core::UpdateMessage;

use crate::broker::{BrokerChannel, BrokerConnector, BrokerError};

/// A message accepted by the in-memory broker.
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub routing_key: String,
    pub payload: Vec<u8>,
}

impl DeliveredMessage {
    /// Decode the payload as an [`UpdateMessage`].
    pub fn update(&self) -> Result<UpdateMessage, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[derive(Default)]
struct Inner {
    exchange: String,
    delivered: Mutex<Vec<DeliveredMessage>>,
    fail_connects: AtomicUsize,
    fail_publishes: AtomicUsize,
    latency_micros: AtomicU64,
    connects: AtomicUsize,
    publish_attempts: AtomicUsize,
    closes: AtomicUsize,
    active: AtomicUsize,
    overlaps: AtomicUsize,
    broken_reuses: AtomicUsize,
}

impl Inner {
    /// Consume one injected failure from `counter`, if any remain.
    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn simulate_latency(&self) {
        let micros = self.latency_micros.load(Ordering::SeqCst);
        if micros > 0 {
            tokio::time::sleep(Duration::from_micros(micros)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

/// Marks an operation as in flight for as long as it lives.
struct InFlight<'a> {
    inner: &'a Inner,
}

impl<'a> InFlight<'a> {
    fn enter(inner: &'a Inner) -> Self {
        if inner.active.fetch_add(1, Ordering::SeqCst) > 0 {
            inner.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        Self { inner }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Broker that lives entirely in process memory.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

impl InMemoryBroker {
    pub fn new(exchange: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                exchange: exchange.into(),
                ..Default::default()
            }),
        }
    }

    /// Make the next `n` publishes fail with a transport error.
    pub fn fail_next_publishes(&self, n: usize) {
        self.inner.fail_publishes.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` connects fail with a connection error.
    pub fn fail_next_connects(&self, n: usize) {
        self.inner.fail_connects.store(n, Ordering::SeqCst);
    }

    /// Delay every connect, publish, and close by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.inner.latency_micros.store(micros, Ordering::SeqCst);
    }

    /// Every message accepted so far, in delivery order.
    pub fn delivered(&self) -> Vec<DeliveredMessage> {
        self.inner
            .delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Publishes attempted, successful or not.
    pub fn publish_attempts(&self) -> usize {
        self.inner.publish_attempts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// Operations that started while another operation was in flight.
    pub fn overlap_count(&self) -> usize {
        self.inner.overlaps.load(Ordering::SeqCst)
    }

    /// Publishes attempted on a channel whose previous publish failed.
    pub fn broken_reuse_count(&self) -> usize {
        self.inner.broken_reuses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerChannel>, BrokerError> {
        let _in_flight = InFlight::enter(&self.inner);
        self.inner.simulate_latency().await;
        self.inner.connects.fetch_add(1, Ordering::SeqCst);

        if Inner::take_failure(&self.inner.fail_connects) {
            return Err(BrokerError::Connect("injected connect failure".into()));
        }

        Ok(Box::new(MemoryChannel {
            inner: Arc::clone(&self.inner),
            broken: AtomicBool::new(false),
        }))
    }

    fn exchange(&self) -> &str {
        &self.inner.exchange
    }
}

struct MemoryChannel {
    inner: Arc<Inner>,
    broken: AtomicBool,
}

#[async_trait]
impl BrokerChannel for MemoryChannel {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let _in_flight = InFlight::enter(&self.inner);
        self.inner.publish_attempts.fetch_add(1, Ordering::SeqCst);

        if self.broken.load(Ordering::SeqCst) {
            self.inner.broken_reuses.fetch_add(1, Ordering::SeqCst);
        }

        self.inner.simulate_latency().await;

        if Inner::take_failure(&self.inner.fail_publishes) {
            self.broken.store(true, Ordering::SeqCst);
            return Err(BrokerError::Transport("injected publish failure".into()));
        }

        self.inner
            .delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(DeliveredMessage {
                routing_key: routing_key.to_string(),
                payload: payload.to_vec(),
            });
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), BrokerError> {
        let _in_flight = InFlight::enter(&self.inner);
        self.inner.simulate_latency().await;
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
