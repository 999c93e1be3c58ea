//! Job update publisher with a bounded publish / reconnect / publish retry.
//!
//! [`JobUpdatePublisher`] owns the one channel to the exchange shared by
//! every request. The channel sits behind a `tokio::sync::Mutex`:
//!
//! - `Some(channel)` -- connected, ready to publish;
//! - `None` -- disconnected; every publish fails with
//!   [`BrokerError::NotConnected`] until [`reconnect`](JobUpdatePublisher::reconnect)
//!   succeeds.
//!
//! A channel whose publish failed is taken out of the slot and closed on the
//! spot, so it is never used again. [`update`](JobUpdatePublisher::update)
//! holds the lock across its whole retry sequence; no other request can
//! publish or reconnect in between.
//!
//! Every step is bounded by its own timeout and by one overall deadline per
//! operation ([`PublisherConfig::update_timeout`]), which also covers the
//! wait for the lock. Whether a channel is held is mirrored in an atomic flag
//! so [`is_connected`](JobUpdatePublisher::is_connected) never waits on the
//! lock.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use jobstatus_core::{JobState, UpdateMessage};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::broker::{BrokerChannel, BrokerConnector, BrokerError};

/// Routing key the exchange's consumers bind job updates with.
pub const DEFAULT_ROUTING_KEY: &str = "jobs.updates";

/// Default upper bound for a single publish (send + confirm).
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default upper bound for opening or closing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default upper bound for a whole update, lock wait included.
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(25);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tunables for [`JobUpdatePublisher`].
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Routing key every update is published with.
    pub routing_key: String,
    /// Limit for one publish attempt; exceeding it counts as a failed publish.
    pub publish_timeout: Duration,
    /// Limit for opening a connection and for closing a stale one.
    pub connect_timeout: Duration,
    /// Limit for one whole operation, from waiting on the lock to the last
    /// publish. Must stay below the HTTP request timeout.
    pub update_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for publisher operations.
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    /// The initial connection could not be opened.
    #[error("failed to connect to the message broker: {0}")]
    Connect(#[source] BrokerError),

    /// A publish attempt failed.
    #[error("failed to publish job status update: {0}")]
    Publish(#[source] BrokerError),

    /// The connection could not be reestablished.
    #[error("unable to reestablish the messaging connection: {0}")]
    Reconnect(#[source] BrokerError),

    /// Another operation held the connection for the whole time budget.
    #[error("timed out after {0:?} waiting for the messaging connection")]
    Busy(Duration),

    /// The update could not be serialized.
    #[error("failed to encode job status update: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Point-in-time copy of the publisher's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublisherStats {
    pub published: u64,
    pub publish_failures: u64,
    pub reconnect_attempts: u64,
    pub reconnect_failures: u64,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    publish_failures: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PublisherStats {
        PublisherStats {
            published: self.published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            reconnect_failures: self.reconnect_failures.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// JobUpdatePublisher
// ---------------------------------------------------------------------------

type ChannelSlot = Option<Box<dyn BrokerChannel>>;

/// Publishes job status updates to the exchange.
///
/// Created once at startup via [`JobUpdatePublisher::connect`] and shared
/// through an `Arc` with every request handler.
pub struct JobUpdatePublisher {
    connector: Box<dyn BrokerConnector>,
    config: PublisherConfig,
    channel: Mutex<ChannelSlot>,
    connected: AtomicBool,
    counters: Counters,
}

impl JobUpdatePublisher {
    /// Open the initial connection.
    ///
    /// Failure here means the service has no working publisher and must not
    /// start serving.
    pub async fn connect<C>(connector: C, config: PublisherConfig) -> Result<Self, PublisherError>
    where
        C: BrokerConnector + 'static,
    {
        let deadline = Instant::now() + config.update_timeout;
        let channel = within(config.connect_timeout, deadline, connector.connect())
            .await
            .map_err(PublisherError::Connect)?;

        tracing::info!(
            exchange = connector.exchange(),
            routing_key = %config.routing_key,
            "Job update publisher connected",
        );

        Ok(Self {
            connector: Box::new(connector),
            config,
            channel: Mutex::new(Some(channel)),
            connected: AtomicBool::new(true),
            counters: Counters::default(),
        })
    }

    /// Send exactly one message over the current channel.
    ///
    /// No retry happens here; on failure the channel is discarded and the
    /// publisher stays disconnected until [`reconnect`](Self::reconnect).
    pub async fn publish(&self, message: &UpdateMessage) -> Result<(), PublisherError> {
        let payload = serde_json::to_vec(message)?;
        let deadline = self.deadline();
        let mut slot = self.lock_slot(deadline).await?;
        self.publish_locked(&mut slot, &payload, deadline).await
    }

    /// Tear down the current channel (if any) and open a fresh one.
    pub async fn reconnect(&self) -> Result<(), PublisherError> {
        let deadline = self.deadline();
        let mut slot = self.lock_slot(deadline).await?;
        self.reconnect_locked(&mut slot, deadline).await
    }

    /// Release the channel. Later publishes fail until a reconnect.
    pub async fn close(&self) {
        let mut slot = self.channel.lock().await;
        if let Some(channel) = slot.take() {
            self.connected.store(false, Ordering::SeqCst);
            self.close_channel(channel, self.deadline()).await;
            tracing::info!(exchange = self.connector.exchange(), "Job update publisher closed");
        }
    }

    /// Whether a channel is currently held. Does not wait for an operation
    /// in progress.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PublisherStats {
        self.counters.snapshot()
    }

    /// Build an [`UpdateMessage`] and deliver it with bounded retry.
    ///
    /// 1. Publish. On success, return the message.
    /// 2. On failure, reconnect once. If that fails, return the reconnect
    ///    error without publishing again.
    /// 3. Publish one more time and return its outcome.
    ///
    /// At most one reconnect and two publishes, no backoff, and nothing is
    /// kept for later: a message that fails twice is the caller's to retry.
    /// The sequence ends with an error once `update_timeout` has passed,
    /// counting the time spent waiting for other updates.
    pub async fn update(
        &self,
        state: JobState,
        job_id: &str,
        hostname: &str,
        message: &str,
    ) -> Result<UpdateMessage, PublisherError> {
        let update = UpdateMessage::new(job_id, state, hostname, message);
        let payload = serde_json::to_vec(&update)?;

        let deadline = self.deadline();
        let mut slot = self.lock_slot(deadline).await.inspect_err(|e| {
            tracing::error!(job_id, error = %e, "Gave up waiting for the messaging connection");
        })?;

        let first_err = match self.publish_locked(&mut slot, &payload, deadline).await {
            Ok(()) => {
                log_delivered(&update);
                return Ok(update);
            }
            Err(e) => e,
        };

        tracing::error!(job_id, error = %first_err, "Failed to publish job status update");
        tracing::info!(job_id, "Attempting to reestablish the messaging connection");

        if let Err(e) = self.reconnect_locked(&mut slot, deadline).await {
            tracing::error!(job_id, error = %e, "Unable to reestablish the messaging connection");
            return Err(e);
        }

        match self.publish_locked(&mut slot, &payload, deadline).await {
            Ok(()) => {
                log_delivered(&update);
                Ok(update)
            }
            Err(e) => {
                tracing::error!(
                    job_id,
                    error = %e,
                    "Failed to publish job status update again, giving up",
                );
                Err(e)
            }
        }
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.update_timeout
    }

    async fn lock_slot(
        &self,
        deadline: Instant,
    ) -> Result<MutexGuard<'_, ChannelSlot>, PublisherError> {
        tokio::time::timeout_at(deadline, self.channel.lock())
            .await
            .map_err(|_| PublisherError::Busy(self.config.update_timeout))
    }

    // ---- private helpers (caller holds the channel lock) ----

    async fn publish_locked(
        &self,
        slot: &mut ChannelSlot,
        payload: &[u8],
        deadline: Instant,
    ) -> Result<(), PublisherError> {
        let result = match slot.as_ref() {
            Some(channel) => {
                let send = channel.publish(&self.config.routing_key, payload);
                within(self.config.publish_timeout, deadline, send).await
            }
            None => Err(BrokerError::NotConnected),
        };

        match result {
            Ok(()) => {
                Counters::bump(&self.counters.published);
                Ok(())
            }
            Err(e) => {
                Counters::bump(&self.counters.publish_failures);
                if let Some(channel) = slot.take() {
                    self.connected.store(false, Ordering::SeqCst);
                    self.close_channel(channel, deadline).await;
                }
                Err(PublisherError::Publish(e))
            }
        }
    }

    async fn reconnect_locked(
        &self,
        slot: &mut ChannelSlot,
        deadline: Instant,
    ) -> Result<(), PublisherError> {
        Counters::bump(&self.counters.reconnect_attempts);

        if let Some(stale) = slot.take() {
            self.connected.store(false, Ordering::SeqCst);
            self.close_channel(stale, deadline).await;
        }

        let open = self.connector.connect();
        match within(self.config.connect_timeout, deadline, open).await {
            Ok(channel) => {
                *slot = Some(channel);
                self.connected.store(true, Ordering::SeqCst);
                tracing::info!(
                    exchange = self.connector.exchange(),
                    "Reestablished the messaging connection",
                );
                Ok(())
            }
            Err(e) => {
                Counters::bump(&self.counters.reconnect_failures);
                Err(PublisherError::Reconnect(e))
            }
        }
    }

    /// Close a channel that is no longer wanted. Errors are only logged: the
    /// channel is gone from the slot either way.
    async fn close_channel(&self, channel: Box<dyn BrokerChannel>, deadline: Instant) {
        match within(self.config.connect_timeout, deadline, channel.close()).await {
            Ok(()) => {}
            Err(e) => tracing::debug!(error = %e, "Error while closing broker channel"),
        }
    }
}

/// Run one broker step, bounded by `limit` and by the operation `deadline`,
/// whichever comes first. The reported timeout is the time the step got.
async fn within<T, F>(limit: Duration, deadline: Instant, step: F) -> Result<T, BrokerError>
where
    F: Future<Output = Result<T, BrokerError>>,
{
    let started = Instant::now();
    let step_deadline = deadline.min(started + limit);
    match tokio::time::timeout_at(step_deadline, step).await {
        Ok(result) => result,
        Err(_) => Err(BrokerError::Timeout(step_deadline.saturating_duration_since(started))),
    }
}

fn log_delivered(update: &UpdateMessage) {
    let job_id = update.invocation_id();
    let state = update.state();
    let hostname = update.sender();
    let message = update.message();
    tracing::info!(
        job_id,
        %state,
        hostname,
        "{job_id} ({state}) [{hostname}]: {message}",
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
