//! Throttler Service
//!
//! Paces one message type towards a single downstream endpoint. At most
//! `limit` messages are released in any `interval`; excess messages wait in
//! FIFO order and are never dropped.
//!
//! Each released message spends a voucher that becomes available again one
//! interval later. The refill timer is only armed while messages are queued,
//! so an idle throttler schedules nothing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Endpoint, SendError};
use crate::observability::{record_throttle_released, update_throttle_queue_depth};

/// Default mailbox capacity for a throttler.
pub const DEFAULT_THROTTLER_MAILBOX: usize = 1024;

/// Longest accepted refill period.
pub const MAX_THROTTLE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Rate limit of one throttler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Refill period.
    pub interval: Duration,
    /// Vouchers per interval.
    pub limit: usize,
}

impl ThrottleConfig {
    /// Limit per second.
    #[must_use]
    pub const fn per_second(limit: usize) -> Self {
        Self {
            interval: Duration::from_secs(1),
            limit,
        }
    }

    /// Check the limit and interval for the named throttler.
    ///
    /// # Errors
    ///
    /// Returns error if the limit or the interval is zero, or the interval
    /// exceeds [`MAX_THROTTLE_INTERVAL`].
    pub fn validate(&self, name: &str) -> Result<(), ThrottleError> {
        if self.limit == 0 {
            return Err(ThrottleError::InvalidLimit {
                name: name.to_string(),
            });
        }
        if self.interval.is_zero() {
            return Err(ThrottleError::InvalidInterval {
                name: name.to_string(),
            });
        }
        if self.interval > MAX_THROTTLE_INTERVAL {
            return Err(ThrottleError::IntervalTooLong {
                name: name.to_string(),
                max_ms: MAX_THROTTLE_INTERVAL.as_millis(),
            });
        }
        Ok(())
    }
}

/// Throttler construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottleError {
    /// Limit must be positive.
    #[error("Throttler {name}: limit must be positive")]
    InvalidLimit {
        /// Throttler name.
        name: String,
    },

    /// Interval must be non-zero.
    #[error("Throttler {name}: interval must be positive")]
    InvalidInterval {
        /// Throttler name.
        name: String,
    },

    /// Interval beyond the supported maximum.
    #[error("Throttler {name}: interval must not exceed {max_ms}ms")]
    IntervalTooLong {
        /// Throttler name.
        name: String,
        /// Largest accepted interval.
        max_ms: u128,
    },
}

/// Point-in-time view of a throttler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlerStats {
    /// Messages waiting for a voucher.
    pub queue_len: usize,
    /// Vouchers available right now.
    pub vouchers: usize,
    /// Messages released since start.
    pub released: u64,
    /// Whether the refill timer is armed.
    pub is_active: bool,
}

enum ThrottlerMessage<T> {
    Enqueue(T),
    Stats(oneshot::Sender<ThrottlerStats>),
}

/// Handle to a running throttler.
pub struct ThrottlerHandle<T> {
    name: Arc<str>,
    sender: mpsc::Sender<ThrottlerMessage<T>>,
    shutdown: CancellationToken,
}

impl<T> Clone for ThrottlerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            sender: self.sender.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T: Send + 'static> ThrottlerHandle<T> {
    /// Get the throttler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a message for release.
    ///
    /// # Errors
    ///
    /// Returns error if the throttler has stopped.
    pub async fn enqueue(&self, message: T) -> Result<(), SendError> {
        self.sender
            .send(ThrottlerMessage::Enqueue(message))
            .await
            .map_err(|_| SendError::closed(self.name.as_ref()))
    }

    /// Query queue length and vouchers.
    ///
    /// # Errors
    ///
    /// Returns error if the throttler has stopped.
    pub async fn stats(&self) -> Result<ThrottlerStats, SendError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(ThrottlerMessage::Stats(reply))
            .await
            .map_err(|_| SendError::closed(self.name.as_ref()))?;
        rx.await.map_err(|_| SendError::closed(self.name.as_ref()))
    }

    /// Stop the throttler. Queued messages are discarded.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Returns true once `stop` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[async_trait]
impl<T: Send + 'static> Endpoint<T> for ThrottlerHandle<T> {
    async fn deliver(&self, message: T) -> Result<(), SendError> {
        self.enqueue(message).await
    }
}

/// Token-bucket gate in front of one downstream endpoint.
pub struct Throttler<T, D> {
    name: Arc<str>,
    config: ThrottleConfig,
    downstream: D,
    queue: VecDeque<T>,
    spent: VecDeque<Instant>,
    released: u64,
}

impl<T, D> Throttler<T, D>
where
    T: Send + 'static,
    D: Endpoint<T> + 'static,
{
    /// Create a throttler.
    ///
    /// # Errors
    ///
    /// Returns error if the limit is zero or the interval is zero.
    pub fn new(
        name: impl Into<String>,
        config: ThrottleConfig,
        downstream: D,
    ) -> Result<Self, ThrottleError> {
        let name: String = name.into();
        config.validate(&name)?;

        Ok(Self {
            name: Arc::from(name),
            config,
            downstream,
            queue: VecDeque::new(),
            spent: VecDeque::with_capacity(config.limit),
            released: 0,
        })
    }

    /// Spawn the throttler on the current runtime.
    #[must_use]
    pub fn start(self) -> ThrottlerHandle<T> {
        self.start_with_capacity(DEFAULT_THROTTLER_MAILBOX)
    }

    /// Spawn the throttler with a specific mailbox capacity.
    #[must_use]
    pub fn start_with_capacity(self, capacity: usize) -> ThrottlerHandle<T> {
        let (sender, inbox) = mpsc::channel(capacity.max(1));
        let shutdown = CancellationToken::new();
        let handle = ThrottlerHandle {
            name: Arc::clone(&self.name),
            sender,
            shutdown: shutdown.clone(),
        };

        tracing::info!(
            throttler = %self.name,
            limit = self.config.limit,
            interval_ms = self.config.interval.as_millis(),
            "Starting throttler"
        );
        tokio::spawn(self.run(inbox, shutdown));
        handle
    }

    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<ThrottlerMessage<T>>,
        shutdown: CancellationToken,
    ) {
        loop {
            let refill_at = self.next_refill();

            tokio::select! {
                () = shutdown.cancelled() => {
                    if !self.queue.is_empty() {
                        tracing::warn!(
                            throttler = %self.name,
                            queued = self.queue.len(),
                            "Throttler stopped with queued messages"
                        );
                    }
                    break;
                }
                message = inbox.recv() => match message {
                    Some(ThrottlerMessage::Enqueue(message)) => {
                        self.queue.push_back(message);
                        if self.drain().await.is_err() {
                            break;
                        }
                    }
                    Some(ThrottlerMessage::Stats(reply)) => {
                        reply.send(self.stats()).ok();
                    }
                    None => break,
                },
                () = tokio::time::sleep_until(refill_at.unwrap_or_else(Instant::now)),
                    if refill_at.is_some() =>
                {
                    if self.drain().await.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(throttler = %self.name, released = self.released, "Throttler stopped");
    }

    /// Release queued messages while vouchers remain.
    ///
    /// A voucher is stamped when its delivery completes. If the downstream
    /// held a delivery back, every voucher spent before it is re-dated to
    /// that moment, since those messages may only just have been consumed.
    async fn drain(&mut self) -> Result<(), SendError> {
        self.reclaim(Instant::now());

        while self.spent.len() < self.config.limit {
            let Some(message) = self.queue.pop_front() else {
                break;
            };

            let started = Instant::now();
            if let Err(e) = self.downstream.deliver(message).await {
                tracing::error!(
                    throttler = %self.name,
                    error = %e,
                    queued = self.queue.len(),
                    "Downstream closed, stopping throttler"
                );
                return Err(e);
            }

            let delivered_at = Instant::now();
            if delivered_at > started {
                for spent_at in &mut self.spent {
                    *spent_at = delivered_at;
                }
            }
            self.spent.push_back(delivered_at);
            self.released += 1;
            record_throttle_released(&self.name);
        }

        if !self.queue.is_empty() {
            tracing::trace!(
                throttler = %self.name,
                queued = self.queue.len(),
                "Vouchers exhausted, waiting for refill"
            );
        }
        update_throttle_queue_depth(&self.name, self.queue.len());
        Ok(())
    }

    /// Return vouchers spent at least one interval ago.
    fn reclaim(&mut self, now: Instant) {
        while self
            .spent
            .front()
            .is_some_and(|spent_at| *spent_at + self.config.interval <= now)
        {
            self.spent.pop_front();
        }
    }

    /// When the next voucher returns, if anything is waiting for one.
    fn next_refill(&self) -> Option<Instant> {
        if self.queue.is_empty() {
            return None;
        }
        self.spent
            .front()
            .map(|spent_at| *spent_at + self.config.interval)
    }

    fn stats(&mut self) -> ThrottlerStats {
        self.reclaim(Instant::now());
        ThrottlerStats {
            queue_len: self.queue.len(),
            vouchers: self.config.limit - self.spent.len(),
            released: self.released,
            is_active: !self.queue.is_empty(),
        }
    }
}
