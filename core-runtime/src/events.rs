//! # Event Bus System
//!
//! Provides change notifications for the offline cache using `tokio::sync::broadcast`.
//! UI surfaces subscribe here to refresh a "cached tracks" listing without polling.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchy, one sub-enum per domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐     subscribe    ┌────────────┐
//! │ OfflineCache ├──────────────>│ EventBus  ├─────────────────>│ Subscriber │
//! └──────────────┘               │ (broadcast│                  └────────────┘
//!                                │  channel) │     subscribe    ┌────────────┐
//!                                │           ├─────────────────>│ Subscriber │
//!                                └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Cache(CacheEvent::StateChanged)).ok();
//!
//! let received = subscriber.recv().await.unwrap();
//! assert_eq!(received, CoreEvent::Cache(CacheEvent::StateChanged));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; for a "state changed" signal, a lagged subscriber should simply
//!   refresh once.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! `emit` fails only when nobody is subscribed. Publishers treat that as a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published and received through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Offline cache events
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Cache(CacheEvent::OverBudget { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::StateChanged) => EventSeverity::Info,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Cache Events
// ============================================================================

/// Offline cache events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// The set of cached tracks changed (admission, eviction, removal or clear).
    StateChanged,

    /// An admission left the cache above its configured maximum.
    ///
    /// Only happens when a single track is larger than everything that could
    /// be evicted to make room for it.
    OverBudget { current_bytes: u64, max_bytes: u64 },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::StateChanged => "Cached tracks changed",
            CacheEvent::OverBudget { .. } => "Cache is over its size budget",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning an `EventBus` is cheap; clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers falling behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventSeverity, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let warnings = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
