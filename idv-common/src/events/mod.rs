//! Event types for IDV event system
//!
//! Provides shared event definitions and EventBus for all IDV services.

mod verification_types;

pub use verification_types::{OutcomeCounts, PipelinePhase, VerificationOutcome};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// IDV event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
/// Every event carries the session `generation` so subscribers can ignore
/// events from a session that has since been replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IdvEvent {
    /// A new identity became active and its candidates were ranked
    ///
    /// Triggers:
    /// - SSE: Reset progress indicators and pass/fail badges
    SessionActivated {
        session_id: Uuid,
        generation: u64,
        identity_index: usize,
        candidate_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Face comparison request issued for one ranked candidate
    VerificationStarted {
        session_id: Uuid,
        generation: u64,
        /// Position in the ranked list
        position: usize,
        /// Index in the original ingestion order
        original_index: usize,
        /// Attempt number, starting at 1
        attempt: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Terminal outcome recorded for one ranked candidate
    ///
    /// Triggers:
    /// - SSE: Update the candidate badge and the "N of M checked" counter
    VerificationCompleted {
        session_id: Uuid,
        generation: u64,
        position: usize,
        original_index: usize,
        outcome: VerificationOutcome,
        checked: usize,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every candidate of the session has a terminal outcome
    SessionDrained {
        session_id: Uuid,
        generation: u64,
        counts: OutcomeCounts,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A completion arrived for a session that was already replaced
    ///
    /// Diagnostic only; never shown to the operator.
    StaleCompletionDropped {
        generation: u64,
        current_generation: Option<u64>,
        position: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl IdvEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            IdvEvent::SessionActivated { .. } => "SessionActivated",
            IdvEvent::VerificationStarted { .. } => "VerificationStarted",
            IdvEvent::VerificationCompleted { .. } => "VerificationCompleted",
            IdvEvent::SessionDrained { .. } => "SessionDrained",
            IdvEvent::StaleCompletionDropped { .. } => "StaleCompletionDropped",
        }
    }

    /// Whether the operator UI should see this event
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, IdvEvent::StaleCompletionDropped { .. })
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use idv_common::events::{EventBus, IdvEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(IdvEvent::SessionActivated {
///     session_id: uuid::Uuid::new_v4(),
///     generation: 1,
///     identity_index: 0,
///     candidate_count: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IdvEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<IdvEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: IdvEvent) -> Result<usize, broadcast::error::SendError<IdvEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IdvEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drained_event() -> IdvEvent {
        IdvEvent::SessionDrained {
            session_id: Uuid::new_v4(),
            generation: 4,
            counts: OutcomeCounts { passed: 1, failed: 0, unavailable: 1 },
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert!(bus.emit(drained_event()).is_err());
        // Lossy variant must not panic
        bus.emit_lossy(drained_event());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.capacity(), 10);

        bus.emit(drained_event()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "SessionDrained");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(drained_event()).unwrap();
        assert_eq!(json["type"], "SessionDrained");
        assert_eq!(json["generation"], 4);
        assert_eq!(json["counts"]["unavailable"], 1);
    }

    #[test]
    fn test_stale_completion_not_user_visible() {
        let event = IdvEvent::StaleCompletionDropped {
            generation: 1,
            current_generation: Some(2),
            position: 0,
            timestamp: chrono::Utc::now(),
        };
        assert!(!event.is_user_visible());
        assert!(drained_event().is_user_visible());
    }
}
