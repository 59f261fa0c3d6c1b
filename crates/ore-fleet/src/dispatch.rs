// ABOUTME: Routes decoded worker messages to their handlers.
// ABOUTME: Started and landed events feed the shared timestamp tracker.

use ore_fleet_core::{FleetError, LandedTiming, ProtocolMessage, TimestampTracker};
use std::sync::Arc;

/// What handling a message produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Started { again: bool },
    Landed(LandedTiming),
    FailedTransaction,
}

#[derive(Debug, Clone)]
pub struct MessageDispatcher {
    tracker: Arc<TimestampTracker>,
}

impl MessageDispatcher {
    pub fn new(tracker: Arc<TimestampTracker>) -> Self {
        Self { tracker }
    }

    pub fn route(&self, worker: &str, message: &ProtocolMessage) -> Result<Dispatched, FleetError> {
        match message {
            ProtocolMessage::Started => Ok(Dispatched::Started {
                again: self.tracker.record_start(worker),
            }),
            ProtocolMessage::LandedMineTransaction => {
                self.tracker.record_landed(worker).map(Dispatched::Landed)
            }
            ProtocolMessage::FailedTransaction { error } => {
                // Reserved for alerting on repeated failures.
                tracing::debug!(worker = %worker, error = %error, "Failed transaction");
                Ok(Dispatched::FailedTransaction)
            }
        }
    }
}

/// The `messages.log` entry for a decoded message.
pub fn render(worker: &str, message: &ProtocolMessage) -> String {
    format!("{}: {}", worker, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_started_records_start() {
        let tracker = Arc::new(TimestampTracker::new());
        let dispatcher = MessageDispatcher::new(tracker.clone());

        assert_eq!(
            dispatcher.route("w1", &ProtocolMessage::Started).unwrap(),
            Dispatched::Started { again: false }
        );
        assert!(tracker.started_at("w1").is_some());
        assert_eq!(
            dispatcher.route("w1", &ProtocolMessage::Started).unwrap(),
            Dispatched::Started { again: true }
        );
    }

    #[test]
    fn test_route_landed_records_landing() {
        let tracker = Arc::new(TimestampTracker::new());
        let dispatcher = MessageDispatcher::new(tracker.clone());
        dispatcher.route("w1", &ProtocolMessage::Started).unwrap();

        let result = dispatcher
            .route("w1", &ProtocolMessage::LandedMineTransaction)
            .unwrap();
        assert!(matches!(result, Dispatched::Landed(LandedTiming::Startup(_))));
        assert!(tracker.last_landed_at("w1").is_some());
    }

    #[test]
    fn test_route_landed_without_start_fails() {
        let dispatcher = MessageDispatcher::new(Arc::new(TimestampTracker::new()));
        let err = dispatcher
            .route("w1", &ProtocolMessage::LandedMineTransaction)
            .unwrap_err();
        assert!(matches!(err, FleetError::LandedWithoutStart { .. }));
    }

    #[test]
    fn test_route_failed_transaction_leaves_tracker_alone() {
        let tracker = Arc::new(TimestampTracker::new());
        let dispatcher = MessageDispatcher::new(tracker.clone());

        let message = ProtocolMessage::FailedTransaction {
            error: "blockhash expired".to_string(),
        };
        assert_eq!(
            dispatcher.route("w1", &message).unwrap(),
            Dispatched::FailedTransaction
        );
        assert_eq!(tracker.started_at("w1"), None);
        assert_eq!(tracker.last_landed_at("w1"), None);
    }

    #[test]
    fn test_render_prefixes_worker_name() {
        assert_eq!(
            render("id_keypair_0", &ProtocolMessage::LandedMineTransaction),
            "id_keypair_0: landed mine transaction"
        );
        assert_eq!(
            render(
                "id_keypair_1",
                &ProtocolMessage::FailedTransaction {
                    error: "x".to_string()
                }
            ),
            "id_keypair_1: failed transaction: x"
        );
    }
}
