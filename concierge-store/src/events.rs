use concierge_shared::models::events::ConciergeEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// In-process fan-out of domain events to SSE subscribers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConciergeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: ConciergeEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => debug!("Published {} to {} subscribers", name, receivers),
            Err(_) => debug!("Published {} with no subscribers", name),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConciergeEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_shared::models::events::SessionStateChangedEvent;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let session_id = Uuid::new_v4();

        bus.publish(ConciergeEvent::SessionStateChanged(SessionStateChangedEvent {
            session_id,
            from: "greeting".to_string(),
            to: "viewing".to_string(),
            timestamp: 0,
        }));

        let received = rx.recv().await.unwrap();
        assert!(received.concerns_session(session_id));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(ConciergeEvent::SessionStateChanged(SessionStateChangedEvent {
            session_id: Uuid::new_v4(),
            from: "viewing".to_string(),
            to: "changing".to_string(),
            timestamp: 0,
        }));
    }
}
