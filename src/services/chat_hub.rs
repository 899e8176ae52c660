//! Chat hub
//!
//! In-process fan-out of chat events to connected WebSockets. Every event
//! carries its recipients; each socket keeps only what is addressed to it.

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::message_dto::ChatEvent;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct Envelope {
    pub recipients: Vec<Uuid>,
    pub event: ChatEvent,
}

impl Envelope {
    pub fn is_for(&self, user_id: Uuid) -> bool {
        self.recipients.contains(&user_id)
    }
}

#[derive(Clone)]
pub struct ChatHub {
    sender: broadcast::Sender<Envelope>,
}

impl ChatHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Nobody listening is not an error.
    pub fn publish(&self, recipients: Vec<Uuid>, event: ChatEvent) {
        let mut recipients = recipients;
        recipients.sort();
        recipients.dedup();
        let _ = self.sender.send(Envelope { recipients, event });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_addressed() {
        let hub = ChatHub::new();
        let mut rx = hub.subscribe();
        let customer = Uuid::new_v4();
        let staff = Uuid::new_v4();

        hub.publish(
            vec![customer, staff, customer],
            ChatEvent::Assigned { customer_id: customer, staff_id: staff },
        );

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.recipients.len(), 2);
        assert!(envelope.is_for(customer));
        assert!(!envelope.is_for(Uuid::new_v4()));
    }

    #[test]
    fn test_publish_without_subscribers() {
        ChatHub::new().publish(vec![], ChatEvent::Error { message: "x".into() });
    }
}
