use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{ActionType, ItemKind, SaleCategory};

/// Events emitted by services so the application shell (or anything else
/// listening) can react without being wired into each service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Sale events
    SaleRecorded {
        sale_id: Uuid,
        category: SaleCategory,
        amount: Decimal,
        quantity: i32,
    },
    SaleCompensated {
        sale_id: Uuid,
        reason: String,
    },

    // Inventory events
    InventoryAdjusted {
        kind: ItemKind,
        item_id: i64,
        old_quantity: i32,
        new_quantity: i32,
    },
    InventoryRefetched {
        kind: ItemKind,
    },

    // Customer events
    CustomerCreated(i64),
    CustomerUpdated(i64),
    CustomerDeleted(i64),

    // User events
    UserCreated(i64),
    UserUpdated(i64),
    UserDeleted(i64),

    // Audit events
    ActivityRecorded {
        entry_id: i64,
        action: ActionType,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates the application event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_through_the_channel() {
        let (sender, mut receiver) = channel(4);
        sender
            .send(Event::CustomerCreated(11))
            .await
            .expect("send succeeds");
        match receiver.recv().await {
            Some(Event::CustomerCreated(id)) => assert_eq!(id, 11),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_once_the_receiver_is_gone() {
        let (sender, receiver) = channel(1);
        drop(receiver);
        assert!(sender.send(Event::UserDeleted(3)).await.is_err());
    }
}
