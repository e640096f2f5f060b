use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::OrderStatus;

/// Domain events emitted by the services after a state change commits.
/// Consumers are informational (audit log, metrics); event delivery is not
/// part of any correctness invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled {
        order_id: Uuid,
    },
    OrderDisputed {
        order_id: Uuid,
    },
    InventoryReserved {
        product_id: Uuid,
        quantity: i32,
        remaining: i32,
    },
    InventoryRestored {
        product_id: Uuid,
        quantity: i32,
    },
    ReturnRequested {
        return_id: Uuid,
        order_id: Uuid,
    },
    ReturnResolved {
        return_id: Uuid,
        order_id: Uuid,
        approved: bool,
    },
    ShipmentCreated {
        shipment_id: Uuid,
        order_id: Uuid,
        tracking_number: String,
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

    /// Sends an event; a full or closed channel is logged, never escalated.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!(error = %e, "Failed to publish domain event");
        }
    }
}

/// Creates a bounded event channel plus its sender handle.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::InventoryReserved {
                product_id,
                quantity,
                remaining,
            } => {
                info!(%product_id, quantity, remaining, "inventory reserved");
            }
            other => info!(event = ?other, "domain event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_does_not_error_when_receiver_dropped() {
        let (sender, rx) = channel(4);
        drop(rx);
        // Must not panic or return an error to the caller.
        sender
            .send(Event::OrderCancelled {
                order_id: Uuid::new_v4(),
            })
            .await;
    }
}
