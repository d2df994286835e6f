use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

/// Emitted once per committed transition, after the write. A claim or a
/// payment callback changes assignment or payment state without moving the
/// order, so `from_status == to_status` there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub order_id: Uuid,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub audience: Vec<Uuid>,
}

impl Notification {
    pub fn for_transition(order: &Order, from_status: OrderStatus) -> Self {
        let audience = [
            Some(order.customer_ref),
            order.laboratory_ref,
            order.courier_ref,
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            order_id: order.id,
            from_status,
            to_status: order.status,
            audience,
        }
    }
}

/// Fire-and-forget seam to the external notification collaborator. Delivery
/// and retry are the subscriber's problem; a dispatch with no listeners must
/// never fail or roll back the transition that produced it.
#[derive(Clone)]
pub struct Dispatcher {
    tx: broadcast::Sender<Notification>,
}

impl Dispatcher {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn dispatch(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("no notification subscribers connected");
        }
    }
}
