use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::actor::ActorRole;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderKind {
    Product,
    Prescription,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    AssignedToDelivery,
    DeliveryAccepted,
    OutForDelivery,
    Delivered,
    DeliveryRejected,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::AssignedToDelivery,
        OrderStatus::DeliveryAccepted,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::DeliveryRejected,
        OrderStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_ref: Uuid,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub actor_ref: Uuid,
    pub actor_role: ActorRole,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_ref: Uuid,
    pub laboratory_ref: Option<Uuid>,
    pub courier_ref: Option<Uuid>,
    pub kind: OrderKind,
    pub products: Vec<OrderItem>,
    pub prescription_ref: Option<String>,
    pub total_price: f64,
    pub is_paid: bool,
    pub cod: bool,
    pub needs_assignment: bool,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    pub rejection_reason: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Appends a history entry for the given actor and moves the order to
    /// `status`. Timestamps are clamped against the previous entry so the
    /// audit trail stays non-decreasing even if the wall clock steps back
    /// between writes.
    pub fn record(&mut self, status: OrderStatus, actor_ref: Uuid, actor_role: ActorRole) {
        let mut timestamp = Utc::now();
        if let Some(last) = self.status_history.last() {
            if timestamp < last.timestamp {
                timestamp = last.timestamp;
            }
        }

        self.status_history.push(StatusEntry {
            status,
            actor_ref,
            actor_role,
            timestamp,
        });
        self.status = status;
    }

    /// True while the order sits in the assignment pool: unclaimed and in a
    /// status a laboratory may still pick it up from.
    pub fn in_assignment_pool(&self) -> bool {
        self.needs_assignment
            && self.laboratory_ref.is_none()
            && matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}
