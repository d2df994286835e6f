use serde::Serialize;
use uuid::Uuid;

use crate::engine::commit;
use crate::error::AppError;
use crate::lifecycle::{OrderAction, validate};
use crate::models::actor::ActorRole;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Outcome of `mark_delivered`. `collect_cash` instructs the courier to
/// collect the full price on the doorstep for COD orders; it is advice to
/// the caller, not order state.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub order: Order,
    pub collect_cash: Option<f64>,
}

pub fn accept_delivery(
    state: &AppState,
    order_id: Uuid,
    courier_ref: Uuid,
) -> Result<Order, AppError> {
    let mut from_status = OrderStatus::Pending;
    let result = state.orders.update(order_id, |order| {
        from_status = order.status;
        let next = validate(order.status, ActorRole::Courier, OrderAction::Accept)?;
        require_assigned_courier(order, courier_ref)?;

        order.courier_ref = Some(courier_ref);
        order.record(next, courier_ref, ActorRole::Courier);
        Ok(())
    });

    commit(state, OrderAction::Accept, from_status, result)
}

/// Rejection frees the courier slot and parks the order in
/// `delivery_rejected`, where laboratory or admin can assign a new courier.
pub fn reject_delivery(
    state: &AppState,
    order_id: Uuid,
    courier_ref: Uuid,
    reason: String,
) -> Result<Order, AppError> {
    if reason.trim().is_empty() {
        return Err(AppError::BadRequest("rejection reason cannot be empty".to_string()));
    }

    let mut from_status = OrderStatus::Pending;
    let result = state.orders.update(order_id, |order| {
        from_status = order.status;
        let next = validate(order.status, ActorRole::Courier, OrderAction::Reject)?;
        require_assigned_courier(order, courier_ref)?;

        order.courier_ref = None;
        order.rejection_reason = Some(reason);
        order.record(next, courier_ref, ActorRole::Courier);
        Ok(())
    });

    commit(state, OrderAction::Reject, from_status, result)
}

pub fn start_delivery(
    state: &AppState,
    order_id: Uuid,
    courier_ref: Uuid,
) -> Result<Order, AppError> {
    let mut from_status = OrderStatus::Pending;
    let result = state.orders.update(order_id, |order| {
        from_status = order.status;
        let next = validate(order.status, ActorRole::Courier, OrderAction::StartDelivery)?;
        require_assigned_courier(order, courier_ref)?;

        order.record(next, courier_ref, ActorRole::Courier);
        Ok(())
    });

    commit(state, OrderAction::StartDelivery, from_status, result)
}

pub fn mark_delivered(
    state: &AppState,
    order_id: Uuid,
    courier_ref: Uuid,
) -> Result<DeliveryReceipt, AppError> {
    let mut from_status = OrderStatus::Pending;
    let result = state.orders.update(order_id, |order| {
        from_status = order.status;
        let next = validate(order.status, ActorRole::Courier, OrderAction::MarkDelivered)?;
        require_assigned_courier(order, courier_ref)?;

        order.record(next, courier_ref, ActorRole::Courier);
        Ok(())
    });

    let order = commit(state, OrderAction::MarkDelivered, from_status, result)?;

    state
        .metrics
        .orders_delivered_total
        .with_label_values(&[if order.cod { "true" } else { "false" }])
        .inc();

    let collect_cash = order.cod.then_some(order.total_price);
    Ok(DeliveryReceipt { order, collect_cash })
}

fn require_assigned_courier(order: &Order, courier_ref: Uuid) -> Result<(), AppError> {
    if order.courier_ref != Some(courier_ref) {
        return Err(AppError::NotAuthorized(
            "order is assigned to a different courier".to_string(),
        ));
    }
    Ok(())
}
