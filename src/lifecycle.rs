use crate::error::AppError;
use crate::models::actor::ActorRole;
use crate::models::order::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Confirm,
    AssignCourier,
    Accept,
    Reject,
    StartDelivery,
    MarkDelivered,
    Cancel,
}

impl OrderAction {
    pub const ALL: [OrderAction; 7] = [
        OrderAction::Confirm,
        OrderAction::AssignCourier,
        OrderAction::Accept,
        OrderAction::Reject,
        OrderAction::StartDelivery,
        OrderAction::MarkDelivered,
        OrderAction::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Confirm => "confirm",
            OrderAction::AssignCourier => "assign_courier",
            OrderAction::Accept => "accept",
            OrderAction::Reject => "reject",
            OrderAction::StartDelivery => "start_delivery",
            OrderAction::MarkDelivered => "mark_delivered",
            OrderAction::Cancel => "cancel",
        }
    }
}

fn role_may_perform(role: ActorRole, action: OrderAction) -> bool {
    match action {
        OrderAction::Confirm | OrderAction::AssignCourier => {
            matches!(role, ActorRole::Laboratory | ActorRole::Admin)
        }
        OrderAction::Accept
        | OrderAction::Reject
        | OrderAction::StartDelivery
        | OrderAction::MarkDelivered => matches!(role, ActorRole::Courier),
        OrderAction::Cancel => matches!(role, ActorRole::Customer),
    }
}

/// Maps (current status, actor role, action) to the next status. Pure and
/// total: authorization is checked before reachability, so a role that may
/// never perform an action is told `NotAuthorized` regardless of status, and
/// every (status, action) pair outside the table is `InvalidTransition`.
pub fn validate(
    status: OrderStatus,
    role: ActorRole,
    action: OrderAction,
) -> Result<OrderStatus, AppError> {
    if !role_may_perform(role, action) {
        return Err(AppError::NotAuthorized(format!(
            "role {:?} may not {}",
            role,
            action.as_str()
        )));
    }

    let next = match (status, action) {
        (OrderStatus::Pending, OrderAction::Confirm) => OrderStatus::Confirmed,
        (OrderStatus::Pending, OrderAction::Cancel) => OrderStatus::Cancelled,
        (OrderStatus::Confirmed, OrderAction::AssignCourier) => OrderStatus::AssignedToDelivery,
        (OrderStatus::Confirmed, OrderAction::Cancel) => OrderStatus::Cancelled,
        (OrderStatus::AssignedToDelivery, OrderAction::Accept) => OrderStatus::DeliveryAccepted,
        (OrderStatus::AssignedToDelivery, OrderAction::Reject) => OrderStatus::DeliveryRejected,
        (OrderStatus::DeliveryRejected, OrderAction::AssignCourier) => {
            OrderStatus::AssignedToDelivery
        }
        (OrderStatus::DeliveryAccepted, OrderAction::StartDelivery) => OrderStatus::OutForDelivery,
        (OrderStatus::OutForDelivery, OrderAction::MarkDelivered) => OrderStatus::Delivered,
        _ => {
            return Err(AppError::InvalidTransition(format!(
                "cannot {} from {:?}",
                action.as_str(),
                status
            )));
        }
    };

    Ok(next)
}

/// True when `to` is a legal successor of `from` for some authorized role.
/// A repeated status is allowed: a claim appends a history entry without
/// moving the order.
pub fn is_legal_edge(from: OrderStatus, to: OrderStatus) -> bool {
    if from == to {
        return true;
    }

    ActorRole::ALL.iter().any(|role| {
        OrderAction::ALL
            .iter()
            .any(|action| validate(from, *role, *action) == Ok(to))
    })
}
