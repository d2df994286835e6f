use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::commit;
use crate::error::AppError;
use crate::lifecycle::{OrderAction, validate};
use crate::models::actor::ActorRole;
use crate::models::order::{Order, OrderItem, OrderKind, OrderStatus};
use crate::notify::Notification;
use crate::state::AppState;

pub struct CreateOrder {
    pub customer_ref: Uuid,
    pub kind: OrderKind,
    pub products: Vec<OrderItem>,
    pub prescription_ref: Option<String>,
    pub laboratory_ref: Option<Uuid>,
    pub cod: bool,
}

/// Product orders are placed against a specific laboratory's catalog and
/// price as the item sum at creation. Prescription orders are born unpriced
/// and unclaimed; they enter the assignment pool.
pub fn create_order(state: &AppState, request: CreateOrder) -> Result<Order, AppError> {
    let (products, prescription_ref, laboratory_ref, total_price) = match request.kind {
        OrderKind::Product => {
            if request.products.is_empty() {
                return Err(AppError::BadRequest(
                    "product order requires at least one item".to_string(),
                ));
            }
            if request.prescription_ref.is_some() {
                return Err(AppError::BadRequest(
                    "product order cannot carry a prescription".to_string(),
                ));
            }
            let laboratory_ref = request.laboratory_ref.ok_or_else(|| {
                AppError::BadRequest("product order requires a laboratory".to_string())
            })?;
            if request.products.iter().any(|item| item.quantity == 0) {
                return Err(AppError::BadRequest("item quantity must be > 0".to_string()));
            }
            if request.products.iter().any(|item| item.unit_price < 0.0) {
                return Err(AppError::BadRequest("item price cannot be negative".to_string()));
            }

            let total = request
                .products
                .iter()
                .map(|item| item.unit_price * f64::from(item.quantity))
                .sum();
            (request.products, None, Some(laboratory_ref), total)
        }
        OrderKind::Prescription => {
            let prescription_ref = request.prescription_ref.ok_or_else(|| {
                AppError::BadRequest("prescription order requires a prescription".to_string())
            })?;
            if !request.products.is_empty() {
                return Err(AppError::BadRequest(
                    "prescription order cannot carry products".to_string(),
                ));
            }
            if request.laboratory_ref.is_some() {
                return Err(AppError::BadRequest(
                    "prescription orders are claimed, not pre-assigned".to_string(),
                ));
            }
            (Vec::new(), Some(prescription_ref), None, 0.0)
        }
    };

    let mut order = Order {
        id: Uuid::new_v4(),
        customer_ref: request.customer_ref,
        laboratory_ref,
        courier_ref: None,
        kind: request.kind,
        products,
        prescription_ref,
        total_price,
        is_paid: false,
        cod: request.cod,
        needs_assignment: laboratory_ref.is_none(),
        status: OrderStatus::Pending,
        status_history: Vec::new(),
        rejection_reason: None,
        version: 0,
        created_at: Utc::now(),
    };
    order.record(OrderStatus::Pending, order.customer_ref, ActorRole::Customer);

    state.orders.insert(order.clone());
    state
        .metrics
        .orders_created_total
        .with_label_values(&[match order.kind {
            OrderKind::Product => "product",
            OrderKind::Prescription => "prescription",
        }])
        .inc();
    state
        .dispatcher
        .dispatch(Notification::for_transition(&order, OrderStatus::Pending));

    info!(order_id = %order.id, kind = ?order.kind, cod = order.cod, "order created");
    Ok(order)
}

/// Laboratory (owner) or admin confirmation. For prescription orders the
/// laboratory prices the order here; `total_price` is ignored for product
/// orders, which priced at creation.
pub fn confirm(
    state: &AppState,
    order_id: Uuid,
    actor_ref: Uuid,
    actor_role: ActorRole,
    total_price: Option<f64>,
) -> Result<Order, AppError> {
    let mut from_status = OrderStatus::Pending;
    let result = state.orders.update(order_id, |order| {
        from_status = order.status;
        let next = validate(order.status, actor_role, OrderAction::Confirm)?;
        require_laboratory_owner(order, actor_ref, actor_role)?;

        if order.kind == OrderKind::Prescription {
            if let Some(price) = total_price {
                if price < 0.0 {
                    return Err(AppError::BadRequest("price cannot be negative".to_string()));
                }
                order.total_price = price;
            }
        }

        order.record(next, actor_ref, actor_role);
        Ok(())
    });

    commit(state, OrderAction::Confirm, from_status, result)
}

/// Puts a courier on the order, from `confirmed` or `delivery_rejected`.
/// Replaces any previous courier and clears the stale rejection reason.
pub fn assign_courier(
    state: &AppState,
    order_id: Uuid,
    courier_ref: Uuid,
    actor_ref: Uuid,
    actor_role: ActorRole,
) -> Result<Order, AppError> {
    let mut from_status = OrderStatus::Pending;
    let result = state.orders.update(order_id, |order| {
        from_status = order.status;
        let next = validate(order.status, actor_role, OrderAction::AssignCourier)?;
        require_laboratory_owner(order, actor_ref, actor_role)?;

        order.courier_ref = Some(courier_ref);
        order.rejection_reason = None;
        order.record(next, actor_ref, actor_role);
        Ok(())
    });

    commit(state, OrderAction::AssignCourier, from_status, result)
}

/// Customer cancellation, accepted only while `pending` or `confirmed`.
pub fn cancel(state: &AppState, order_id: Uuid, customer_ref: Uuid) -> Result<Order, AppError> {
    let mut from_status = OrderStatus::Pending;
    let result = state.orders.update(order_id, |order| {
        from_status = order.status;
        let next = validate(order.status, ActorRole::Customer, OrderAction::Cancel)?;
        if order.customer_ref != customer_ref {
            return Err(AppError::NotAuthorized(
                "only the ordering customer may cancel".to_string(),
            ));
        }

        order.record(next, customer_ref, ActorRole::Customer);
        Ok(())
    });

    commit(state, OrderAction::Cancel, from_status, result)
}

/// Admin unblock for an order no laboratory has picked up. Same eligibility
/// as a claim but without the caller-side version precondition; the entry
/// guard still serializes it against a racing claim.
pub fn force_assign_laboratory(
    state: &AppState,
    order_id: Uuid,
    laboratory_ref: Uuid,
    admin_ref: Uuid,
    actor_role: ActorRole,
) -> Result<Order, AppError> {
    if actor_role != ActorRole::Admin {
        return Err(AppError::NotAuthorized(
            "only admin may force-assign a laboratory".to_string(),
        ));
    }

    let mut from_status = OrderStatus::Pending;
    let result = state.orders.update(order_id, |order| {
        from_status = order.status;
        if order.laboratory_ref.is_some() {
            return Err(AppError::AlreadyClaimed);
        }
        if !order.in_assignment_pool() {
            return Err(AppError::NotEligible);
        }

        order.laboratory_ref = Some(laboratory_ref);
        order.needs_assignment = false;
        order.record(order.status, admin_ref, ActorRole::Admin);
        Ok(())
    });

    if let Ok(order) = &result {
        info!(order_id = %order.id, laboratory_ref = %laboratory_ref, "laboratory force-assigned");
        state
            .dispatcher
            .dispatch(Notification::for_transition(order, from_status));
    }
    result
}

/// Payment collaborator callback. No status change; the write still goes
/// through the entry guard and bumps the version like any other commit.
pub fn mark_paid(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    let order = state.orders.update(order_id, |order| {
        order.is_paid = true;
        Ok(())
    })?;

    info!(order_id = %order.id, "order marked paid");
    Ok(order)
}

fn require_laboratory_owner(
    order: &Order,
    actor_ref: Uuid,
    actor_role: ActorRole,
) -> Result<(), AppError> {
    if actor_role == ActorRole::Laboratory && order.laboratory_ref != Some(actor_ref) {
        return Err(AppError::NotAuthorized(
            "order belongs to a different laboratory".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{CreateOrder, assign_courier, cancel, confirm, create_order, force_assign_laboratory, mark_paid};
    use crate::config::Config;
    use crate::error::AppError;
    use crate::models::actor::ActorRole;
    use crate::models::order::{OrderItem, OrderKind, OrderStatus};
    use crate::state::AppState;

    fn state() -> AppState {
        AppState::new(&Config::default())
    }

    fn item(unit_price: f64, quantity: u32) -> OrderItem {
        OrderItem {
            product_ref: Uuid::new_v4(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn product_order_prices_at_creation_and_skips_the_pool() {
        let state = state();
        let lab = Uuid::new_v4();

        let order = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Product,
                products: vec![item(100.0, 2), item(300.0, 1)],
                prescription_ref: None,
                laboratory_ref: Some(lab),
                cod: false,
            },
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, 500.0);
        assert!(!order.is_paid);
        assert!(!order.needs_assignment);
        assert_eq!(order.laboratory_ref, Some(lab));
        assert_eq!(order.status_history.len(), 1);
    }

    #[test]
    fn prescription_order_enters_the_pool_unpriced() {
        let state = state();

        let order = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Prescription,
                products: Vec::new(),
                prescription_ref: Some("https://files.example/rx/9".to_string()),
                laboratory_ref: None,
                cod: true,
            },
        )
        .unwrap();

        assert!(order.needs_assignment);
        assert!(order.laboratory_ref.is_none());
        assert_eq!(order.total_price, 0.0);
        assert!(order.in_assignment_pool());
    }

    #[test]
    fn product_order_without_laboratory_is_rejected() {
        let state = state();

        let err = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Product,
                products: vec![item(10.0, 1)],
                prescription_ref: None,
                laboratory_ref: None,
                cod: false,
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn confirm_by_owning_laboratory_prices_prescription() {
        let state = state();
        let order = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Prescription,
                products: Vec::new(),
                prescription_ref: Some("https://files.example/rx/3".to_string()),
                laboratory_ref: None,
                cod: false,
            },
        )
        .unwrap();

        let lab = Uuid::new_v4();
        let claimed =
            crate::engine::claim::claim_order(&state, order.id, lab, order.version).unwrap();

        let confirmed = confirm(&state, order.id, lab, ActorRole::Laboratory, Some(240.0)).unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert_eq!(confirmed.total_price, 240.0);
        assert_eq!(confirmed.version, claimed.version + 1);
    }

    #[test]
    fn confirm_by_non_owning_laboratory_is_not_authorized() {
        let state = state();
        let order = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Product,
                products: vec![item(50.0, 1)],
                prescription_ref: None,
                laboratory_ref: Some(Uuid::new_v4()),
                cod: false,
            },
        )
        .unwrap();

        let err = confirm(&state, order.id, Uuid::new_v4(), ActorRole::Laboratory, None)
            .unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized(_)));
    }

    #[test]
    fn cancel_by_other_customer_is_not_authorized() {
        let state = state();
        let order = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Product,
                products: vec![item(50.0, 1)],
                prescription_ref: None,
                laboratory_ref: Some(Uuid::new_v4()),
                cod: false,
            },
        )
        .unwrap();

        let err = cancel(&state, order.id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized(_)));

        let cancelled = cancel(&state, order.id, order.customer_ref).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }

    #[test]
    fn assign_courier_requires_confirmed_order() {
        let state = state();
        let lab = Uuid::new_v4();
        let order = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Product,
                products: vec![item(50.0, 1)],
                prescription_ref: None,
                laboratory_ref: Some(lab),
                cod: false,
            },
        )
        .unwrap();

        let err = assign_courier(&state, order.id, Uuid::new_v4(), lab, ActorRole::Laboratory)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        confirm(&state, order.id, lab, ActorRole::Laboratory, None).unwrap();
        let courier = Uuid::new_v4();
        let assigned =
            assign_courier(&state, order.id, courier, lab, ActorRole::Laboratory).unwrap();
        assert_eq!(assigned.status, OrderStatus::AssignedToDelivery);
        assert_eq!(assigned.courier_ref, Some(courier));
    }

    #[test]
    fn force_assign_laboratory_is_admin_only() {
        let state = state();
        let order = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Prescription,
                products: Vec::new(),
                prescription_ref: Some("https://files.example/rx/4".to_string()),
                laboratory_ref: None,
                cod: false,
            },
        )
        .unwrap();

        let lab = Uuid::new_v4();
        let err = force_assign_laboratory(&state, order.id, lab, Uuid::new_v4(), ActorRole::Laboratory)
            .unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized(_)));

        let forced =
            force_assign_laboratory(&state, order.id, lab, Uuid::new_v4(), ActorRole::Admin)
                .unwrap();
        assert_eq!(forced.laboratory_ref, Some(lab));
        assert!(!forced.needs_assignment);

        let again =
            force_assign_laboratory(&state, order.id, Uuid::new_v4(), Uuid::new_v4(), ActorRole::Admin)
                .unwrap_err();
        assert_eq!(again, AppError::AlreadyClaimed);
    }

    #[test]
    fn mark_paid_flips_flag_and_bumps_version() {
        let state = state();
        let order = create_order(
            &state,
            CreateOrder {
                customer_ref: Uuid::new_v4(),
                kind: OrderKind::Product,
                products: vec![item(80.0, 1)],
                prescription_ref: None,
                laboratory_ref: Some(Uuid::new_v4()),
                cod: false,
            },
        )
        .unwrap();

        let paid = mark_paid(&state, order.id).unwrap();
        assert!(paid.is_paid);
        assert_eq!(paid.version, order.version + 1);
        assert_eq!(paid.status, OrderStatus::Pending);
    }
}
