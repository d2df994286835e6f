use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::ActorRole;
use crate::models::order::{Order, OrderStatus};
use crate::store::OrderStore;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilters {
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub assigned_only: bool,
    #[serde(default)]
    pub unassigned_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

/// Role-scoped listing over the store. Visibility:
/// customers see their own orders, couriers the orders assigned to them,
/// laboratories the orders they claimed (or the assignment pool when
/// `unassigned_only` is set), admin sees everything. Ordering is
/// `created_at` descending with ties broken by id, so pages are stable
/// within a query.
pub fn list_orders(
    store: &OrderStore,
    actor_role: ActorRole,
    actor_ref: Uuid,
    filters: &OrderFilters,
    page: usize,
    limit: usize,
) -> Result<OrderPage, AppError> {
    if filters.assigned_only && filters.unassigned_only {
        return Err(AppError::BadRequest(
            "assigned_only and unassigned_only are mutually exclusive".to_string(),
        ));
    }
    if page == 0 {
        return Err(AppError::BadRequest("page is 1-based".to_string()));
    }
    if limit == 0 {
        return Err(AppError::BadRequest("limit must be > 0".to_string()));
    }

    let mut orders: Vec<Order> = store
        .snapshot()
        .into_iter()
        .filter(|order| visible_to(order, actor_role, actor_ref, filters))
        .filter(|order| filters.status.is_none_or(|status| order.status == status))
        .filter(|order| !filters.assigned_only || !order.needs_assignment)
        .filter(|order| !filters.unassigned_only || order.needs_assignment)
        .collect();

    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

    let total_count = orders.len();
    let total_pages = total_count.div_ceil(limit);
    let offset = (page - 1) * limit;
    let orders = orders.into_iter().skip(offset).take(limit).collect();

    Ok(OrderPage {
        orders,
        pagination: Pagination {
            current_page: page,
            total_pages,
            total_count,
            has_next_page: page < total_pages,
            has_prev_page: page > 1 && total_count > 0,
        },
    })
}

/// Role-scoped single fetch: same visibility as the listing, with
/// `NotFound` for orders the actor may not see so their existence leaks
/// nothing.
pub fn get_order(
    store: &OrderStore,
    actor_role: ActorRole,
    actor_ref: Uuid,
    order_id: Uuid,
) -> Result<Order, AppError> {
    let order = store.get(order_id)?;
    let readable = match actor_role {
        ActorRole::Admin => true,
        ActorRole::Customer => order.customer_ref == actor_ref,
        ActorRole::Laboratory => {
            order.laboratory_ref == Some(actor_ref) || order.in_assignment_pool()
        }
        ActorRole::Courier => order.courier_ref == Some(actor_ref),
    };

    if !readable {
        return Err(AppError::NotFound(format!("order {order_id} not found")));
    }
    Ok(order)
}

fn visible_to(order: &Order, actor_role: ActorRole, actor_ref: Uuid, filters: &OrderFilters) -> bool {
    match actor_role {
        ActorRole::Admin => true,
        ActorRole::Customer => order.customer_ref == actor_ref,
        ActorRole::Courier => order.courier_ref == Some(actor_ref),
        ActorRole::Laboratory => {
            if filters.unassigned_only {
                order.in_assignment_pool()
            } else {
                order.laboratory_ref == Some(actor_ref)
            }
        }
    }
}
