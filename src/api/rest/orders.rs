use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::claim::claim_order;
use crate::engine::handoff::{
    DeliveryReceipt, accept_delivery, mark_delivered, reject_delivery, start_delivery,
};
use crate::engine::orders::{
    CreateOrder, assign_courier, cancel, confirm, create_order, force_assign_laboratory, mark_paid,
};
use crate::error::AppError;
use crate::models::actor::ActorRole;
use crate::models::order::{Order, OrderItem, OrderKind, OrderStatus};
use crate::query::{OrderFilters, OrderPage};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create).get(list))
        .route("/orders/:id", get(fetch))
        .route("/orders/:id/claim", post(claim))
        .route("/orders/:id/confirm", post(confirm_order))
        .route("/orders/:id/courier", post(assign))
        .route("/orders/:id/laboratory", post(force_assign))
        .route("/orders/:id/accept", post(accept))
        .route("/orders/:id/reject", post(reject))
        .route("/orders/:id/start", post(start))
        .route("/orders/:id/delivered", post(delivered))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/paid", post(paid))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_ref: Uuid,
    pub kind: OrderKind,
    #[serde(default)]
    pub products: Vec<OrderItem>,
    pub prescription_ref: Option<String>,
    pub laboratory_ref: Option<Uuid>,
    pub cod: bool,
}

#[derive(Deserialize)]
pub struct ClaimRequest {
    pub laboratory_ref: Uuid,
    pub expected_version: u64,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub actor_ref: Uuid,
    pub actor_role: ActorRole,
    pub total_price: Option<f64>,
}

#[derive(Deserialize)]
pub struct AssignCourierRequest {
    pub courier_ref: Uuid,
    pub actor_ref: Uuid,
    pub actor_role: ActorRole,
}

#[derive(Deserialize)]
pub struct ForceAssignRequest {
    pub laboratory_ref: Uuid,
    pub actor_ref: Uuid,
    pub actor_role: ActorRole,
}

#[derive(Deserialize)]
pub struct CourierRequest {
    pub courier_ref: Uuid,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub courier_ref: Uuid,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub customer_ref: Uuid,
}

#[derive(Deserialize)]
pub struct ActorQuery {
    pub actor_role: ActorRole,
    pub actor_ref: Uuid,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub actor_role: ActorRole,
    pub actor_ref: Uuid,
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub assigned_only: bool,
    #[serde(default)]
    pub unassigned_only: bool,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = create_order(
        &state,
        CreateOrder {
            customer_ref: payload.customer_ref,
            kind: payload.kind,
            products: payload.products,
            prescription_ref: payload.prescription_ref,
            laboratory_ref: payload.laboratory_ref,
            cod: payload.cod,
        },
    )?;
    Ok(Json(order))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderPage>, AppError> {
    let filters = OrderFilters {
        status: query.status,
        assigned_only: query.assigned_only,
        unassigned_only: query.unassigned_only,
    };
    let limit = query
        .limit
        .unwrap_or(state.default_page_limit)
        .min(state.max_page_limit);

    let page = crate::query::list_orders(
        &state.orders,
        query.actor_role,
        query.actor_ref,
        &filters,
        query.page.unwrap_or(1),
        limit,
    )?;
    Ok(Json(page))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<Order>, AppError> {
    let order = crate::query::get_order(&state.orders, actor.actor_role, actor.actor_ref, id)?;
    Ok(Json(order))
}

async fn claim(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClaimRequest>,
) -> Result<Json<Order>, AppError> {
    let order = claim_order(&state, id, payload.laboratory_ref, payload.expected_version)?;
    Ok(Json(order))
}

async fn confirm_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<Order>, AppError> {
    let order = confirm(
        &state,
        id,
        payload.actor_ref,
        payload.actor_role,
        payload.total_price,
    )?;
    Ok(Json(order))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignCourierRequest>,
) -> Result<Json<Order>, AppError> {
    let order = assign_courier(
        &state,
        id,
        payload.courier_ref,
        payload.actor_ref,
        payload.actor_role,
    )?;
    Ok(Json(order))
}

async fn force_assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ForceAssignRequest>,
) -> Result<Json<Order>, AppError> {
    let order = force_assign_laboratory(
        &state,
        id,
        payload.laboratory_ref,
        payload.actor_ref,
        payload.actor_role,
    )?;
    Ok(Json(order))
}

async fn accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourierRequest>,
) -> Result<Json<Order>, AppError> {
    let order = accept_delivery(&state, id, payload.courier_ref)?;
    Ok(Json(order))
}

async fn reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<Order>, AppError> {
    let order = reject_delivery(&state, id, payload.courier_ref, payload.reason)?;
    Ok(Json(order))
}

async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourierRequest>,
) -> Result<Json<Order>, AppError> {
    let order = start_delivery(&state, id, payload.courier_ref)?;
    Ok(Json(order))
}

async fn delivered(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourierRequest>,
) -> Result<Json<DeliveryReceipt>, AppError> {
    let receipt = mark_delivered(&state, id, payload.courier_ref)?;
    Ok(Json(receipt))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<Order>, AppError> {
    let order = cancel(&state, id, payload.customer_ref)?;
    Ok(Json(order))
}

async fn paid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = mark_paid(&state, id)?;
    Ok(Json(order))
}
