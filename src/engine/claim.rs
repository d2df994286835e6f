use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::ActorRole;
use crate::models::order::Order;
use crate::notify::Notification;
use crate::state::AppState;

/// Single-winner claim of an unassigned order. The whole check-and-write
/// runs under the store's per-order entry guard, so among any number of
/// concurrent attempts exactly one observes `laboratory_ref = None` with a
/// matching version and commits; every loser gets the precise reason:
///
/// 1. unknown id                          -> NotFound
/// 2. laboratory already set              -> AlreadyClaimed
/// 3. not in the assignment pool          -> NotEligible
/// 4. version moved since the caller read -> StaleVersion
///
/// Losers are never retried here; re-reading and resubmitting is the
/// caller's decision.
pub fn claim_order(
    state: &AppState,
    order_id: Uuid,
    laboratory_ref: Uuid,
    expected_version: u64,
) -> Result<Order, AppError> {
    let mut from_status = None;
    let result = state.orders.update(order_id, |order| {
        from_status = Some(order.status);

        if order.laboratory_ref.is_some() {
            return Err(AppError::AlreadyClaimed);
        }
        if !order.in_assignment_pool() {
            return Err(AppError::NotEligible);
        }
        if order.version != expected_version {
            return Err(AppError::StaleVersion {
                expected: expected_version,
                found: order.version,
            });
        }

        order.laboratory_ref = Some(laboratory_ref);
        order.needs_assignment = false;
        // Claim changes ownership, not status; the history entry repeats
        // the current status.
        order.record(order.status, laboratory_ref, ActorRole::Laboratory);
        Ok(())
    });

    match result {
        Ok(order) => {
            state
                .metrics
                .claims_total
                .with_label_values(&["won"])
                .inc();
            state.dispatcher.dispatch(Notification::for_transition(
                &order,
                from_status.unwrap_or(order.status),
            ));

            info!(
                order_id = %order.id,
                laboratory_ref = %laboratory_ref,
                version = order.version,
                "order claimed"
            );
            Ok(order)
        }
        Err(err) => {
            state
                .metrics
                .claims_total
                .with_label_values(&[err.kind()])
                .inc();
            warn!(order_id = %order_id, laboratory_ref = %laboratory_ref, error = %err, "claim rejected");
            Err(err)
        }
    }
}
