pub mod claim;
pub mod handoff;
pub mod orders;

use tracing::{info, warn};

use crate::error::AppError;
use crate::lifecycle::OrderAction;
use crate::models::order::{Order, OrderStatus};
use crate::notify::Notification;
use crate::state::AppState;

/// Common tail for every transition: metrics by outcome, one notification
/// per committed write (never before it), structured log line.
pub(crate) fn commit(
    state: &AppState,
    action: OrderAction,
    from_status: OrderStatus,
    result: Result<Order, AppError>,
) -> Result<Order, AppError> {
    match result {
        Ok(order) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[action.as_str(), "success"])
                .inc();
            state
                .dispatcher
                .dispatch(Notification::for_transition(&order, from_status));

            info!(
                order_id = %order.id,
                action = action.as_str(),
                from = ?from_status,
                to = ?order.status,
                version = order.version,
                "transition committed"
            );
            Ok(order)
        }
        Err(err) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[action.as_str(), "error"])
                .inc();
            warn!(error = %err, action = action.as_str(), "transition rejected");
            Err(err)
        }
    }
}
