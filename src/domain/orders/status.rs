//! Order Status slice: read an order and move it along.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    domain::{OrderId, RepositoryError},
    infra::ClientError,
};

use super::{OrderStatus, OrderView};

//------------------------- Web API ----------------------------

pub async fn get_order_endpoint(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ClientError> {
    let order_id = OrderId::from(order_id);
    let order = state
        .orders
        .find_order(order_id)
        .await?
        .ok_or_else(|| ClientError::NotFound(format!("Order {order_id} does not exist.")))?;
    Ok(Json(OrderView::from(order)))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct UpdateStatusPayload {
    pub status: OrderStatus,
}

/// Used by restaurants, drivers and admins. Any status may follow any other.
pub async fn update_status_endpoint(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<OrderView>, ClientError> {
    if let OrderStatus::Unknown(raw) = &payload.status {
        return Err(ClientError::Payload(format!("Unknown order status {raw:?}.")));
    }

    let order_id = OrderId::from(order_id);
    let order = match state.orders.update_status(order_id, payload.status).await {
        Ok(order) => order,
        Err(RepositoryError::NotFound(_)) => {
            return Err(ClientError::NotFound(format!(
                "Order {order_id} does not exist."
            )));
        }
        Err(e) => return Err(e.into()),
    };
    info!("Order {order_id} is now {}", order.status);
    Ok(Json(OrderView::from(order)))
}
