//! Payment return slice: wait for the backend to settle an order after the payment page.
//!
//! The processor notifies the backend directly, so by the time the customer is sent back the
//! order may or may not have left `pending`. We poll for a bounded time.

use std::{sync::Arc, time::Duration};

use axum::{
    Json,
    extract::{Path, State},
};
use backon::{ConstantBuilder, Retryable};
use jiff::SignedDuration;
use serde_aux::field_attributes::deserialize_number_from_string;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    domain::{OrderId, RepositoryError},
    infra::ClientError,
};

use super::{Order, OrderRepository, OrderView, PendingOrders};

//------------------------- Web API ----------------------------

pub async fn payment_return_endpoint(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ClientError> {
    let verifier = PaymentVerifier::new(state.orders, &state.settings.verification);
    let order = verifier.wait_for_payment(OrderId::from(order_id)).await?;
    Ok(Json(OrderView::from(order)))
}

//----------------------- Implementation --------------------------

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct VerificationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_attempts: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pending_timeout_minutes: i64,
}

impl VerificationSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pending_timeout(&self) -> SignedDuration {
        SignedDuration::from_mins(self.pending_timeout_minutes)
    }
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_attempts: 15,
            timeout_secs: 30,
            pending_timeout_minutes: 30,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Payment for order {order_id} has not been confirmed yet.")]
    Timeout { order_id: OrderId },
    #[error("Order {0} does not exist.")]
    NotFound(OrderId),
    #[error("Could not check payment status: {0}")]
    Repository(#[from] RepositoryError),
}

enum Poll {
    StillPending,
    Failed(VerificationError),
}

pub struct PaymentVerifier {
    orders: Arc<dyn OrderRepository>,
    poll_interval: Duration,
    max_attempts: usize,
    timeout: Duration,
    pending: Option<PendingOrders>,
}

impl PaymentVerifier {
    pub fn new(orders: Arc<dyn OrderRepository>, settings: &VerificationSettings) -> Self {
        Self {
            orders,
            poll_interval: settings.poll_interval(),
            max_attempts: settings.max_attempts,
            timeout: settings.timeout(),
            pending: None,
        }
    }

    /// Settled orders are also removed from the local pending orders.
    pub fn with_pending_orders(mut self, pending: PendingOrders) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Polls until the order leaves `pending`, returning it as it is then.
    pub async fn wait_for_payment(&self, order_id: OrderId) -> Result<Order, VerificationError> {
        let polling = (|| async { self.poll(order_id).await })
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll_interval)
                    .with_max_times(self.max_attempts),
            )
            .when(|poll| !matches!(poll, Poll::Failed(VerificationError::NotFound(_))))
            .sleep(tokio::time::sleep)
            .notify(|poll, delay| {
                if let Poll::Failed(e) = poll {
                    warn!("Retrying payment check for order {order_id} after {delay:?}: {e}");
                }
            });

        let order = match tokio::time::timeout(self.timeout, polling).await {
            Ok(Ok(order)) => order,
            Ok(Err(Poll::Failed(e))) => return Err(e),
            Ok(Err(Poll::StillPending)) | Err(_) => {
                warn!("Payment for order {order_id} still unconfirmed after waiting");
                return Err(VerificationError::Timeout { order_id });
            }
        };

        info!("Order {order_id} settled as {}", order.status);
        if let Some(pending) = &self.pending {
            if let Err(e) = pending.resolve(order_id) {
                warn!("Could not remove order {order_id} from pending orders: {e}");
            }
        }
        Ok(order)
    }

    async fn poll(&self, order_id: OrderId) -> Result<Order, Poll> {
        match self.orders.find_order(order_id).await {
            Ok(Some(order)) if order.status.is_pending() => Err(Poll::StillPending),
            Ok(Some(order)) => Ok(order),
            Ok(None) => Err(Poll::Failed(VerificationError::NotFound(order_id))),
            Err(e) => Err(Poll::Failed(e.into())),
        }
    }
}

//-------------------------- Tests -------------------------------
