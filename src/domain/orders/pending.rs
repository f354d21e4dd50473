//! Orders sent to the payment processor but not yet confirmed.
//!
//! After checkout a copy of the order is kept in local storage so it can be reconciled when the
//! customer comes back from the payment page, or on the next start if they never do.

use std::{collections::BTreeMap, sync::Arc};

use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::{
    CustomerId, OrderId, PromoCodeId, RestaurantId,
    storage::{LocalStorage, StorageError, read_json, write_json},
};

use super::{Order, OrderRepository};

pub const PENDING_ORDERS_KEY: &str = "food-delivery:pending-orders";
pub const PAYMENT_BACKUP_KEY_PREFIX: &str = "food-delivery:payment-backup:";
pub const DEFAULT_PENDING_TIMEOUT: SignedDuration = SignedDuration::from_mins(30);
pub const PENDING_VERIFICATION: &str = "pending_verification";

pub fn payment_backup_key(order_id: OrderId) -> String {
    format!("{PAYMENT_BACKUP_KEY_PREFIX}{order_id}")
}

/// The order as it was when the customer left for the payment page.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBackup {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub restaurant_id: RestaurantId,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub service_fee: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub promo_code_id: Option<PromoCodeId>,
    #[serde(with = "jiff::fmt::serde::timestamp::millisecond::required")]
    pub timestamp: Timestamp,
    pub status: String,
}

impl PaymentBackup {
    pub fn new(order: &Order, now: Timestamp) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer_id: order.customer_id,
            restaurant_id: order.restaurant_id,
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            service_fee: order.service_fee,
            tax: order.tax,
            discount: order.discount,
            total: order.total,
            promo_code_id: order.promo_code_id,
            timestamp: now,
            status: PENDING_VERIFICATION.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrderEntry {
    pub order_id: OrderId,
    #[serde(with = "jiff::fmt::serde::timestamp::millisecond::required")]
    pub timestamp: Timestamp,
    pub status: String,
}

/// Outcome of a [`PendingOrders::sweep`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Pending for longer than the timeout.
    pub expired: Vec<OrderId>,
    /// The backend has moved on from `pending`, or no longer knows the order.
    pub resolved: Vec<OrderId>,
    pub still_pending: Vec<OrderId>,
}

pub struct PendingOrders {
    storage: Arc<dyn LocalStorage>,
    timeout: SignedDuration,
}

impl std::fmt::Debug for PendingOrders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOrders")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PendingOrders {
    pub fn new(storage: Arc<dyn LocalStorage>, timeout: SignedDuration) -> Self {
        Self { storage, timeout }
    }

    /// Writes the payment backup and adds the order to the index.
    pub fn record(&self, order: &Order, now: Timestamp) -> Result<(), StorageError> {
        let backup = PaymentBackup::new(order, now);
        write_json(self.storage.as_ref(), &payment_backup_key(order.id), &backup)?;

        let mut index = self.index()?;
        index.insert(
            order.id,
            PendingOrderEntry {
                order_id: order.id,
                timestamp: now,
                status: PENDING_VERIFICATION.to_owned(),
            },
        );
        self.save_index(&index)
    }

    pub fn entries(&self) -> Result<Vec<PendingOrderEntry>, StorageError> {
        Ok(self.index()?.into_values().collect())
    }

    pub fn backup(&self, order_id: OrderId) -> Result<Option<PaymentBackup>, StorageError> {
        read_json(self.storage.as_ref(), &payment_backup_key(order_id))
    }

    /// Forgets an order once its payment has been settled one way or the other.
    pub fn resolve(&self, order_id: OrderId) -> Result<(), StorageError> {
        self.storage.remove_item(&payment_backup_key(order_id))?;
        let mut index = self.index()?;
        if index.remove(&order_id).is_some() {
            self.save_index(&index)?;
        }
        Ok(())
    }

    /// Drops entries that timed out or that the backend no longer has as `pending`. Entries that
    /// cannot be checked right now are kept for the next sweep.
    pub async fn sweep(
        &self,
        orders: &dyn OrderRepository,
        now: Timestamp,
    ) -> Result<SweepReport, StorageError> {
        let mut report = SweepReport::default();

        for entry in self.entries()? {
            let order_id = entry.order_id;
            if now.duration_since(entry.timestamp) > self.timeout {
                report.expired.push(order_id);
                continue;
            }
            match orders.find_order(order_id).await {
                Ok(Some(order)) if order.status.is_pending() => report.still_pending.push(order_id),
                Ok(_) => report.resolved.push(order_id),
                Err(e) => {
                    warn!("Keeping pending order {order_id}, status check failed with {e}");
                    report.still_pending.push(order_id);
                }
            }
        }

        for order_id in report.expired.iter().chain(&report.resolved) {
            self.resolve(*order_id)?;
        }
        info!(
            "Pending orders swept: {} expired, {} resolved, {} still pending",
            report.expired.len(),
            report.resolved.len(),
            report.still_pending.len()
        );
        Ok(report)
    }

    fn index(&self) -> Result<BTreeMap<OrderId, PendingOrderEntry>, StorageError> {
        match read_json(self.storage.as_ref(), PENDING_ORDERS_KEY) {
            Ok(index) => Ok(index.unwrap_or_default()),
            Err(StorageError::Serde { key, source }) => {
                warn!("Discarding unreadable pending orders index {key}: {source}");
                Ok(BTreeMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn save_index(&self, index: &BTreeMap<OrderId, PendingOrderEntry>) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), PENDING_ORDERS_KEY, index)
    }
}

//-------------------------- Tests -------------------------------
