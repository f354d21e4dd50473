//! Checkout slice: turn the cart into a pending order and send the customer off to pay.

use std::sync::Arc;

use axum::{Json, extract::State, response::Html};
use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    domain::{
        RepositoryError,
        cart::{Cart, CartError, CartItem, CartStore},
        promo::{PromoValidator, ServiceType},
        storage::MemoryStorage,
    },
    infra::ClientError,
};

use super::{
    Customer, DEFAULT_PENDING_TIMEOUT, NewOrder, NewOrderLine, OrderRepository, PaymentRedirect,
    PaymentSettings, PendingOrders,
};

//------------------------- Web API ----------------------------

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CheckoutPayload {
    pub customer: Customer,
    pub items: Vec<CartItem>,
    pub promo_code: Option<String>,
    pub service_type: Option<ServiceType>,
    pub delivery_fee: Option<Decimal>,
}

pub async fn checkout_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutPayload>,
) -> Result<Json<PaymentRedirect>, ClientError> {
    Ok(Json(place_order(state, payload).await?))
}

/// Same as [`checkout_endpoint`] but answers with a page that submits itself to the processor.
pub async fn checkout_form_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutPayload>,
) -> Result<Html<String>, ClientError> {
    let redirect = place_order(state, payload).await?;
    Ok(Html(redirect.render_form()))
}

/// The cart arrives as a snapshot and lives only for this request.
async fn place_order(
    state: AppState,
    payload: CheckoutPayload,
) -> Result<PaymentRedirect, ClientError> {
    let cart = Cart::from_items(payload.items, Timestamp::now())?;
    let mut store = CartStore::with_cart(
        Arc::new(MemoryStorage::new()),
        state.settings.pricing.clone(),
        state.settings.cart.ttl(),
        cart,
    );

    if let Some(code) = payload.promo_code.as_deref().filter(|code| !code.trim().is_empty()) {
        let validation = PromoValidator::new(state.promos.clone())
            .validate(code, store.subtotal(), store.restaurant_id(), payload.service_type)
            .await;
        match validation.promo_code {
            Some(promo_code) if validation.valid => {
                store.apply_promo(promo_code, payload.service_type)
            }
            _ => {
                return Err(ClientError::Payload(
                    validation
                        .error_message
                        .unwrap_or_else(|| "Invalid promo code.".to_owned()),
                ));
            }
        }
    }

    let orchestrator = CheckoutOrchestrator::new(state.orders, state.settings.payment)
        .with_pending_timeout(state.settings.verification.pending_timeout());
    let redirect = orchestrator
        .checkout(&mut store, &payload.customer, payload.delivery_fee)
        .await?;
    Ok(redirect)
}

//----------------------- Implementation --------------------------

/// Highest delivery fee a restaurant may quote.
pub const MAX_DELIVERY_FEE: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("Delivery fee {0} is not valid.")]
    InvalidDeliveryFee(Decimal),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error("Could not place your order. Please try again.")]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct CheckoutOrchestrator {
    orders: Arc<dyn OrderRepository>,
    payment: PaymentSettings,
    pending_timeout: SignedDuration,
}

impl CheckoutOrchestrator {
    pub fn new(orders: Arc<dyn OrderRepository>, payment: PaymentSettings) -> Self {
        Self {
            orders,
            payment,
            pending_timeout: DEFAULT_PENDING_TIMEOUT,
        }
    }

    pub fn with_pending_timeout(mut self, pending_timeout: SignedDuration) -> Self {
        self.pending_timeout = pending_timeout;
        self
    }

    /// Places the order for everything in the cart.
    ///
    /// The order and its lines are written together or not at all. Only once they are written is
    /// the cart cleared and the redirect built; on failure the cart is left as it was.
    /// `delivery_fee` defaults to the pricing policy's fee.
    pub async fn checkout(
        &self,
        store: &mut CartStore,
        customer: &Customer,
        delivery_fee: Option<Decimal>,
    ) -> Result<PaymentRedirect, CheckoutError> {
        let now = Timestamp::now();
        let Some(restaurant_id) = store.restaurant_id() else {
            return Err(CheckoutError::EmptyCart);
        };

        let delivery_fee = delivery_fee.unwrap_or(store.pricing().delivery_fee);
        if delivery_fee < Decimal::ZERO || delivery_fee > MAX_DELIVERY_FEE {
            return Err(CheckoutError::InvalidDeliveryFee(delivery_fee));
        }
        let totals = store.totals_at(delivery_fee, now);
        let promo_code_id = store
            .applied_promo()
            .filter(|_| totals.discount > Decimal::ZERO)
            .map(|applied| applied.promo_code.id);
        let lines = store
            .items()
            .iter()
            .map(|item| {
                let quantity = i32::try_from(item.quantity)
                    .map_err(|_| CartError::InvalidQuantity(item.product_id))?;
                Ok(NewOrderLine {
                    product_id: item.product_id,
                    name: item.name.clone(),
                    unit_price: item.unit_price,
                    quantity,
                    special_instructions: item.special_instructions.clone(),
                })
            })
            .collect::<Result<Vec<_>, CartError>>()?;

        let order = self
            .orders
            .create_order(NewOrder {
                order_number: generate_order_number(now),
                customer_id: customer.id,
                restaurant_id,
                totals,
                promo_code_id,
                lines,
            })
            .await
            .inspect_err(|e| warn!("Checkout for customer {} failed: {e}", customer.id))?;
        info!("Order {} placed as {}", order.id, order.order_number);

        let pending = PendingOrders::new(store.storage(), self.pending_timeout);
        if let Err(e) = pending.record(&order, now) {
            warn!("Order {} has no local payment backup: {e}", order.id);
        }

        let redirect = PaymentRedirect::new(&self.payment, &order, customer);
        store.clear_cart();
        Ok(redirect)
    }
}

/// `ORD-<epoch milliseconds>-<6 upper case hex digits>`.
pub fn generate_order_number(now: Timestamp) -> String {
    let suffix = Uuid::new_v4().as_u128() & 0xFF_FFFF;
    format!("ORD-{}-{suffix:06X}", now.as_millisecond())
}

//-------------------------- Tests -------------------------------
