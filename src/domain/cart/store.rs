//! The cart store owns the customer's cart for a session.
//!
//! It is created once and handed by reference to whatever needs the cart. Every mutation is
//! mirrored to [`LocalStorage`] before returning; when storage fails the store logs the problem
//! and carries on in memory, so the in-memory cart is always the source of truth.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::{
    ProductId, RestaurantId,
    promo::{PromoCode, PromoContext, ServiceType},
    storage::{LocalStorage, read_json, write_json},
};

use super::{Cart, CartError, CartItem, CartTotals, MenuItem, PricingPolicy};

pub const CART_STORAGE_KEY: &str = "food-delivery:cart";
pub const DEFAULT_CART_TTL: SignedDuration = SignedDuration::from_mins(30);

/// A promo applied during this session. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPromo {
    pub promo_code: PromoCode,
    pub service_type: Option<ServiceType>,
}

pub struct CartStore {
    storage: Arc<dyn LocalStorage>,
    pricing: PricingPolicy,
    ttl: SignedDuration,
    cart: Cart,
    promo: Option<AppliedPromo>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("pricing", &self.pricing)
            .field("ttl", &self.ttl)
            .field("cart", &self.cart)
            .field("promo", &self.promo)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Restores the persisted cart, dropping it if it is unreadable or has expired.
    pub fn load(storage: Arc<dyn LocalStorage>, pricing: PricingPolicy, ttl: SignedDuration) -> Self {
        Self::load_at(storage, pricing, ttl, Timestamp::now())
    }

    pub fn load_at(
        storage: Arc<dyn LocalStorage>,
        pricing: PricingPolicy,
        ttl: SignedDuration,
        now: Timestamp,
    ) -> Self {
        let cart = match read_json::<Cart>(storage.as_ref(), CART_STORAGE_KEY) {
            Ok(Some(cart)) => match Cart::from_items(cart.items().to_vec(), cart.last_modified()) {
                Ok(cart) => cart,
                Err(e) => {
                    warn!("Discarding invalid cart: {e}");
                    Cart::new(now)
                }
            },
            Ok(None) => Cart::new(now),
            Err(e) => {
                warn!("Discarding unreadable cart: {e}");
                Cart::new(now)
            }
        };
        let mut store = Self {
            storage,
            pricing,
            ttl,
            cart,
            promo: None,
        };
        store.check_expiry_at(now);
        store
    }

    /// Wraps an already built cart without touching storage until the first mutation.
    pub fn with_cart(
        storage: Arc<dyn LocalStorage>,
        pricing: PricingPolicy,
        ttl: SignedDuration,
        cart: Cart,
    ) -> Self {
        Self {
            storage,
            pricing,
            ttl,
            cart,
            promo: None,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn items(&self) -> &[CartItem] {
        self.cart.items()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    pub fn storage(&self) -> Arc<dyn LocalStorage> {
        Arc::clone(&self.storage)
    }

    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.cart.restaurant_id()
    }

    //------------------------ Mutations -------------------------

    pub fn add_item(&mut self, item: MenuItem) -> Result<(), CartError> {
        self.cart.add_item(item, Timestamp::now())?;
        self.persist();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: ProductId) {
        self.cart.remove_item(product_id, Timestamp::now());
        self.persist();
    }

    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) {
        self.cart.update_quantity(product_id, quantity, Timestamp::now());
        self.persist();
    }

    pub fn clear_cart(&mut self) {
        self.cart = Cart::new(Timestamp::now());
        self.promo = None;
        if let Err(e) = self.storage.remove_item(CART_STORAGE_KEY) {
            warn!("Could not remove persisted cart: {e}");
        }
    }

    pub fn check_expiry(&mut self) -> bool {
        self.check_expiry_at(Timestamp::now())
    }

    /// Clears the cart when it has not been touched for longer than the TTL.
    /// Returns whether it was cleared.
    pub fn check_expiry_at(&mut self, now: Timestamp) -> bool {
        if self.cart.is_empty() || !self.cart.is_expired(self.ttl, now) {
            return false;
        }
        self.clear_cart();
        true
    }

    pub fn apply_promo(&mut self, promo_code: PromoCode, service_type: Option<ServiceType>) {
        self.promo = Some(AppliedPromo {
            promo_code,
            service_type,
        });
    }

    pub fn remove_promo(&mut self) {
        self.promo = None;
    }

    pub fn applied_promo(&self) -> Option<&AppliedPromo> {
        self.promo.as_ref()
    }

    //------------------------ Derived values ---------------------

    pub fn subtotal(&self) -> Decimal {
        self.cart.subtotal()
    }

    pub fn total_items(&self) -> u32 {
        self.cart.total_items()
    }

    pub fn service_fee(&self) -> Decimal {
        self.pricing.service_fee(self.subtotal())
    }

    pub fn tax(&self) -> Decimal {
        self.pricing.tax(self.subtotal())
    }

    pub fn discount(&self) -> Decimal {
        self.discount_at(Timestamp::now())
    }

    /// Re-derived from the current subtotal; a promo that no longer qualifies gives nothing.
    pub fn discount_at(&self, now: Timestamp) -> Decimal {
        let Some(applied) = &self.promo else {
            return Decimal::ZERO;
        };
        let context = PromoContext {
            order_total: self.subtotal(),
            restaurant_id: self.restaurant_id(),
            service_type: applied.service_type,
        };
        applied
            .promo_code
            .evaluate(&context, now)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total(&self, delivery_fee: Decimal) -> Decimal {
        self.totals(delivery_fee).total
    }

    pub fn totals(&self, delivery_fee: Decimal) -> CartTotals {
        self.totals_at(delivery_fee, Timestamp::now())
    }

    pub fn totals_at(&self, delivery_fee: Decimal, now: Timestamp) -> CartTotals {
        self.pricing
            .totals(self.subtotal(), delivery_fee, self.discount_at(now))
    }

    fn persist(&self) {
        if let Err(e) = write_json(self.storage.as_ref(), CART_STORAGE_KEY, &self.cart) {
            warn!("Cart kept in memory only, persisting failed: {e}");
        }
    }
}

//-------------------------- Tests -------------------------------
