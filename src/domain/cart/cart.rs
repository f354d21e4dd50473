//! The cart aggregate: lines for a single restaurant plus the time it was last touched.

use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;

use crate::domain::{ProductId, RestaurantId};

use super::CartError;

/// Highest price a single unit may carry. Keeps every cart total well inside `Decimal` range.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// What the customer picks from a menu. Adding it to a cart creates a line with quantity 1.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub image: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

impl From<MenuItem> for CartItem {
    fn from(item: MenuItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name,
            unit_price: item.unit_price,
            quantity: 1,
            restaurant_id: item.restaurant_id,
            restaurant_name: item.restaurant_name,
            image: item.image,
            special_instructions: item.special_instructions,
        }
    }
}

/// Persisted as `{ "items": [...], "lastModified": <epoch-ms> }`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
    #[serde(with = "jiff::fmt::serde::timestamp::millisecond::required")]
    last_modified: Timestamp,
}

impl Cart {
    pub fn new(now: Timestamp) -> Self {
        Self {
            items: Vec::new(),
            last_modified: now,
        }
    }

    /// Rebuilds a cart from a snapshot, merging lines for the same product.
    pub fn from_items(items: Vec<CartItem>, now: Timestamp) -> Result<Self, CartError> {
        let mut cart = Self::new(now);
        for item in items {
            if item.quantity == 0 {
                return Err(CartError::InvalidQuantity(item.product_id));
            }
            ensure_valid_price(item.product_id, item.unit_price)?;
            cart.ensure_same_restaurant(item.restaurant_id)?;
            match cart.line_mut(item.product_id) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => cart.items.push(item),
            }
        }
        Ok(cart)
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last_modified(&self) -> Timestamp {
        self.last_modified
    }

    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.items.first().map(|item| item.restaurant_id)
    }

    pub fn add_item(&mut self, item: MenuItem, now: Timestamp) -> Result<(), CartError> {
        ensure_valid_price(item.product_id, item.unit_price)?;
        self.ensure_same_restaurant(item.restaurant_id)?;
        match self.line_mut(item.product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.items.push(item.into()),
        }
        self.last_modified = now;
        Ok(())
    }

    /// Takes one unit off the line; the line goes once it reaches zero.
    pub fn remove_item(&mut self, product_id: ProductId, now: Timestamp) {
        let Some(line) = self.line_mut(product_id) else {
            return;
        };
        line.quantity = line.quantity.saturating_sub(1);
        self.items.retain(|item| item.quantity > 0);
        self.last_modified = now;
    }

    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64, now: Timestamp) {
        let Some(line) = self.line_mut(product_id) else {
            return;
        };
        line.quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
        self.items.retain(|item| item.quantity > 0);
        self.last_modified = now;
    }

    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |sum, item| sum.saturating_add(item.line_total()))
    }

    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    pub fn is_expired(&self, ttl: SignedDuration, now: Timestamp) -> bool {
        now.duration_since(self.last_modified) > ttl
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| item.product_id == product_id)
    }

    fn ensure_same_restaurant(&self, requested: RestaurantId) -> Result<(), CartError> {
        match self.items.first() {
            Some(first) if first.restaurant_id != requested => Err(CartError::DifferentRestaurant {
                current: first.restaurant_id,
                current_name: first.restaurant_name.clone(),
                requested,
            }),
            _ => Ok(()),
        }
    }
}

fn ensure_valid_price(product_id: ProductId, unit_price: Decimal) -> Result<(), CartError> {
    if unit_price < Decimal::ZERO || unit_price > MAX_UNIT_PRICE {
        return Err(CartError::InvalidPrice(product_id));
    }
    Ok(())
}

//-------------------------- Tests -------------------------------
