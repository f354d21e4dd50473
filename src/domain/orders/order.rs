//! Orders as stored in the `orders` and `order_items` tables, plus how a status is shown.

use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::domain::{
    CustomerId, OrderId, OrderLineId, ProductId, PromoCodeId, RestaurantId, cart::CartTotals,
};

/// Statuses written by restaurants, drivers and admins. Anything not in the list is kept
/// verbatim in `Unknown` so a new backend status never breaks a reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    PickedUp,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
    Unknown(String),
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "preparing" => Self::Preparing,
            "ready_for_pickup" => Self::ReadyForPickup,
            "picked_up" => Self::PickedUp,
            "out_for_delivery" => Self::OutForDelivery,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            _ => Self::Unknown(raw.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::ReadyForPickup => "ready_for_pickup",
            Self::PickedUp => "picked_up",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_pending(&self) -> bool {
        *self == Self::Pending
    }

    pub fn badge(&self) -> StatusBadge {
        let (label, color, icon) = match self {
            Self::Pending => ("Pending", BadgeColor::Yellow, "clock"),
            Self::Confirmed => ("Confirmed", BadgeColor::Blue, "check-circle"),
            Self::Preparing => ("Preparing", BadgeColor::Orange, "chef-hat"),
            Self::ReadyForPickup => ("Ready for pickup", BadgeColor::Purple, "package"),
            Self::PickedUp => ("Picked up", BadgeColor::Indigo, "bike"),
            Self::OutForDelivery => ("Out for delivery", BadgeColor::Indigo, "truck"),
            Self::Delivered => ("Delivered", BadgeColor::Green, "check-check"),
            Self::Cancelled => ("Cancelled", BadgeColor::Red, "x-circle"),
            Self::Refunded => ("Refunded", BadgeColor::Gray, "rotate-ccw"),
            Self::Unknown(raw) => {
                let label = if raw.trim().is_empty() {
                    "Unknown".to_owned()
                } else {
                    raw.replace('_', " ")
                };
                return StatusBadge {
                    label,
                    color: BadgeColor::Gray,
                    icon: "help-circle",
                };
            }
        };
        StatusBadge {
            label: label.to_owned(),
            color,
            icon,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BadgeColor {
    Yellow,
    Blue,
    Orange,
    Purple,
    Indigo,
    Green,
    Red,
    Gray,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatusBadge {
    pub label: String,
    pub color: BadgeColor,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub restaurant_id: RestaurantId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub service_fee: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub promo_code_id: Option<PromoCodeId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub special_instructions: Option<String>,
}

/// An order about to be written, header and lines together.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: CustomerId,
    pub restaurant_id: RestaurantId,
    pub totals: CartTotals,
    pub promo_code_id: Option<PromoCodeId>,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub special_instructions: Option<String>,
}

/// The signed-in customer placing an order.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    pub first_name: String,
}

/// An order as shown to a customer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OrderView {
    pub order: Order,
    pub badge: StatusBadge,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        let badge = order.status.badge();
        Self { order, badge }
    }
}

//-------------------------- Tests -------------------------------
