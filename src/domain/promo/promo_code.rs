//! Promo code records and the rules deciding whether one applies.

use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::domain::{PromoCodeId, RestaurantId};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceType {
    Delivery,
    Pickup,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PromoCode {
    pub id: PromoCodeId,
    /// Always upper case, see [`canonical_code`].
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub restaurant_id: Option<RestaurantId>,
    pub service_type: Option<ServiceType>,
    pub is_active: bool,
}

/// What the promo is being checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromoContext {
    pub order_total: Decimal,
    pub restaurant_id: Option<RestaurantId>,
    pub service_type: Option<ServiceType>,
}

/// Why a promo code does not apply. The messages are shown to customers as is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PromoRejection {
    #[error("Invalid promo code.")]
    NotFound,
    #[error("This promo code is no longer active.")]
    Inactive,
    #[error("This promo code is not valid yet.")]
    NotYetValid { starts_at: Timestamp },
    #[error("This promo code has expired.")]
    Expired { ended_at: Timestamp },
    #[error("Minimum order of {minimum:.2} required for this promo code.")]
    BelowMinimum { minimum: Decimal },
    #[error("This promo code has reached its usage limit.")]
    UsageLimitReached,
    #[error("This promo code is not valid for this restaurant.")]
    WrongRestaurant,
    #[error("This promo code is only valid for {expected} orders.")]
    WrongServiceType { expected: ServiceType },
    #[error("Could not validate promo code. Please try again.")]
    Unavailable,
}

pub fn canonical_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl PromoCode {
    /// Runs every eligibility check in order and returns the discount for `context.order_total`.
    /// The first failing check wins.
    pub fn evaluate(&self, context: &PromoContext, now: Timestamp) -> Result<Decimal, PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Inactive);
        }
        if now < self.starts_at {
            return Err(PromoRejection::NotYetValid {
                starts_at: self.starts_at,
            });
        }
        if now > self.ends_at {
            return Err(PromoRejection::Expired {
                ended_at: self.ends_at,
            });
        }
        if let Some(minimum) = self.min_order_amount {
            if context.order_total < minimum {
                return Err(PromoRejection::BelowMinimum { minimum });
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return Err(PromoRejection::UsageLimitReached);
            }
        }
        if let Some(restaurant_id) = self.restaurant_id {
            if context.restaurant_id != Some(restaurant_id) {
                return Err(PromoRejection::WrongRestaurant);
            }
        }
        if let Some(expected) = self.service_type {
            if context.service_type != Some(expected) {
                return Err(PromoRejection::WrongServiceType { expected });
            }
        }
        Ok(self.discount_for(context.order_total))
    }

    /// Discount for an order total, ignoring eligibility. Never negative and never more than the
    /// order total. Percentages are not rounded here; only the grand total is rounded to cents.
    pub fn discount_for(&self, order_total: Decimal) -> Decimal {
        let order_total = order_total.max(Decimal::ZERO);
        let discount = match self.discount_type {
            DiscountType::Percentage => {
                let discount =
                    order_total.saturating_mul(self.discount_value) / Decimal::ONE_HUNDRED;
                match self.max_discount {
                    Some(cap) => discount.min(cap),
                    None => discount,
                }
            }
            DiscountType::FixedAmount => self.discount_value,
        };
        discount.clamp(Decimal::ZERO, order_total)
    }
}

//-------------------------- Tests -------------------------------
