//! Platform fee policy and the canonical grand total.

use rust_decimal::{Decimal, RoundingStrategy};
use serde_aux::field_attributes::deserialize_number_from_string;

/// Fees charged on top of the food. Percentages are of the subtotal, e.g. `15` means 15%.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PricingPolicy {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub service_fee_percent: Decimal,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub tax_percent: Decimal,
    /// Delivery fee used when the restaurant does not quote its own.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub delivery_fee: Decimal,
}

impl PricingPolicy {
    pub fn new(service_fee_percent: Decimal, tax_percent: Decimal, delivery_fee: Decimal) -> Self {
        Self {
            service_fee_percent,
            tax_percent,
            delivery_fee,
        }
    }

    /// No service fee, no tax and free delivery.
    pub fn without_fees() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    pub fn service_fee(&self, subtotal: Decimal) -> Decimal {
        percent_of(subtotal, self.service_fee_percent)
    }

    pub fn tax(&self, subtotal: Decimal) -> Decimal {
        percent_of(subtotal, self.tax_percent)
    }

    /// `subtotal + delivery + service + tax - discount`, rounded to cents.
    ///
    /// The discount never exceeds the subtotal, so fees are always paid in full and the total is
    /// never negative.
    pub fn totals(&self, subtotal: Decimal, delivery_fee: Decimal, discount: Decimal) -> CartTotals {
        let subtotal = subtotal.max(Decimal::ZERO);
        let delivery_fee = delivery_fee.max(Decimal::ZERO);
        let service_fee = self.service_fee(subtotal);
        let tax = self.tax(subtotal);
        let discount = discount.clamp(Decimal::ZERO, subtotal);
        let total = round_money(
            subtotal
                .saturating_add(delivery_fee)
                .saturating_add(service_fee)
                .saturating_add(tax)
                .saturating_sub(discount)
                .max(Decimal::ZERO),
        );

        CartTotals {
            subtotal,
            delivery_fee,
            service_fee,
            tax,
            discount,
            total,
        }
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self::without_fees()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub service_fee: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Rounds to whole cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount.saturating_mul(percent) / Decimal::ONE_HUNDRED)
}

//-------------------------- Tests -------------------------------
