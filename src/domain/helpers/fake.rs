//! Test data generators and in-memory collaborators.

use fake::{Dummy, Fake, Faker, Rng};
use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;

use crate::domain::{
    ProductId, PromoCodeId, RestaurantId,
    cart::MenuItem,
    promo::{DiscountType, PromoCode, canonical_code},
};

/// Prices between 0.10 and 999.99.
pub struct Price;

impl Dummy<Price> for Decimal {
    fn dummy_with_rng<R: Rng + ?Sized>(_config: &Price, rng: &mut R) -> Self {
        let cents: i64 = (10i64..100_000).fake_with_rng(rng);
        Decimal::new(cents, 2)
    }
}

/// A menu item belonging to a fixed restaurant.
pub struct FromRestaurant(pub RestaurantId, pub &'static str);

impl Dummy<FromRestaurant> for MenuItem {
    fn dummy_with_rng<R: Rng + ?Sized>(config: &FromRestaurant, rng: &mut R) -> Self {
        MenuItem {
            product_id: ProductId::new(),
            name: fake::faker::lorem::en::Word().fake_with_rng(rng),
            unit_price: Price.fake_with_rng(rng),
            restaurant_id: config.0,
            restaurant_name: config.1.to_owned(),
            image: None,
            special_instructions: None,
        }
    }
}

impl Dummy<Faker> for MenuItem {
    fn dummy_with_rng<R: Rng + ?Sized>(_config: &Faker, rng: &mut R) -> Self {
        FromRestaurant(RestaurantId::new(), "Faker's Kitchen").fake_with_rng(rng)
    }
}

/// Parses a money literal such as `"182.49"`. Test helper only.
pub fn money(amount: &str) -> Decimal {
    amount.parse().unwrap_or_default()
}

/// An active percentage promo valid for a day either side of now, with no usage limit and no
/// restaurant or service scoping.
pub fn percentage_promo(code: &str, percent: Decimal, min_order_amount: Option<Decimal>) -> PromoCode {
    let now = Timestamp::now();
    PromoCode {
        id: PromoCodeId::new(),
        code: canonical_code(code),
        discount_type: DiscountType::Percentage,
        discount_value: percent,
        max_discount: None,
        min_order_amount,
        starts_at: now - SignedDuration::from_hours(24),
        ends_at: now + SignedDuration::from_hours(24),
        usage_limit: None,
        used_count: 0,
        restaurant_id: None,
        service_type: None,
        is_active: true,
    }
}
