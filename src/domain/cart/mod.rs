#[allow(clippy::module_inception)]
mod cart;
mod errors;
mod pricing;
mod store;

pub use cart::{Cart, CartItem, MAX_UNIT_PRICE, MenuItem};
pub use errors::CartError;
pub use pricing::{CartTotals, PricingPolicy, percent_of, round_money};
pub use store::{AppliedPromo, CART_STORAGE_KEY, CartStore, DEFAULT_CART_TTL};
