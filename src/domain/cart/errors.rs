use crate::domain::{ProductId, RestaurantId};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error(
        "Your cart contains items from {current_name}. Clear the cart before ordering from another restaurant."
    )]
    DifferentRestaurant {
        current: RestaurantId,
        current_name: String,
        requested: RestaurantId,
    },
    #[error("Quantity for product {0} must be at least 1.")]
    InvalidQuantity(ProductId),
    #[error("Price for product {0} is not valid.")]
    InvalidPrice(ProductId),
}
