pub mod cart;
mod errors;
mod helpers;
mod ids;
pub mod orders;
pub mod promo;
pub mod storage;

pub use errors::RepositoryError;
pub use helpers::fake;
pub use ids::*;
