mod promo_code;
mod repository;
mod validate;

pub use promo_code::{
    DiscountType, PromoCode, PromoContext, PromoRejection, ServiceType, canonical_code,
};
pub use repository::{MemoryPromoRepository, PgPromoRepository, PromoRepository};
pub use validate::{PromoValidation, PromoValidator, ValidatePromoPayload, validate_promo_endpoint};
