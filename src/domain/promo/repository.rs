//! Reading promo codes from the `promo_codes` table.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{PromoCodeId, RepositoryError, RestaurantId};

use super::{DiscountType, PromoCode, ServiceType, canonical_code};

#[async_trait]
pub trait PromoRepository: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError>;
}

//------------------------- Postgres ----------------------------

#[derive(Debug, Clone)]
pub struct PgPromoRepository {
    pool: PgPool,
}

impl PgPromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromoRepository for PgPromoRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let row = sqlx::query_as::<_, PromoCodeRow>(
            r#"SELECT id, code, discount_type, discount_value, max_discount, min_order_amount,
                      valid_from, valid_until, usage_limit, used_count, restaurant_id,
                      service_type, is_active
               FROM promo_codes
               WHERE upper(code) = $1"#,
        )
        .bind(canonical_code(code))
        .fetch_optional(&self.pool)
        .await?;

        row.map(PromoCode::try_from).transpose()
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
struct PromoCodeRow {
    id: PromoCodeId,
    code: String,
    discount_type: String,
    discount_value: Decimal,
    max_discount: Option<Decimal>,
    min_order_amount: Option<Decimal>,
    valid_from: jiff_sqlx::Timestamp,
    valid_until: jiff_sqlx::Timestamp,
    usage_limit: Option<i32>,
    used_count: i32,
    restaurant_id: Option<RestaurantId>,
    service_type: Option<String>,
    is_active: bool,
}

impl TryFrom<PromoCodeRow> for PromoCode {
    type Error = RepositoryError;

    fn try_from(row: PromoCodeRow) -> Result<Self, Self::Error> {
        let malformed = |reason: String| RepositoryError::Malformed {
            table: "promo_codes",
            id: row.id.to_string(),
            reason,
        };

        let discount_type = match row.discount_type.as_str() {
            "percentage" => DiscountType::Percentage,
            "fixed" | "fixed_amount" => DiscountType::FixedAmount,
            other => return Err(malformed(format!("unknown discount_type {other}"))),
        };
        let service_type = match row.service_type.as_deref() {
            None | Some("") | Some("all") => None,
            Some("delivery") => Some(ServiceType::Delivery),
            Some("pickup") => Some(ServiceType::Pickup),
            Some(other) => return Err(malformed(format!("unknown service_type {other}"))),
        };
        if row.discount_value < Decimal::ZERO {
            return Err(malformed("negative discount_value".to_owned()));
        }

        Ok(PromoCode {
            id: row.id,
            code: canonical_code(&row.code),
            discount_type,
            discount_value: row.discount_value,
            max_discount: row.max_discount,
            min_order_amount: row.min_order_amount,
            starts_at: row.valid_from.to_jiff(),
            ends_at: row.valid_until.to_jiff(),
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            restaurant_id: row.restaurant_id,
            service_type,
            is_active: row.is_active,
        })
    }
}

//------------------------- In memory ----------------------------

#[derive(Debug, Default)]
pub struct MemoryPromoRepository {
    promos: Mutex<HashMap<String, PromoCode>>,
    unavailable: bool,
}

impl MemoryPromoRepository {
    pub fn new(promos: impl IntoIterator<Item = PromoCode>) -> Self {
        let promos = promos
            .into_iter()
            .map(|promo| (canonical_code(&promo.code), promo))
            .collect();
        Self {
            promos: Mutex::new(promos),
            unavailable: false,
        }
    }

    /// Every lookup fails as if the backend could not be reached.
    pub fn unavailable() -> Self {
        Self {
            promos: Mutex::default(),
            unavailable: true,
        }
    }

    pub fn increment_usage(&self, id: PromoCodeId) {
        if let Ok(mut promos) = self.promos.lock() {
            if let Some(promo) = promos.values_mut().find(|promo| promo.id == id) {
                promo.used_count += 1;
            }
        }
    }
}

#[async_trait]
impl PromoRepository for MemoryPromoRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        if self.unavailable {
            return Err(RepositoryError::Unavailable);
        }
        let promos = self.promos.lock().map_err(|_| RepositoryError::Unavailable)?;
        Ok(promos.get(&canonical_code(code)).cloned())
    }
}

//-------------------------- Tests -------------------------------
