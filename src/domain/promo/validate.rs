//! Validate Promo Code slice

use std::sync::Arc;

use axum::{Json, extract::State};
use jiff::Timestamp;
use rust_decimal::Decimal;
use tracing::error;
use uuid::Uuid;

use crate::{AppState, domain::RestaurantId, infra::ClientError};

use super::{PromoCode, PromoContext, PromoRejection, PromoRepository, ServiceType};

//------------------------- Web API ----------------------------

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ValidatePromoPayload {
    pub code: String,
    pub order_total: Decimal,
    pub restaurant_id: Option<Uuid>,
    pub service_type: Option<ServiceType>,
}

pub async fn validate_promo_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<ValidatePromoPayload>,
) -> Result<Json<PromoValidation>, ClientError> {
    let validator = PromoValidator::new(state.promos);
    let validation = validator
        .validate(
            &payload.code,
            payload.order_total,
            payload.restaurant_id.map(RestaurantId::from),
            payload.service_type,
        )
        .await;
    Ok(Json(validation))
}

//----------------------- Implementation --------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PromoValidation {
    pub valid: bool,
    pub promo_code: Option<PromoCode>,
    pub discount_amount: Decimal,
    pub error_message: Option<String>,
}

impl PromoValidation {
    fn accepted(promo_code: PromoCode, discount_amount: Decimal) -> Self {
        Self {
            valid: true,
            promo_code: Some(promo_code),
            discount_amount,
            error_message: None,
        }
    }

    fn rejected(rejection: &PromoRejection) -> Self {
        Self {
            valid: false,
            promo_code: None,
            discount_amount: Decimal::ZERO,
            error_message: Some(rejection.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PromoValidator {
    promos: Arc<dyn PromoRepository>,
}

impl PromoValidator {
    pub fn new(promos: Arc<dyn PromoRepository>) -> Self {
        Self { promos }
    }

    pub async fn validate(
        &self,
        code: &str,
        order_total: Decimal,
        restaurant_id: Option<RestaurantId>,
        service_type: Option<ServiceType>,
    ) -> PromoValidation {
        self.validate_at(code, order_total, restaurant_id, service_type, Timestamp::now())
            .await
    }

    /// Never fails: every problem, including the backend being unreachable, becomes an invalid
    /// result carrying a customer facing message. The promo record itself is not modified.
    pub async fn validate_at(
        &self,
        code: &str,
        order_total: Decimal,
        restaurant_id: Option<RestaurantId>,
        service_type: Option<ServiceType>,
        now: Timestamp,
    ) -> PromoValidation {
        let promo_code = match self.promos.find_by_code(code).await {
            Ok(Some(promo_code)) => promo_code,
            Ok(None) => return PromoValidation::rejected(&PromoRejection::NotFound),
            Err(e) => {
                error!("Promo code lookup for {code:?} failed with {e}");
                return PromoValidation::rejected(&PromoRejection::Unavailable);
            }
        };

        let context = PromoContext {
            order_total,
            restaurant_id,
            service_type,
        };
        match promo_code.evaluate(&context, now) {
            Ok(discount) => PromoValidation::accepted(promo_code, discount),
            Err(rejection) => PromoValidation::rejected(&rejection),
        }
    }
}

//-------------------------- Tests -------------------------------
