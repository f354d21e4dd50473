use food_delivery::domain::{
    PromoCodeId, RestaurantId,
    fake::{money, percentage_promo},
    promo::{
        DiscountType, PgPromoRepository, PromoCode, PromoRepository, PromoValidator, ServiceType,
    },
};
use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use jiff_sqlx::ToSqlx;
use serde_json::json;
use serial_test::serial;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};

use crate::test_utils::spawn_in_memory_app;

#[tokio::test]
async fn validation_endpoint_reports_discount_for_scoped_codes() {
    let restaurant_id = RestaurantId::new();
    let app = spawn_in_memory_app(vec![PromoCode {
        restaurant_id: Some(restaurant_id),
        service_type: Some(ServiceType::Pickup),
        max_discount: Some(money("15.00")),
        ..percentage_promo("PICKUP20", money("20"), None)
    }])
    .await;

    let validation = app
        .client
        .do_post(
            "/promocodes/validate",
            json!({
                "code": "pickup20",
                "order_total": "200.00",
                "restaurant_id": restaurant_id,
                "service_type": "pickup",
            }),
        )
        .await
        .expect("Validate request should succeed.")
        .json_body()
        .expect("Validation should be JSON.");
    assert_eq!(validation["valid"], true);
    assert_eq!(validation["discount_amount"], "15.00");
    assert_eq!(validation["promo_code"]["code"], "PICKUP20");

    let validation = app
        .client
        .do_post(
            "/promocodes/validate",
            json!({
                "code": "PICKUP20",
                "order_total": "200.00",
                "restaurant_id": restaurant_id,
                "service_type": "delivery",
            }),
        )
        .await
        .expect("Validate request should succeed.")
        .json_body()
        .expect("Validation should be JSON.");
    assert_eq!(validation["valid"], false);
    assert_eq!(
        validation["error_message"],
        "This promo code is only valid for pickup orders."
    );
}

#[tokio::test]
async fn expired_code_gets_its_own_message() {
    let now = Timestamp::now();
    let app = spawn_in_memory_app(vec![PromoCode {
        starts_at: now - SignedDuration::from_hours(48),
        ends_at: now - SignedDuration::from_hours(24),
        ..percentage_promo("OLD", money("10"), None)
    }])
    .await;

    let validation = app
        .client
        .do_post(
            "/promocodes/validate",
            json!({ "code": "OLD", "order_total": "100" }),
        )
        .await
        .expect("Validate request should succeed.")
        .json_body()
        .expect("Validation should be JSON.");

    assert_eq!(validation["valid"], false);
    assert_eq!(validation["error_message"], "This promo code has expired.");
}

async fn insert_promo(pool: &PgPool, promo: &PromoCode) {
    sqlx::query(
        r#"INSERT INTO promo_codes (id, code, discount_type, discount_value, max_discount,
                                    min_order_amount, valid_from, valid_until, usage_limit,
                                    used_count, restaurant_id, service_type, is_active)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
    )
    .bind(promo.id)
    .bind(&promo.code)
    .bind(promo.discount_type.to_string())
    .bind(promo.discount_value)
    .bind(promo.max_discount)
    .bind(promo.min_order_amount)
    .bind(promo.starts_at.to_sqlx())
    .bind(promo.ends_at.to_sqlx())
    .bind(promo.usage_limit)
    .bind(promo.used_count)
    .bind(promo.restaurant_id)
    .bind(promo.service_type.map(|service_type| service_type.to_string()))
    .bind(promo.is_active)
    .execute(pool)
    .await
    .expect("Insert should succeed.");
}

#[sqlx::test]
#[serial]
#[ignore = "needs a running Postgres server"]
async fn postgres_lookup_is_case_insensitive(
    pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let pool = pool_options
        .connect_with(connect_options)
        .await
        .expect("Expected a database connection.");
    let promo = PromoCode {
        id: PromoCodeId::new(),
        discount_type: DiscountType::FixedAmount,
        discount_value: money("25"),
        ..percentage_promo("WELCOME25", money("0"), Some(money("100")))
    };
    insert_promo(&pool, &promo).await;

    let repository = Arc::new(PgPromoRepository::new(pool.clone()));
    let found = repository
        .find_by_code("welcome25")
        .await
        .expect("Lookup should succeed.")
        .expect("Promo should exist.");
    assert_eq!(found.discount_type, DiscountType::FixedAmount);

    let validation = PromoValidator::new(repository)
        .validate("Welcome25", money("80"), None, None)
        .await;
    assert!(!validation.valid);

    pool.close().await;
}
