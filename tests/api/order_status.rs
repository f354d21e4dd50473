use std::time::Duration;

use axum::http::StatusCode;
use food_delivery::domain::{
    CustomerId, OrderId, ProductId, RestaurantId,
    fake::{money, percentage_promo},
    orders::{OrderStatus, delete_order},
    promo::PromoRepository,
};
use serde_json::{Value, json};
use serial_test::serial;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::test_utils::{assert_until_eq, spawn_in_memory_app, start_test_server};

fn checkout_body(promo_code: Option<&str>) -> Value {
    json!({
        "customer": {
            "id": CustomerId::new(),
            "email": "lerato@example.com",
            "first_name": "Lerato",
        },
        "items": [{
            "productId": ProductId::new(),
            "name": "Pad thai",
            "unitPrice": "100.00",
            "quantity": 2,
            "restaurantId": RestaurantId::new(),
            "restaurantName": "Thai Garden",
        }],
        "promo_code": promo_code,
        "delivery_fee": "2.49",
    })
}

async fn place_order(client: &httpc_test::Client, promo_code: Option<&str>) -> OrderId {
    let redirect = client
        .do_post("/checkout", checkout_body(promo_code))
        .await
        .expect("Checkout request should succeed.")
        .json_body()
        .expect("Redirect should be JSON.");
    redirect["order_id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("Redirect should name the order.")
}

#[tokio::test]
async fn status_updates_change_the_badge_and_confirmation_counts_the_promo() {
    let app = spawn_in_memory_app(vec![percentage_promo("SAVE10", money("10"), None)]).await;
    let order_id = place_order(&app.client, Some("SAVE10")).await;

    let view = app
        .client
        .do_get(&format!("/orders/{order_id}"))
        .await
        .expect("Order request should succeed.")
        .json_body()
        .expect("Order should be JSON.");
    assert_eq!(view["order"]["status"], "pending");
    assert_eq!(view["badge"]["color"], "yellow");

    let res = app
        .client
        .do_put(
            &format!("/orders/{order_id}/status"),
            json!({ "status": "confirmed" }),
        )
        .await
        .expect("Status request should succeed.");
    assert_eq!(res.status(), StatusCode::OK);
    let view = res.json_body().expect("Order should be JSON.");
    assert_eq!(view["badge"]["label"], "Confirmed");
    assert_eq!(view["badge"]["icon"], "check-circle");

    let promo = app
        .promos
        .find_by_code("SAVE10")
        .await
        .expect("Lookup should succeed.")
        .expect("Promo should exist.");
    assert_eq!(promo.used_count, 1);
}

#[tokio::test]
async fn unknown_statuses_and_orders_are_rejected() {
    let app = spawn_in_memory_app(vec![]).await;
    let order_id = place_order(&app.client, None).await;

    let res = app
        .client
        .do_put(
            &format!("/orders/{order_id}/status"),
            json!({ "status": "teleported" }),
        )
        .await
        .expect("Status request should succeed.");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .client
        .do_get(&format!("/orders/{}", OrderId::new()))
        .await
        .expect("Order request should succeed.");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_return_waits_for_confirmation() {
    let app = spawn_in_memory_app(vec![]).await;
    let order_id = place_order(&app.client, None).await;

    let res = app
        .client
        .do_get(&format!("/payments/return/{order_id}"))
        .await
        .expect("Return request should succeed.");
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

    app.state
        .orders
        .update_status(order_id, OrderStatus::Confirmed)
        .await
        .expect("Update should succeed.");
    let view = app
        .client
        .do_get(&format!("/payments/return/{order_id}"))
        .await
        .expect("Return request should succeed.")
        .json_body()
        .expect("Order should be JSON.");
    assert_eq!(view["order"]["status"], "confirmed");
}

/// Reads `order` events off a Server-Sent Events response.
struct OrderEvents {
    response: reqwest::Response,
    buffer: String,
}

impl OrderEvents {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: String::new(),
        }
    }

    async fn next(&mut self) -> Value {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let event: String = self.buffer.drain(..end + 2).collect();
                let is_order = event
                    .lines()
                    .any(|line| line.strip_prefix("event:").map(str::trim) == Some("order"));
                let data = event.lines().find_map(|line| line.strip_prefix("data:"));
                if let (true, Some(data)) = (is_order, data) {
                    return serde_json::from_str(data.trim()).expect("Event data should be JSON.");
                }
                continue;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.response.chunk())
                .await
                .expect("Expected an event within 5 seconds.")
                .expect("Stream should be readable.")
                .expect("Stream should stay open.");
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}

#[tokio::test]
async fn live_endpoint_streams_the_order_then_its_updates() {
    let app = spawn_in_memory_app(vec![]).await;
    let order_id = place_order(&app.client, None).await;

    let response = reqwest::Client::new()
        .get(format!("http://{}/orders/{order_id}/live", app.address))
        .send()
        .await
        .expect("Live request should succeed.");
    assert_eq!(response.status().as_u16(), 200);
    let mut events = OrderEvents::new(response);

    let initial = events.next().await;
    assert_eq!(initial["order"]["status"], "pending");
    assert_eq!(initial["badge"]["icon"], "clock");

    let res = app
        .client
        .do_put(
            &format!("/orders/{order_id}/status"),
            json!({ "status": "preparing" }),
        )
        .await
        .expect("Status request should succeed.");
    assert_eq!(res.status(), StatusCode::OK);

    let update = events.next().await;
    assert_eq!(update["order"]["status"], "preparing");
    assert_eq!(update["badge"]["icon"], "chef-hat");
}

#[tokio::test]
async fn live_endpoint_for_a_missing_order_is_not_found() {
    let app = spawn_in_memory_app(vec![]).await;

    let res = app
        .client
        .do_get(&format!("/orders/{}/live", OrderId::new()))
        .await
        .expect("Live request should succeed.");

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_changes_reach_feed_subscribers() {
    let app = spawn_in_memory_app(vec![]).await;
    let order_id = place_order(&app.client, None).await;
    let mut subscription = app.state.feed.subscribe(order_id);

    app.client
        .do_put(
            &format!("/orders/{order_id}/status"),
            json!({ "status": "out_for_delivery" }),
        )
        .await
        .expect("Status request should succeed.");

    let order = subscription.recv().await.expect("Feed should be open.");
    assert_eq!(order.status, OrderStatus::OutForDelivery);
    assert_eq!(order.status.badge().icon, "truck");
}

#[sqlx::test]
#[serial]
#[ignore = "needs a running Postgres server"]
async fn database_changes_are_relayed_to_the_feed(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let (_, app_state) = start_test_server(connect_options.clone()).await;
    let url = format!("http://{}", app_state.settings.application.address());
    let client = httpc_test::new_client(url).expect("Expected client to be created.");

    assert_until_eq(
        || async {
            let status = client.do_get("/healthcheck").await.ok().map(|res| res.status());
            Ok::<_, ()>(status)
        },
        Some(StatusCode::OK),
        "Waiting for the web server",
    )
    .await;
    let order_id = place_order(&client, None).await;
    let mut subscription = app_state.feed.subscribe(order_id);

    sqlx::query("UPDATE orders SET status = 'preparing' WHERE id = $1")
        .bind(order_id)
        .execute(&app_state.pool)
        .await
        .expect("Update should succeed.");

    let order = subscription.recv().await.expect("Feed should be open.");
    assert_eq!(order.status, OrderStatus::Preparing);

    delete_order(&app_state.pool, order_id)
        .await
        .expect("Cleanup should succeed.");
    app_state.pool.close().await;
}
