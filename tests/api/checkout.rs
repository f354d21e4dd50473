use axum::http::StatusCode;
use food_delivery::domain::{
    CustomerId, OrderId, ProductId, RestaurantId,
    fake::{money, percentage_promo},
    orders::OrderStatus,
};
use serde_json::{Value, json};

use crate::test_utils::spawn_in_memory_app;

fn customer() -> Value {
    json!({
        "id": CustomerId::new(),
        "email": "sam@example.com",
        "first_name": "Sam",
    })
}

fn two_burgers(restaurant_id: RestaurantId) -> Value {
    json!({
        "productId": ProductId::new(),
        "name": "Smash burger",
        "unitPrice": "100.00",
        "quantity": 2,
        "restaurantId": restaurant_id,
        "restaurantName": "Burger Barn",
    })
}

fn field<'a>(redirect: &'a Value, name: &str) -> Option<&'a str> {
    redirect["fields"]
        .as_array()?
        .iter()
        .find(|field| field["name"] == name)?["value"]
        .as_str()
}

#[tokio::test]
async fn checkout_with_save10_charges_182_49() {
    let app = spawn_in_memory_app(vec![percentage_promo("SAVE10", money("10"), Some(money("50")))]).await;

    let res = app
        .client
        .do_post(
            "/checkout",
            json!({
                "customer": customer(),
                "items": [two_burgers(RestaurantId::new())],
                "promo_code": "save10",
                "delivery_fee": "2.49",
            }),
        )
        .await
        .expect("Checkout request should succeed.");
    assert_eq!(res.status(), StatusCode::OK);

    let redirect = res.json_body().expect("Redirect should be JSON.");
    assert_eq!(field(&redirect, "amount"), Some("182.49"));
    assert_eq!(
        redirect["action"],
        "https://sandbox.payfast.co.za/eng/process"
    );

    let order_id: OrderId = redirect["order_id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("Redirect should name the order.");
    assert_eq!(field(&redirect, "m_payment_id"), Some(order_id.to_string().as_str()));
    let order = app
        .state
        .orders
        .find_order(order_id)
        .await
        .expect("Lookup should succeed.")
        .expect("Order should exist.");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.discount, money("20.00"));
    assert_eq!(order.total, money("182.49"));
    assert_eq!(
        app.state
            .orders
            .order_lines(order_id)
            .await
            .expect("Lines should be readable.")
            .len(),
        1
    );
}

#[tokio::test]
async fn promo_below_minimum_leaves_the_total_at_202_49() {
    let app = spawn_in_memory_app(vec![percentage_promo("SAVE10", money("10"), Some(money("500")))]).await;

    let validation = app
        .client
        .do_post(
            "/promocodes/validate",
            json!({ "code": "SAVE10", "order_total": "200.00" }),
        )
        .await
        .expect("Validate request should succeed.")
        .json_body()
        .expect("Validation should be JSON.");
    assert_eq!(validation["valid"], false);
    assert_eq!(
        validation["error_message"],
        "Minimum order of 500.00 required for this promo code."
    );

    let rejected = app
        .client
        .do_post(
            "/checkout",
            json!({
                "customer": customer(),
                "items": [two_burgers(RestaurantId::new())],
                "promo_code": "SAVE10",
                "delivery_fee": "2.49",
            }),
        )
        .await
        .expect("Checkout request should succeed.");
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let redirect = app
        .client
        .do_post(
            "/checkout",
            json!({
                "customer": customer(),
                "items": [two_burgers(RestaurantId::new())],
                "delivery_fee": "2.49",
            }),
        )
        .await
        .expect("Checkout request should succeed.")
        .json_body()
        .expect("Redirect should be JSON.");
    assert_eq!(field(&redirect, "amount"), Some("202.49"));
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let app = spawn_in_memory_app(vec![]).await;

    let res = app
        .client
        .do_post("/checkout", json!({ "customer": customer(), "items": [] }))
        .await
        .expect("Checkout request should succeed.");

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json_body().expect("Error should be JSON.");
    assert_eq!(body["message"], "Your cart is empty.");
}

#[tokio::test]
async fn items_from_two_restaurants_are_rejected() {
    let app = spawn_in_memory_app(vec![]).await;

    let res = app
        .client
        .do_post(
            "/checkout",
            json!({
                "customer": customer(),
                "items": [two_burgers(RestaurantId::new()), two_burgers(RestaurantId::new())],
            }),
        )
        .await
        .expect("Checkout request should succeed.");

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn default_delivery_fee_comes_from_configuration() {
    let app = spawn_in_memory_app(vec![]).await;

    let redirect = app
        .client
        .do_post(
            "/checkout",
            json!({ "customer": customer(), "items": [two_burgers(RestaurantId::new())] }),
        )
        .await
        .expect("Checkout request should succeed.")
        .json_body()
        .expect("Redirect should be JSON.");

    assert_eq!(field(&redirect, "amount"), Some("202.49"));
}

fn priced_line(unit_price: &str, quantity: u32, restaurant_id: RestaurantId) -> Value {
    json!({
        "productId": ProductId::new(),
        "name": "Combo",
        "unitPrice": unit_price,
        "quantity": quantity,
        "restaurantId": restaurant_id,
        "restaurantName": "Burger Barn",
    })
}

#[tokio::test]
async fn negative_prices_cannot_lower_the_total() {
    let app = spawn_in_memory_app(vec![]).await;
    let restaurant_id = RestaurantId::new();

    let res = app
        .client
        .do_post(
            "/checkout",
            json!({
                "customer": customer(),
                "items": [
                    priced_line("150.00", 1, restaurant_id),
                    priced_line("-140.00", 1, restaurant_id),
                ],
            }),
        )
        .await
        .expect("Checkout request should succeed.");

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json_body().expect("Error should be JSON.");
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|message| message.contains("is not valid"))
    );
}

#[tokio::test]
async fn out_of_range_amounts_are_bad_requests() {
    let app = spawn_in_memory_app(vec![]).await;

    let huge_price = app
        .client
        .do_post(
            "/checkout",
            json!({
                "customer": customer(),
                "items": [priced_line("79228162514264337593543950335", 2, RestaurantId::new())],
            }),
        )
        .await
        .expect("Checkout request should succeed.");
    assert_eq!(huge_price.status(), StatusCode::BAD_REQUEST);

    let negative_fee = app
        .client
        .do_post(
            "/checkout",
            json!({
                "customer": customer(),
                "items": [two_burgers(RestaurantId::new())],
                "delivery_fee": "-50.00",
            }),
        )
        .await
        .expect("Checkout request should succeed.");
    assert_eq!(negative_fee.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn form_checkout_answers_with_a_self_submitting_page() {
    let app = spawn_in_memory_app(vec![]).await;

    let res = app
        .client
        .do_post(
            "/checkout/form",
            json!({ "customer": customer(), "items": [two_burgers(RestaurantId::new())] }),
        )
        .await
        .expect("Checkout request should succeed.");
    assert_eq!(res.status(), StatusCode::OK);

    let page = res.text_body().expect("Page should be text.");
    assert!(page.contains(r#"<form action="https://sandbox.payfast.co.za/eng/process" method="post">"#));
    assert!(page.contains(r#"name="amount" value="202.49""#));
}
