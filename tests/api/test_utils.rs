use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use food_delivery::{
    AppState, construct_app_state,
    domain::{
        orders::MemoryOrderRepository,
        promo::{MemoryPromoRepository, PromoCode},
    },
    infra::{Settings, get_config_settings},
    start_server,
    subsystems::router,
};
use sqlx::postgres::PgConnectOptions;
use tokio::task::JoinHandle;

/// Asserts that a function returns an expected value or retries until it does.
/// Retries every 100ms if the values do not match.
/// Will fail immediately on an error or after 50 retries (5 seconds).
pub async fn assert_until_eq<F, Fut, T, E>(f: F, expected_value: T, label: &str)
where
    F: Fn() -> Fut,
    E: std::fmt::Debug,
    Fut: Future<Output = Result<T, E>>,
    T: PartialEq + std::fmt::Debug,
{
    let delay_ms = 100;
    let max_times = 50;
    let mut times: usize = 0;
    let mut result: T = f().await.unwrap();
    while times < max_times {
        times += 1;
        if result == expected_value {
            break;
        } else {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            println!("Retry #{times} {label}");
            result = f().await.unwrap();
        }
    }
    assert_eq!(result, expected_value);
}

pub fn test_settings() -> Settings {
    let mut settings = get_config_settings().expect("Could not read application configuration.");
    settings.verification.poll_interval_ms = 20;
    settings.verification.max_attempts = 10;
    settings.verification.timeout_secs = 2;
    settings.pricing.delivery_fee = "2.49".parse().expect("Valid amount.");
    settings.pricing.service_fee_percent = Default::default();
    settings.pricing.tax_percent = Default::default();
    settings
}

pub struct TestApp {
    pub address: SocketAddr,
    pub state: AppState,
    pub promos: Arc<MemoryPromoRepository>,
    pub client: httpc_test::Client,
}

/// Serves the router on an ephemeral port with in-memory repositories.
pub async fn spawn_in_memory_app(promos: Vec<PromoCode>) -> TestApp {
    let promos = Arc::new(MemoryPromoRepository::new(promos));
    let state = AppState::in_memory(test_settings(), MemoryOrderRepository::new(), promos.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Expected an ephemeral port.");
    let address = listener.local_addr().expect("Expected a local address.");
    let app = router(state.clone());
    tokio::spawn(async move { axum::serve(listener, app.into_make_service()).await });

    let client =
        httpc_test::new_client(format!("http://{address}")).expect("Expected client to be created.");
    TestApp {
        address,
        state,
        promos,
        client,
    }
}

pub async fn start_test_server(
    connect_options: PgConnectOptions,
) -> (JoinHandle<Result<(), anyhow::Error>>, AppState) {
    let mut settings = test_settings();
    settings.database.database_name = connect_options
        .get_database()
        .expect("Expected database name.")
        .into();
    let app_state = construct_app_state(settings)
        .await
        .expect("Expected AppState to be created.");
    let server_handle = tokio::task::spawn(start_server(app_state.clone()));

    (server_handle, app_state)
}
