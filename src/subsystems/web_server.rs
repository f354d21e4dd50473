use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use futures::FutureExt;
use tokio::select;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{AppState, infra::ClientError};

pub struct WebServer {
    state: AppState,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl IntoSubsystem<anyhow::Error> for WebServer {
    async fn run(self, subsys: SubsystemHandle) -> Result<(), anyhow::Error> {
        let address = self.state.settings.application.address();
        let socket_addr: SocketAddr = address.parse().inspect_err(|e| {
            error!(
                "Could not parse server address {address}.\nCheck application host and port in configuration settings.\nFailed with {e}"
            )
        })?;

        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .inspect_err(|e| {
                error!("Could not bind socket address {socket_addr}. Failed with {e}")
            })?;

        info!("Web server starting on http://{socket_addr}");
        select!(
            result = axum::serve(listener, app.into_make_service())
                .into_future()
                .map(|result| result.map_err(anyhow::Error::new)) => {
                error!("Web server completed with {result:?}");
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Web server shutdown");
            }
        );
        Ok(())
    }
}

/// Every HTTP route the service exposes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check_endpoint))
        .route(
            "/promocodes/validate",
            post(crate::domain::promo::validate_promo_endpoint),
        )
        .route("/checkout", post(crate::domain::orders::checkout_endpoint))
        .route(
            "/checkout/form",
            post(crate::domain::orders::checkout_form_endpoint),
        )
        .route(
            "/orders/{order_id}",
            get(crate::domain::orders::get_order_endpoint),
        )
        .route(
            "/orders/{order_id}/status",
            put(crate::domain::orders::update_status_endpoint),
        )
        .route(
            "/orders/{order_id}/live",
            get(crate::domain::orders::live_order_endpoint),
        )
        .route(
            "/payments/return/{order_id}",
            get(crate::domain::orders::payment_return_endpoint),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check_endpoint(
    State(_app_state): State<AppState>,
) -> Result<Json<String>, ClientError> {
    Ok(Json("Ok".to_owned()))
}

