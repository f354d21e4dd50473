use anyhow::{Context, anyhow};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use sqlx::postgres::PgListener;
use tokio::select;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tracing::{error, info, warn};

use crate::{
    AppState,
    domain::{
        OrderId,
        orders::{OrderFeed, OrderRepository},
    },
};

/// Channel the `orders` trigger notifies with the id of each changed order.
pub const ORDER_CHANGES_CHANNEL: &str = "order_changes";

/// Relays database order changes to the in-process [`OrderFeed`].
pub struct OrderListener {
    state: AppState,
}

impl OrderListener {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Log and restart the listener if the connection is lost.
    /// Uses exponential backoff if the problem persists.
    async fn listen(&self) -> Result<(), anyhow::Error> {
        (|| async { self.try_listen().await })
            .retry(ExponentialBuilder::default().with_max_times(usize::MAX))
            .sleep(tokio::time::sleep)
            .notify(|err, dur| error!("Restarting order listener due to: {err:?} after {dur:?}"))
            .await
    }

    async fn try_listen(&self) -> Result<(), anyhow::Error> {
        let mut listener = PgListener::connect_with(&self.state.pool)
            .await
            .context("Order listener could not connect to Postgres.")?;
        listener
            .listen(ORDER_CHANGES_CHANNEL)
            .await
            .with_context(|| format!("Could not listen on {ORDER_CHANGES_CHANNEL}."))?;
        info!("Order listener listening on {ORDER_CHANGES_CHANNEL}.");

        loop {
            let notification = listener
                .try_recv()
                .await
                .context("Order listener lost its connection.")?
                .ok_or_else(|| anyhow!("Order listener connection was closed."))?;

            let payload = notification.payload();
            match payload.parse::<OrderId>() {
                Ok(order_id) => {
                    relay(self.state.orders.as_ref(), &self.state.feed, order_id).await
                }
                Err(e) => warn!("Ignoring {ORDER_CHANGES_CHANNEL} payload {payload:?}: {e}"),
            }
        }
    }
}

/// Publishes the current state of a changed order. Orders deleted since the change are skipped.
pub async fn relay(orders: &dyn OrderRepository, feed: &OrderFeed, order_id: OrderId) {
    match orders.find_order(order_id).await {
        Ok(Some(order)) => {
            feed.publish(order);
        }
        Ok(None) => warn!("Changed order {order_id} no longer exists"),
        Err(e) => error!("Could not read changed order {order_id}: {e}"),
    }
}

#[async_trait]
impl IntoSubsystem<anyhow::Error> for OrderListener {
    async fn run(self, subsys: SubsystemHandle) -> Result<(), anyhow::Error> {
        select!(
            result = self.listen() => {
                error!("Order listener completed with {result:?}");
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Order listener shutdown.");
            }
        );
        Ok(())
    }
}

//-------------------------- Tests -------------------------------
