//! Live order status.
//!
//! Order changes are fanned out through an [`OrderFeed`]. A presenter subscribes for one order,
//! replaces its snapshot with whatever arrives and derives the badge shown to the customer.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    AppState,
    domain::{OrderId, RepositoryError},
    infra::ClientError,
};

use super::{Order, OrderRepository, OrderView, StatusBadge};

//------------------------- Web API ----------------------------

pub async fn live_order_endpoint(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ClientError> {
    let order_id = OrderId::from(order_id);
    let presenter = OrderStatusPresenter::load(state.orders, &state.feed, order_id).await?;

    let initial = OrderView::from(presenter.order().clone());
    let updates = stream::unfold(presenter, |mut presenter| async move {
        presenter.next_update().await?;
        let view = presenter.view();
        Some((view, presenter))
    });

    let events = stream::once(async move { initial })
        .chain(updates)
        .map(|view| Ok(to_event(&view)));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn to_event(view: &OrderView) -> Event {
    match Event::default().event("order").json_data(view) {
        Ok(event) => event,
        Err(e) => {
            error!("Could not serialise order {} for streaming: {e}", view.order.id);
            Event::default().event("error")
        }
    }
}

//------------------------- Feed ----------------------------

const FEED_CAPACITY: usize = 256;

/// In-process broadcast of changed orders.
#[derive(Debug, Clone)]
pub struct OrderFeed {
    sender: broadcast::Sender<Order>,
}

impl Default for OrderFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

impl OrderFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns how many subscriptions were listening.
    pub fn publish(&self, order: Order) -> usize {
        self.sender.send(order).unwrap_or(0)
    }

    pub fn subscribe(&self, order_id: OrderId) -> OrderSubscription {
        OrderSubscription {
            order_id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Changes to a single order. Dropping it unsubscribes.
#[derive(Debug)]
pub struct OrderSubscription {
    order_id: OrderId,
    receiver: broadcast::Receiver<Order>,
}

impl OrderSubscription {
    /// The next change to this order, or `None` once the feed is gone.
    /// Notifications missed because this subscriber fell behind are skipped.
    pub async fn recv(&mut self) -> Option<Order> {
        loop {
            match self.receiver.recv().await {
                Ok(order) if order.id == self.order_id => return Some(order),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Order {} subscription fell behind, skipped {skipped} notifications",
                        self.order_id
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

//------------------------- Presenter ----------------------------

#[derive(Debug)]
pub struct OrderStatusPresenter {
    order: Order,
    subscription: OrderSubscription,
}

impl OrderStatusPresenter {
    /// Starts from a snapshot the caller already has.
    pub fn new(order: Order, feed: &OrderFeed) -> Self {
        let subscription = feed.subscribe(order.id);
        Self {
            order,
            subscription,
        }
    }

    /// Subscribes first and then reads the current order so no change can slip in between.
    pub async fn load(
        orders: Arc<dyn OrderRepository>,
        feed: &OrderFeed,
        order_id: OrderId,
    ) -> Result<Self, RepositoryError> {
        let subscription = feed.subscribe(order_id);
        let order = orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(order_id.to_string()))?;
        Ok(Self {
            order,
            subscription,
        })
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn badge(&self) -> StatusBadge {
        self.order.status.badge()
    }

    pub fn view(&self) -> OrderView {
        OrderView::from(self.order.clone())
    }

    /// Replaces the snapshot wholesale. Transitions are not checked.
    pub fn apply(&mut self, order: Order) {
        if order.id == self.order.id {
            self.order = order;
        }
    }

    /// Waits for the next change and applies it. `None` once the feed is gone.
    pub async fn next_update(&mut self) -> Option<&Order> {
        let order = self.subscription.recv().await?;
        self.apply(order);
        Some(&self.order)
    }
}

//-------------------------- Tests -------------------------------
