//! The backend order store: `orders` with their `order_items`.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context;
use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::ToSqlx;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{
    CustomerId, OrderId, OrderLineId, ProductId, PromoCodeId, RepositoryError, RestaurantId,
    promo::MemoryPromoRepository,
};

use super::{NewOrder, Order, OrderFeed, OrderLine, OrderStatus};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Writes the order and all of its lines, or nothing.
    async fn create_order(&self, new_order: NewOrder) -> Result<Order, RepositoryError>;

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError>;

    /// Moving an order with a promo from `pending` to `confirmed` also counts one use of the promo.
    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError>;
}

//------------------------- Postgres ----------------------------

#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = r#"id, order_number, customer_id, restaurant_id, status, subtotal,
    delivery_fee, service_fee, tax, discount, total, promo_code_id, created_at, updated_at"#;

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(&self, new_order: NewOrder) -> Result<Order, RepositoryError> {
        let order_id = OrderId::new();
        let now = Timestamp::now().to_sqlx();
        let totals = new_order.totals;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"INSERT INTO orders (id, order_number, customer_id, restaurant_id, status, subtotal,
                                  delivery_fee, service_fee, tax, discount, total, promo_code_id,
                                  created_at, updated_at)
               VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, $10, $11, $12, $12)
               RETURNING {ORDER_COLUMNS}"#
        ))
        .bind(order_id)
        .bind(&new_order.order_number)
        .bind(new_order.customer_id)
        .bind(new_order.restaurant_id)
        .bind(totals.subtotal)
        .bind(totals.delivery_fee)
        .bind(totals.service_fee)
        .bind(totals.tax)
        .bind(totals.discount)
        .bind(totals.total)
        .bind(new_order.promo_code_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for line in &new_order.lines {
            sqlx::query(
                r#"INSERT INTO order_items (id, order_id, product_id, name, unit_price, quantity,
                                            special_instructions)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            )
            .bind(OrderLineId::new())
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(&line.special_instructions)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, OrderLineRow>(
            r#"SELECT id, order_id, product_id, name, unit_price, quantity, special_instructions
               FROM order_items
               WHERE order_id = $1
               ORDER BY id"#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines.into_iter().map(OrderLine::from).collect())
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<(String,)> =
            sqlx::query_as("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((previous,)) = previous else {
            return Err(RepositoryError::NotFound(order_id.to_string()));
        };

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(status.as_str())
        .bind(Timestamp::now().to_sqlx())
        .fetch_one(&mut *tx)
        .await?;

        if OrderStatus::parse(&previous).is_pending() && status == OrderStatus::Confirmed {
            if let Some(promo_code_id) = row.promo_code_id {
                sqlx::query("UPDATE promo_codes SET used_count = used_count + 1 WHERE id = $1")
                    .bind(promo_code_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(row.into())
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    customer_id: CustomerId,
    restaurant_id: RestaurantId,
    status: String,
    subtotal: Decimal,
    delivery_fee: Decimal,
    service_fee: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    promo_code_id: Option<PromoCodeId>,
    created_at: jiff_sqlx::Timestamp,
    updated_at: jiff_sqlx::Timestamp,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            restaurant_id: row.restaurant_id,
            status: OrderStatus::parse(&row.status),
            subtotal: row.subtotal,
            delivery_fee: row.delivery_fee,
            service_fee: row.service_fee,
            tax: row.tax,
            discount: row.discount,
            total: row.total,
            promo_code_id: row.promo_code_id,
            created_at: row.created_at.to_jiff(),
            updated_at: row.updated_at.to_jiff(),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product_id: ProductId,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    special_instructions: Option<String>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            special_instructions: row.special_instructions,
        }
    }
}

/// Remove an order and its lines. Used by tests against a real database.
pub async fn delete_order(pool: &PgPool, order_id: OrderId) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Problem deleting lines of order {order_id}."))?;
    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Problem deleting order {order_id}."))?;
    tx.commit()
        .await
        .with_context(|| format!("Problem deleting order {order_id}."))
}

//------------------------- In memory ----------------------------

#[derive(Debug, Default)]
struct MemoryOrders {
    orders: HashMap<OrderId, Order>,
    lines: HashMap<OrderId, Vec<OrderLine>>,
}

/// Keeps orders in process. Changes are published to the feed when one is attached, the same way
/// the database trigger feeds the order listener.
#[derive(Debug, Default)]
pub struct MemoryOrderRepository {
    state: Mutex<MemoryOrders>,
    feed: Option<OrderFeed>,
    promos: Option<Arc<MemoryPromoRepository>>,
    failing: AtomicBool,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, feed: OrderFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_promos(mut self, promos: Arc<MemoryPromoRepository>) -> Self {
        self.promos = Some(promos);
        self
    }

    /// While set, every call fails with [`RepositoryError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().map(|state| state.orders.len()).unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn publish(&self, order: &Order) {
        if let Some(feed) = &self.feed {
            feed.publish(order.clone());
        }
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create_order(&self, new_order: NewOrder) -> Result<Order, RepositoryError> {
        self.check_available()?;

        let now = Timestamp::now();
        let totals = new_order.totals;
        let order = Order {
            id: OrderId::new(),
            order_number: new_order.order_number,
            customer_id: new_order.customer_id,
            restaurant_id: new_order.restaurant_id,
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            service_fee: totals.service_fee,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            promo_code_id: new_order.promo_code_id,
            created_at: now,
            updated_at: now,
        };
        let lines = new_order
            .lines
            .into_iter()
            .map(|line| OrderLine {
                id: OrderLineId::new(),
                order_id: order.id,
                product_id: line.product_id,
                name: line.name,
                unit_price: line.unit_price,
                quantity: line.quantity,
                special_instructions: line.special_instructions,
            })
            .collect();

        {
            let mut state = self.state.lock().map_err(|_| RepositoryError::Unavailable)?;
            state.orders.insert(order.id, order.clone());
            state.lines.insert(order.id, lines);
        }
        self.publish(&order);
        Ok(order)
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.check_available()?;
        let state = self.state.lock().map_err(|_| RepositoryError::Unavailable)?;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        self.check_available()?;
        let state = self.state.lock().map_err(|_| RepositoryError::Unavailable)?;
        Ok(state.lines.get(&order_id).cloned().unwrap_or_default())
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        self.check_available()?;

        let (order, confirmed_promo) = {
            let mut state = self.state.lock().map_err(|_| RepositoryError::Unavailable)?;
            let order = state
                .orders
                .get_mut(&order_id)
                .ok_or_else(|| RepositoryError::NotFound(order_id.to_string()))?;
            let confirmed_promo = if order.status.is_pending() && status == OrderStatus::Confirmed
            {
                order.promo_code_id
            } else {
                None
            };
            order.status = status;
            order.updated_at = Timestamp::now();
            (order.clone(), confirmed_promo)
        };

        if let (Some(promos), Some(promo_code_id)) = (&self.promos, confirmed_promo) {
            promos.increment_usage(promo_code_id);
        }
        self.publish(&order);
        Ok(order)
    }
}

//-------------------------- Tests -------------------------------
