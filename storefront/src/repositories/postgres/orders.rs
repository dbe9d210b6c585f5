// storefront/src/repositories/postgres/orders.rs

use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Order, OrderLine};
use crate::pagination::PageRequest;
use crate::repositories::{OrderRepository, StoreError, StoreResult};

const LINES_SQL: &str = "SELECT op.order_id, op.product_id, p.name AS product_name, op.amount, p.price_cents, p.discount \
   FROM order_products op JOIN products p ON p.id = op.product_id \
   WHERE op.order_id = ANY($1) ORDER BY op.order_id, op.position";

#[derive(Debug, Clone)]
pub struct PgOrderRepository {
  pool: PgPool,
}

impl PgOrderRepository {
  #[must_use]
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn attach_lines(&self, orders: &mut [Order]) -> StoreResult<()> {
    if orders.is_empty() {
      return Ok(());
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows = query_as::<_, LineRow>(LINES_SQL).bind(&ids).fetch_all(&self.pool).await?;

    let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for row in rows {
      by_order.entry(row.order_id).or_default().push(row.into_line());
    }
    for order in orders.iter_mut() {
      order.lines = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(())
  }
}

#[derive(FromRow)]
struct LineRow {
  order_id: Uuid,
  product_id: Uuid,
  product_name: String,
  amount: i32,
  price_cents: i64,
  discount: i32,
}

impl LineRow {
  fn into_line(self) -> OrderLine {
    OrderLine {
      product_id: self.product_id,
      product_name: self.product_name,
      amount: self.amount,
      price_cents: self.price_cents,
      discount: self.discount,
    }
  }
}

async fn lock_order(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreResult<Order> {
  query_as::<_, Order>("SELECT id, user_id, is_completed, created_at FROM orders WHERE id = $1 FOR UPDATE")
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| StoreError::NotFound("Order".to_string()))
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
  async fn create_order(&self, user_id: Uuid, lines: &[(Uuid, i32)]) -> StoreResult<Order> {
    let mut tx = self.pool.begin().await?;

    let order_id = Uuid::new_v4();
    query("INSERT INTO orders (id, user_id) VALUES ($1, $2)")
      .bind(order_id)
      .bind(user_id)
      .execute(&mut *tx)
      .await?;

    for (position, (product_id, amount)) in lines.iter().enumerate() {
      query("INSERT INTO order_products (order_id, product_id, position, amount) VALUES ($1, $2, $3, $4)")
        .bind(order_id)
        .bind(product_id)
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .bind(amount)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(%order_id, %user_id, lines = lines.len(), "Order persisted.");

    self
      .find_order(order_id)
      .await?
      .ok_or_else(|| StoreError::NotFound("Order".to_string()))
  }

  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let order = query_as::<_, Order>("SELECT id, user_id, is_completed, created_at FROM orders WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    let Some(order) = order else {
      return Ok(None);
    };
    let mut orders = [order];
    self.attach_lines(&mut orders).await?;
    let [order] = orders;
    Ok(Some(order))
  }

  async fn list_orders(&self, completed: Option<bool>, page: PageRequest) -> StoreResult<(Vec<Order>, i64)> {
    let total: i64 = query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::bool IS NULL OR is_completed = $1)")
      .bind(completed)
      .fetch_one(&self.pool)
      .await?;

    let mut orders = query_as::<_, Order>(
      "SELECT id, user_id, is_completed, created_at FROM orders \
       WHERE ($1::bool IS NULL OR is_completed = $1) \
       ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(completed)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&self.pool)
    .await?;
    self.attach_lines(&mut orders).await?;
    Ok((orders, total))
  }

  async fn complete_order(&self, id: Uuid) -> StoreResult<Order> {
    let mut tx = self.pool.begin().await?;

    let order = lock_order(&mut tx, id).await?;
    if order.is_completed {
      // Dropping the transaction rolls it back and releases the row lock.
      return Err(StoreError::AlreadyCompleted);
    }

    let moved = query(
      "UPDATE products AS p SET amount = p.amount - op.amount, reserved = p.reserved - op.amount \
       FROM order_products op WHERE op.order_id = $1 AND op.product_id = p.id",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    query("UPDATE orders SET is_completed = TRUE WHERE id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    tracing::info!(order_id = %id, products = moved.rows_affected(), "Order completed.");

    self
      .find_order(id)
      .await?
      .ok_or_else(|| StoreError::NotFound("Order".to_string()))
  }

  async fn restore_reservations(&self) -> StoreResult<u64> {
    let result = query(
      "UPDATE products p SET reserved = held.amount FROM ( \
         SELECT p2.id, COALESCE(SUM(op.amount) FILTER (WHERE o.is_completed = FALSE), 0)::INTEGER AS amount \
         FROM products p2 \
         LEFT JOIN order_products op ON op.product_id = p2.id \
         LEFT JOIN orders o ON o.id = op.order_id \
         GROUP BY p2.id \
       ) held \
       WHERE held.id = p.id AND p.reserved <> held.amount",
    )
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected())
  }
}
