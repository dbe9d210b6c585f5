// storefront/src/services/orders.rs

//! Admin view of placed orders.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderView};
use crate::pagination::{Page, PageRequest, ORDERS_PER_PAGE};
use crate::repositories::{OrderRepository, StoreError};

/// Newest first, optionally only open or only completed orders.
pub async fn list_orders(
  orders: &dyn OrderRepository,
  completed: Option<bool>,
  page: Option<i64>,
) -> Result<Page<OrderView>> {
  let req = PageRequest::new(page, ORDERS_PER_PAGE)?;
  let (items, total) = orders.list_orders(completed, req).await?;
  Ok(Page::new(items, req, total)?.map(OrderView::from))
}

pub async fn order_detail(orders: &dyn OrderRepository, id: Uuid) -> Result<Order> {
  orders
    .find_order(id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Ships the order: stock leaves the shelf, the order is closed for good.
#[instrument(name = "orders::complete_order", skip(orders), err(Display))]
pub async fn complete_order(orders: &dyn OrderRepository, id: Uuid) -> Result<Order> {
  let order = orders.complete_order(id).await.map_err(|e| match e {
    StoreError::NotFound(_) => AppError::NotFound("Order not found".to_string()),
    other => other.into(),
  })?;
  info!(order_id = %order.id, items = order.total_items(), "Order completed.");
  Ok(order)
}
