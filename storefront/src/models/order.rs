// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::product::discount_price_cents;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderLine {
  pub product_id: Uuid,
  pub product_name: String,
  pub amount: i32,
  pub price_cents: i64,
  pub discount: i32,
}

impl OrderLine {
  pub fn discount_price_cents(&self) -> i64 {
    discount_price_cents(self.price_cents, self.discount)
  }

  pub fn sum_cents(&self) -> i64 {
    i64::from(self.amount) * self.discount_price_cents()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub is_completed: bool,
  pub created_at: DateTime<Utc>,
  #[sqlx(skip)]
  pub lines: Vec<OrderLine>,
}

impl Order {
  pub fn total_items(&self) -> i64 {
    self.lines.iter().map(|l| i64::from(l.amount)).sum()
  }

  pub fn total_sum_cents(&self) -> i64 {
    self.lines.iter().map(OrderLine::sum_cents).sum()
  }
}

/// Order with its totals, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
  #[serde(flatten)]
  pub order: Order,
  pub total_items: i64,
  pub total_sum_cents: i64,
}

impl From<Order> for OrderView {
  fn from(order: Order) -> Self {
    Self {
      total_items: order.total_items(),
      total_sum_cents: order.total_sum_cents(),
      order,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(amount: i32, price_cents: i64, discount: i32) -> OrderLine {
    OrderLine {
      product_id: Uuid::new_v4(),
      product_name: "item".to_string(),
      amount,
      price_cents,
      discount,
    }
  }

  #[test]
  fn totals_sum_quantities_and_discounted_prices() {
    let order = Order {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      is_completed: false,
      created_at: Utc::now(),
      lines: vec![line(2, 1_000, 10), line(3, 333, 0)],
    };

    assert_eq!(order.total_items(), 5);
    assert_eq!(order.total_sum_cents(), 2 * 900 + 3 * 333);

    let view = OrderView::from(order);
    assert_eq!(view.total_sum_cents, 2_799);
  }
}
