// storefront/src/services/cart.rs

//! Session cart with inventory reservation.
//!
//! Every cart line is backed by units counted in `Product.reserved`. Adding
//! reserves, removing and clearing release, checkout hands the reservation
//! over to the new order untouched.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Order, Product, ProductView};
use crate::repositories::{CatalogRepository, OrderRepository, StoreError};

/// Units a single add request may ask for.
pub const MAX_ADD_PER_REQUEST: i32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
  #[error("The amount must be a positive number")]
  InvalidAmount,

  #[error("Not enough product to add")]
  NotEnoughStock { available: i32, requested: i32 },

  #[error("Product not in cart")]
  NotInCart,

  #[error("Not enough product in cart to remove")]
  NotEnoughInCart { in_cart: i32, requested: i32 },

  #[error("Your cart is empty")]
  EmptyCart,

  /// The session owning the cart has ended.
  #[error("Please log in to access this page.")]
  Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
  lines: BTreeMap<Uuid, i32>,
  #[serde(skip)]
  closed: bool,
}

impl Cart {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn quantity_of(&self, product_id: Uuid) -> i32 {
    self.lines.get(&product_id).copied().unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  pub fn len(&self) -> usize {
    self.lines.len()
  }

  pub fn items_count(&self) -> i64 {
    self.lines.values().map(|&a| i64::from(a)).sum()
  }

  pub fn lines(&self) -> impl Iterator<Item = (Uuid, i32)> + '_ {
    self.lines.iter().map(|(&id, &amount)| (id, amount))
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  /// Refuses any further reservation through this cart.
  pub fn close(&mut self) {
    self.closed = true;
  }

  pub fn ensure_open(&self) -> Result<()> {
    if self.closed {
      return Err(CartError::Closed.into());
    }
    Ok(())
  }
}

#[instrument(name = "cart::add", skip(catalog, cart), fields(%product_id, amount))]
pub async fn add(catalog: &dyn CatalogRepository, cart: &mut Cart, product_id: Uuid, amount: i32) -> Result<Product> {
  cart.ensure_open()?;
  if amount <= 0 {
    return Err(CartError::InvalidAmount.into());
  }
  let product = catalog
    .find_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  let available = product.available();
  if amount > available {
    return Err(CartError::NotEnoughStock { available, requested: amount }.into());
  }

  let updated = catalog.adjust_reserved(product_id, amount).await?;
  *cart.lines.entry(product_id).or_insert(0) += amount;
  debug!(reserved = updated.reserved, available = updated.available(), "Units reserved.");
  Ok(updated)
}

#[instrument(name = "cart::remove", skip(catalog, cart), fields(%product_id, amount))]
pub async fn remove(catalog: &dyn CatalogRepository, cart: &mut Cart, product_id: Uuid, amount: i32) -> Result<Product> {
  if amount <= 0 {
    return Err(CartError::InvalidAmount.into());
  }
  let in_cart = cart.quantity_of(product_id);
  if in_cart == 0 {
    return Err(CartError::NotInCart.into());
  }
  if amount > in_cart {
    return Err(CartError::NotEnoughInCart { in_cart, requested: amount }.into());
  }

  let updated = match catalog.adjust_reserved(product_id, -amount).await {
    Ok(product) => product,
    Err(StoreError::NotFound(_)) => {
      // Product deleted while in the cart: nothing left to release.
      cart.lines.remove(&product_id);
      return Err(AppError::NotFound("Product not found".to_string()));
    }
    Err(e) => return Err(e.into()),
  };
  if in_cart == amount {
    cart.lines.remove(&product_id);
  } else {
    cart.lines.insert(product_id, in_cart - amount);
  }
  debug!(reserved = updated.reserved, available = updated.available(), "Units released.");
  Ok(updated)
}

/// Moves the cart quantity of a product to `new_amount`.
///
/// Returns `None` when the quantity was already there.
pub async fn update(
  catalog: &dyn CatalogRepository,
  cart: &mut Cart,
  product_id: Uuid,
  new_amount: i32,
) -> Result<Option<Product>> {
  cart.ensure_open()?;
  if new_amount < 0 {
    return Err(CartError::InvalidAmount.into());
  }
  let delta = new_amount - cart.quantity_of(product_id);
  match delta {
    0 => Ok(None),
    d if d > 0 => add(catalog, cart, product_id, d).await.map(Some),
    d => remove(catalog, cart, product_id, -d).await.map(Some),
  }
}

/// Releases every reservation held by the cart and empties it.
///
/// On a storage failure the lines not yet released stay in the cart.
/// Works on a closed cart too.
#[instrument(name = "cart::clear", skip(catalog, cart), fields(lines = cart.len()))]
pub async fn clear(catalog: &dyn CatalogRepository, cart: &mut Cart) -> Result<()> {
  let lines: Vec<(Uuid, i32)> = cart.lines().collect();
  for (product_id, amount) in lines {
    match catalog.adjust_reserved(product_id, -amount).await {
      Ok(_) => {}
      Err(StoreError::NotFound(_)) => debug!(%product_id, "Dropping line of a deleted product."),
      Err(e) => {
        warn!(%product_id, error = %e, "Failed to release reservation.");
        return Err(e.into());
      }
    }
    cart.lines.remove(&product_id);
  }
  Ok(())
}

/// Turns the cart into an order. The reservation moves with it.
#[instrument(name = "cart::checkout", skip(orders, cart), fields(%user_id, lines = cart.len()))]
pub async fn checkout(orders: &dyn OrderRepository, cart: &mut Cart, user_id: Uuid) -> Result<Order> {
  cart.ensure_open()?;
  if cart.is_empty() {
    return Err(CartError::EmptyCart.into());
  }
  let lines: Vec<(Uuid, i32)> = cart.lines().collect();
  let order = orders.create_order(user_id, &lines).await?;
  cart.lines.clear();
  Ok(order)
}

/// Checks an add request against the per-request limit.
pub fn check_add_request(amount: i32) -> Result<()> {
  if !(1..=MAX_ADD_PER_REQUEST).contains(&amount) {
    return Err(AppError::Validation(format!(
      "Amount must be between 1 and {}.",
      MAX_ADD_PER_REQUEST
    )));
  }
  Ok(())
}

/// An update may reach at most what is free plus what the cart holds.
pub fn check_update_request(product: &Product, in_cart: i32, new_amount: i32) -> Result<()> {
  let max = product.available() + in_cart;
  if !(0..=max).contains(&new_amount) {
    return Err(AppError::Validation(format!("Amount must be between 0 and {}.", max)));
  }
  Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
  pub product: ProductView,
  pub amount: i32,
  pub sum_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
  pub items: Vec<CartItem>,
  pub items_count: i64,
  pub total_sum_cents: i64,
}

/// Lines of products that still exist, in cart order.
pub async fn items(catalog: &dyn CatalogRepository, cart: &Cart) -> Result<Vec<CartItem>> {
  let ids: Vec<Uuid> = cart.lines.keys().copied().collect();
  let products = catalog.find_products(&ids).await?;
  let items = cart
    .lines()
    .filter_map(|(id, amount)| {
      products.iter().find(|p| p.id == id).map(|p| CartItem {
        product: ProductView::from(p),
        amount,
        sum_cents: i64::from(amount) * p.discount_price_cents(),
      })
    })
    .collect();
  Ok(items)
}

pub async fn total_sum_cents(catalog: &dyn CatalogRepository, cart: &Cart) -> Result<i64> {
  Ok(items(catalog, cart).await?.iter().map(|i| i.sum_cents).sum())
}

pub async fn summary(catalog: &dyn CatalogRepository, cart: &Cart) -> Result<CartSummary> {
  let items = items(catalog, cart).await?;
  Ok(CartSummary {
    items_count: cart.items_count(),
    total_sum_cents: items.iter().map(|i| i.sum_cents).sum(),
    items,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Label, NewProduct, ProductFilter, Taxonomy};
  use crate::pagination::PageRequest;
  use crate::repositories::memory::{seed_catalog, MemoryStore};
  use crate::repositories::StoreResult;

  #[tokio::test]
  async fn add_then_remove_restores_reservation() {
    let store = MemoryStore::new();
    let boot = seed_catalog(&store, &[("Boot", 5_000, 10, 0)]).await.remove(0);
    let mut cart = Cart::new();

    let after_add = add(&store, &mut cart, boot.id, 3).await.unwrap();
    assert_eq!(after_add.reserved, 3);
    assert_eq!(after_add.available(), 7);
    assert_eq!(cart.quantity_of(boot.id), 3);

    let after_remove = remove(&store, &mut cart, boot.id, 3).await.unwrap();
    assert_eq!(after_remove.reserved, 0);
    assert_eq!(after_remove.available(), 10);
    assert!(cart.is_empty());
  }

  #[tokio::test]
  async fn add_rejects_bad_amounts() {
    let store = MemoryStore::new();
    let boot = seed_catalog(&store, &[("Boot", 5_000, 2, 0)]).await.remove(0);
    let mut cart = Cart::new();

    let zero = add(&store, &mut cart, boot.id, 0).await;
    assert!(matches!(zero, Err(AppError::Cart(CartError::InvalidAmount))), "got {zero:?}");

    let too_many = add(&store, &mut cart, boot.id, 3).await;
    assert!(
      matches!(too_many, Err(AppError::Cart(CartError::NotEnoughStock { available: 2, requested: 3 }))),
      "got {too_many:?}"
    );

    let unknown = add(&store, &mut cart, Uuid::new_v4(), 1).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))), "got {unknown:?}");

    assert!(cart.is_empty());
    assert_eq!(store.product(boot.id).unwrap().reserved, 0);
  }

  #[tokio::test]
  async fn remove_rejects_what_the_cart_does_not_hold() {
    let store = MemoryStore::new();
    let boot = seed_catalog(&store, &[("Boot", 5_000, 5, 0)]).await.remove(0);
    let mut cart = Cart::new();

    let absent = remove(&store, &mut cart, boot.id, 1).await;
    assert!(matches!(absent, Err(AppError::Cart(CartError::NotInCart))), "got {absent:?}");

    add(&store, &mut cart, boot.id, 2).await.unwrap();
    let excess = remove(&store, &mut cart, boot.id, 3).await;
    assert!(matches!(excess, Err(AppError::Cart(CartError::NotEnoughInCart { .. }))), "got {excess:?}");

    let partial = remove(&store, &mut cart, boot.id, 1).await.unwrap();
    assert_eq!(partial.reserved, 1);
    assert_eq!(cart.quantity_of(boot.id), 1);
  }

  #[tokio::test]
  async fn update_routes_by_delta() {
    let store = MemoryStore::new();
    let boot = seed_catalog(&store, &[("Boot", 5_000, 10, 0)]).await.remove(0);
    let mut cart = Cart::new();

    update(&store, &mut cart, boot.id, 4).await.unwrap();
    assert_eq!(store.product(boot.id).unwrap().reserved, 4);

    update(&store, &mut cart, boot.id, 1).await.unwrap();
    assert_eq!(store.product(boot.id).unwrap().reserved, 1);

    assert!(update(&store, &mut cart, boot.id, 1).await.unwrap().is_none());

    update(&store, &mut cart, boot.id, 0).await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(store.product(boot.id).unwrap().reserved, 0);
  }

  #[tokio::test]
  async fn clear_releases_and_drops_deleted_products() {
    let store = MemoryStore::new();
    let products = seed_catalog(&store, &[("Boot", 5_000, 10, 0), ("Sandal", 2_000, 10, 0)]).await;
    let mut cart = Cart::new();
    add(&store, &mut cart, products[0].id, 2).await.unwrap();
    add(&store, &mut cart, products[1].id, 5).await.unwrap();
    store.delete_product(products[1].id).await.unwrap();

    clear(&store, &mut cart).await.unwrap();

    assert!(cart.is_empty());
    assert_eq!(store.product(products[0].id).unwrap().reserved, 0);
  }

  #[tokio::test]
  async fn checkout_keeps_reservation_and_empties_cart() {
    let store = MemoryStore::new();
    let products = seed_catalog(&store, &[("Boot", 5_000, 10, 10), ("Sandal", 2_000, 10, 0)]).await;
    let user_id = crate::repositories::memory::seed_user(&store, "jo", "jo@example.com", true).await.id;
    let mut cart = Cart::new();

    let empty = checkout(&store, &mut cart, user_id).await;
    assert!(matches!(empty, Err(AppError::Cart(CartError::EmptyCart))), "got {empty:?}");
    assert_eq!(store.order_count(), 0);

    add(&store, &mut cart, products[0].id, 2).await.unwrap();
    add(&store, &mut cart, products[1].id, 1).await.unwrap();
    let order = checkout(&store, &mut cart, user_id).await.unwrap();

    assert!(cart.is_empty());
    assert!(!order.is_completed);
    assert_eq!(order.total_items(), 3);
    assert_eq!(order.total_sum_cents(), 2 * 4_500 + 2_000);
    assert_eq!(store.product(products[0].id).unwrap().reserved, 2);
    assert_eq!(store.product(products[1].id).unwrap().reserved, 1);
  }

  #[tokio::test]
  async fn completing_an_order_moves_units_out_of_stock_once() {
    let store = MemoryStore::new();
    let boot = seed_catalog(&store, &[("Boot", 5_000, 10, 0)]).await.remove(0);
    let user_id = crate::repositories::memory::seed_user(&store, "jo", "jo@example.com", true).await.id;
    let mut cart = Cart::new();
    add(&store, &mut cart, boot.id, 3).await.unwrap();
    let order = checkout(&store, &mut cart, user_id).await.unwrap();

    let completed = store.complete_order(order.id).await.unwrap();
    assert!(completed.is_completed);
    let stocked = store.product(boot.id).unwrap();
    assert_eq!((stocked.amount, stocked.reserved, stocked.available()), (7, 0, 7));

    let again = store.complete_order(order.id).await;
    assert!(matches!(again, Err(StoreError::AlreadyCompleted)), "got {again:?}");
    assert_eq!(store.product(boot.id).unwrap().amount, 7);
  }

  #[tokio::test]
  async fn closed_cart_refuses_new_reservations() {
    let store = MemoryStore::new();
    let boot = seed_catalog(&store, &[("Boot", 5_000, 10, 0)]).await.remove(0);
    let mut cart = Cart::new();
    add(&store, &mut cart, boot.id, 2).await.unwrap();

    clear(&store, &mut cart).await.unwrap();
    cart.close();

    assert!(cart.is_closed());
    for attempt in [
      add(&store, &mut cart, boot.id, 1).await.map(|_| ()),
      update(&store, &mut cart, boot.id, 4).await.map(|_| ()),
    ] {
      assert!(matches!(attempt, Err(AppError::Cart(CartError::Closed))), "got {attempt:?}");
    }
    assert_eq!(store.product(boot.id).unwrap().reserved, 0);
    assert!(clear(&store, &mut cart).await.is_ok());
  }

  /// Answers `find_product` from a snapshot taken earlier, the way a
  /// concurrent request sees stock before another cart's reservation lands.
  struct StaleReads<'a> {
    store: &'a MemoryStore,
    snapshot: Product,
  }

  #[async_trait::async_trait]
  impl<'a> CatalogRepository for StaleReads<'a> {
    async fn list_labels(&self, kind: Taxonomy) -> StoreResult<Vec<Label>> {
      self.store.list_labels(kind).await
    }
    async fn find_label(&self, kind: Taxonomy, id: Uuid) -> StoreResult<Option<Label>> {
      self.store.find_label(kind, id).await
    }
    async fn find_label_by_name(&self, kind: Taxonomy, name: &str) -> StoreResult<Option<Label>> {
      self.store.find_label_by_name(kind, name).await
    }
    async fn create_label(&self, kind: Taxonomy, name: &str) -> StoreResult<Label> {
      self.store.create_label(kind, name).await
    }
    async fn rename_label(&self, kind: Taxonomy, id: Uuid, name: &str) -> StoreResult<Label> {
      self.store.rename_label(kind, id, name).await
    }
    async fn delete_label(&self, kind: Taxonomy, id: Uuid) -> StoreResult<()> {
      self.store.delete_label(kind, id).await
    }
    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> StoreResult<(Vec<Product>, i64)> {
      self.store.list_products(filter, page).await
    }
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
      Ok((id == self.snapshot.id).then(|| self.snapshot.clone()))
    }
    async fn find_product_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
      self.store.find_product_by_name(name).await
    }
    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
      self.store.find_products(ids).await
    }
    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
      self.store.create_product(product).await
    }
    async fn update_product(&self, id: Uuid, product: NewProduct) -> StoreResult<Product> {
      self.store.update_product(id, product).await
    }
    async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
      self.store.delete_product(id).await
    }
    async fn adjust_reserved(&self, id: Uuid, delta: i32) -> StoreResult<Product> {
      self.store.adjust_reserved(id, delta).await
    }
  }

  #[tokio::test]
  async fn oversell_race_is_stopped_by_the_stock_constraint() {
    let store = MemoryStore::new();
    let boot = seed_catalog(&store, &[("Boot", 5_000, 10, 0)]).await.remove(0);
    let racing = StaleReads { store: &store, snapshot: boot.clone() };
    let mut first = Cart::new();
    let mut second = Cart::new();

    add(&store, &mut first, boot.id, 8).await.unwrap();
    let late = add(&racing, &mut second, boot.id, 5).await;

    assert!(
      matches!(late, Err(AppError::Integrity(ref c)) if c == "product_reserved_within_amount_constraint"),
      "got {late:?}"
    );
    assert!(second.is_empty());
    assert_eq!(first.quantity_of(boot.id), 8);
    assert_eq!(store.product(boot.id).unwrap().reserved, 8);
  }

  #[tokio::test]
  async fn summary_sums_discounted_lines() {
    let store = MemoryStore::new();
    let products = seed_catalog(&store, &[("Boot", 1_999, 10, 15), ("Sandal", 2_000, 10, 0)]).await;
    let mut cart = Cart::new();
    add(&store, &mut cart, products[0].id, 3).await.unwrap();
    add(&store, &mut cart, products[1].id, 2).await.unwrap();

    let summary = summary(&store, &cart).await.unwrap();

    assert_eq!(summary.items_count, 5);
    assert_eq!(summary.items.len(), 2);
    // 19.99 at 15% off rounds to 16.99
    assert_eq!(summary.total_sum_cents, 3 * 1_699 + 2 * 2_000);
    assert_eq!(total_sum_cents(&store, &cart).await.unwrap(), summary.total_sum_cents);
  }

  #[test]
  fn request_limits() {
    assert!(check_add_request(1).is_ok());
    assert!(check_add_request(100).is_ok());
    assert!(check_add_request(0).is_err());
    assert!(check_add_request(101).is_err());
  }
}
