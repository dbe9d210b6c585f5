// storefront/src/repositories/memory.rs

//! In-process store with the same constraints as the SQL schema.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{
  AccountToken, Label, NewProduct, NewUser, Order, OrderLine, Product, ProductFilter, Taxonomy, TokenPurpose, User,
};
use crate::pagination::PageRequest;
use crate::repositories::{CatalogRepository, OrderRepository, StoreError, StoreResult, UserRepository};

#[derive(Default)]
struct Inner {
  brands: Vec<Label>,
  categories: Vec<Label>,
  products: Vec<Product>,
  users: Vec<User>,
  tokens: Vec<AccountToken>,
  orders: Vec<StoredOrder>,
}

#[derive(Clone)]
struct StoredOrder {
  order: Order,
  lines: Vec<(Uuid, i32)>,
}

impl Inner {
  fn labels(&mut self, kind: Taxonomy) -> &mut Vec<Label> {
    match kind {
      Taxonomy::Brand => &mut self.brands,
      Taxonomy::Category => &mut self.categories,
    }
  }

  fn product_mut(&mut self, id: Uuid) -> StoreResult<&mut Product> {
    self
      .products
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or_else(|| StoreError::NotFound("Product".to_string()))
  }

  fn check_product(&self, product: &Product, ignore: Option<Uuid>) -> StoreResult<()> {
    if self.products.iter().any(|p| p.name == product.name && Some(p.id) != ignore) {
      return Err(StoreError::AlreadyExists("products_name_key".to_string()));
    }
    if !self.brands.iter().any(|b| b.id == product.brand_id)
      || !self.categories.iter().any(|c| c.id == product.category_id)
    {
      return Err(StoreError::InvalidReference);
    }
    check_stock(product)
  }

  fn render(&self, stored: &StoredOrder) -> Order {
    let mut order = stored.order.clone();
    order.lines = stored
      .lines
      .iter()
      .filter_map(|(product_id, amount)| {
        self.products.iter().find(|p| p.id == *product_id).map(|p| OrderLine {
          product_id: p.id,
          product_name: p.name.clone(),
          amount: *amount,
          price_cents: p.price_cents,
          discount: p.discount,
        })
      })
      .collect();
    order
  }

  fn drop_orphans(&mut self) {
    let products: Vec<Uuid> = self.products.iter().map(|p| p.id).collect();
    for stored in &mut self.orders {
      stored.lines.retain(|(id, _)| products.contains(id));
    }
  }
}

fn check_stock(p: &Product) -> StoreResult<()> {
  if p.price_cents < 1 {
    return Err(StoreError::Integrity("product_positive_price_constraint".to_string()));
  }
  if p.amount < 0 {
    return Err(StoreError::Integrity("product_non_negative_amount_constraint".to_string()));
  }
  if p.reserved < 0 || p.reserved > p.amount {
    return Err(StoreError::Integrity("product_reserved_within_amount_constraint".to_string()));
  }
  if !(0..=99).contains(&p.discount) {
    return Err(StoreError::Integrity("valid_product_discount_constraint".to_string()));
  }
  Ok(())
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current copy of a product, for assertions.
  pub fn product(&self, id: Uuid) -> Option<Product> {
    self.inner.lock().products.iter().find(|p| p.id == id).cloned()
  }

  pub fn user_by_email(&self, email: &str) -> Option<User> {
    self.inner.lock().users.iter().find(|u| u.email == email).cloned()
  }

  pub fn tokens_for(&self, user_id: Uuid, purpose: TokenPurpose) -> Vec<AccountToken> {
    let inner = self.inner.lock();
    inner
      .tokens
      .iter()
      .filter(|t| t.user_id == user_id && t.purpose == purpose)
      .cloned()
      .collect()
  }

  /// Pushes every token of a user past its deadline.
  pub fn expire_tokens(&self, user_id: Uuid) {
    let past = Utc::now() - Duration::seconds(1);
    for token in self.inner.lock().tokens.iter_mut().filter(|t| t.user_id == user_id) {
      token.expires_at = past;
    }
  }

  pub fn order_count(&self) -> usize {
    self.inner.lock().orders.len()
  }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
  async fn list_labels(&self, kind: Taxonomy) -> StoreResult<Vec<Label>> {
    let mut labels = self.inner.lock().labels(kind).clone();
    labels.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(labels)
  }

  async fn find_label(&self, kind: Taxonomy, id: Uuid) -> StoreResult<Option<Label>> {
    Ok(self.inner.lock().labels(kind).iter().find(|l| l.id == id).cloned())
  }

  async fn find_label_by_name(&self, kind: Taxonomy, name: &str) -> StoreResult<Option<Label>> {
    Ok(self.inner.lock().labels(kind).iter().find(|l| l.name == name).cloned())
  }

  async fn create_label(&self, kind: Taxonomy, name: &str) -> StoreResult<Label> {
    let mut inner = self.inner.lock();
    let labels = inner.labels(kind);
    if labels.iter().any(|l| l.name == name) {
      return Err(StoreError::AlreadyExists(format!("{} with such name", kind.title())));
    }
    let label = Label {
      id: Uuid::new_v4(),
      name: name.to_string(),
    };
    labels.push(label.clone());
    Ok(label)
  }

  async fn rename_label(&self, kind: Taxonomy, id: Uuid, name: &str) -> StoreResult<Label> {
    let mut inner = self.inner.lock();
    let labels = inner.labels(kind);
    if labels.iter().any(|l| l.name == name && l.id != id) {
      return Err(StoreError::AlreadyExists(format!("{} with such name", kind.title())));
    }
    let label = labels
      .iter_mut()
      .find(|l| l.id == id)
      .ok_or_else(|| StoreError::NotFound(kind.title().to_string()))?;
    label.name = name.to_string();
    Ok(label.clone())
  }

  async fn delete_label(&self, kind: Taxonomy, id: Uuid) -> StoreResult<()> {
    let mut inner = self.inner.lock();
    let labels = inner.labels(kind);
    let before = labels.len();
    labels.retain(|l| l.id != id);
    if labels.len() == before {
      return Err(StoreError::NotFound(kind.title().to_string()));
    }
    inner.products.retain(|p| match kind {
      Taxonomy::Brand => p.brand_id != id,
      Taxonomy::Category => p.category_id != id,
    });
    inner.drop_orphans();
    Ok(())
  }

  async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> StoreResult<(Vec<Product>, i64)> {
    let inner = self.inner.lock();
    let brand_id = filter
      .brand_name
      .as_deref()
      .map(|name| inner.brands.iter().find(|b| b.name == name).map(|b| b.id));
    let category_id = filter
      .category_name
      .as_deref()
      .map(|name| inner.categories.iter().find(|c| c.name == name).map(|c| c.id));

    let mut matching: Vec<Product> = inner
      .products
      .iter()
      .filter(|p| brand_id.map_or(true, |id| id == Some(p.brand_id)))
      .filter(|p| category_id.map_or(true, |id| id == Some(p.category_id)))
      .cloned()
      .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name));

    let total = matching.len() as i64;
    let items = matching
      .into_iter()
      .skip(page.offset() as usize)
      .take(page.limit() as usize)
      .collect();
    Ok((items, total))
  }

  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.product(id))
  }

  async fn find_product_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
    Ok(self.inner.lock().products.iter().find(|p| p.name == name).cloned())
  }

  async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
    let inner = self.inner.lock();
    Ok(inner.products.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
  }

  async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
    let mut inner = self.inner.lock();
    let created = Product {
      id: Uuid::new_v4(),
      name: product.name,
      short_description: product.short_description,
      full_description: product.full_description,
      price_cents: product.price_cents,
      amount: product.amount,
      reserved: 0,
      discount: product.discount,
      brand_id: product.brand_id,
      category_id: product.category_id,
      created_at: Utc::now(),
    };
    inner.check_product(&created, None)?;
    inner.products.push(created.clone());
    Ok(created)
  }

  async fn update_product(&self, id: Uuid, product: NewProduct) -> StoreResult<Product> {
    let mut inner = self.inner.lock();
    let mut updated = inner.product_mut(id)?.clone();
    updated.name = product.name;
    updated.short_description = product.short_description;
    updated.full_description = product.full_description;
    updated.price_cents = product.price_cents;
    updated.amount = product.amount;
    updated.discount = product.discount;
    updated.brand_id = product.brand_id;
    updated.category_id = product.category_id;
    inner.check_product(&updated, Some(id))?;
    *inner.product_mut(id)? = updated.clone();
    Ok(updated)
  }

  async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
    let mut inner = self.inner.lock();
    let before = inner.products.len();
    inner.products.retain(|p| p.id != id);
    if inner.products.len() == before {
      return Err(StoreError::NotFound("Product".to_string()));
    }
    inner.drop_orphans();
    Ok(())
  }

  async fn adjust_reserved(&self, id: Uuid, delta: i32) -> StoreResult<Product> {
    let mut inner = self.inner.lock();
    let product = inner.product_mut(id)?;
    let mut next = product.clone();
    next.reserved += delta;
    check_stock(&next)?;
    *product = next.clone();
    Ok(next)
  }
}

#[async_trait]
impl UserRepository for MemoryStore {
  async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
    Ok(self.inner.lock().users.iter().find(|u| u.id == id).cloned())
  }

  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    Ok(self.user_by_email(email))
  }

  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
    Ok(self.inner.lock().users.iter().find(|u| u.username == username).cloned())
  }

  async fn create_user(&self, user: NewUser) -> StoreResult<User> {
    let mut inner = self.inner.lock();
    if inner.users.iter().any(|u| u.username == user.username) {
      return Err(StoreError::AlreadyExists("User with such username".to_string()));
    }
    if inner.users.iter().any(|u| u.email == user.email) {
      return Err(StoreError::AlreadyExists("User with such email".to_string()));
    }
    let created = User {
      id: Uuid::new_v4(),
      username: user.username,
      email: user.email,
      password_hash: user.password_hash,
      confirmed: user.confirmed,
      is_superuser: user.is_superuser,
      created_at: Utc::now(),
    };
    inner.users.push(created.clone());
    Ok(created)
  }

  async fn set_confirmed(&self, id: Uuid) -> StoreResult<()> {
    let mut inner = self.inner.lock();
    let user = inner
      .users
      .iter_mut()
      .find(|u| u.id == id)
      .ok_or_else(|| StoreError::NotFound("User".to_string()))?;
    user.confirmed = true;
    Ok(())
  }

  async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
    let mut inner = self.inner.lock();
    let user = inner
      .users
      .iter_mut()
      .find(|u| u.id == id)
      .ok_or_else(|| StoreError::NotFound("User".to_string()))?;
    user.password_hash = password_hash.to_string();
    Ok(())
  }

  async fn store_token(&self, token: &AccountToken) -> StoreResult<()> {
    let mut inner = self.inner.lock();
    if !inner.users.iter().any(|u| u.id == token.user_id) {
      return Err(StoreError::InvalidReference);
    }
    inner.tokens.push(token.clone());
    Ok(())
  }

  async fn find_token(&self, token: &str, purpose: TokenPurpose) -> StoreResult<Option<AccountToken>> {
    let inner = self.inner.lock();
    Ok(inner.tokens.iter().find(|t| t.token == token && t.purpose == purpose).cloned())
  }

  async fn revoke_tokens(&self, user_id: Uuid, purpose: TokenPurpose) -> StoreResult<u64> {
    let mut inner = self.inner.lock();
    let before = inner.tokens.len();
    inner.tokens.retain(|t| !(t.user_id == user_id && t.purpose == purpose));
    Ok((before - inner.tokens.len()) as u64)
  }
}

#[async_trait]
impl OrderRepository for MemoryStore {
  async fn create_order(&self, user_id: Uuid, lines: &[(Uuid, i32)]) -> StoreResult<Order> {
    let mut inner = self.inner.lock();
    if !inner.users.iter().any(|u| u.id == user_id)
      || lines.iter().any(|(id, _)| !inner.products.iter().any(|p| p.id == *id))
    {
      return Err(StoreError::InvalidReference);
    }
    if lines.iter().any(|(_, amount)| *amount <= 0) {
      return Err(StoreError::Integrity("order_product_positive_amount_constraint".to_string()));
    }
    // Keeps newest-first ordering stable when timestamps tie.
    let created_at = inner
      .orders
      .iter()
      .map(|o| o.order.created_at)
      .max()
      .map_or_else(Utc::now, |latest| latest.max(Utc::now()) + Duration::microseconds(1));
    let stored = StoredOrder {
      order: Order {
        id: Uuid::new_v4(),
        user_id,
        is_completed: false,
        created_at,
        lines: Vec::new(),
      },
      lines: lines.to_vec(),
    };
    inner.orders.push(stored.clone());
    Ok(inner.render(&stored))
  }

  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let inner = self.inner.lock();
    Ok(inner.orders.iter().find(|o| o.order.id == id).map(|o| inner.render(o)))
  }

  async fn list_orders(&self, completed: Option<bool>, page: PageRequest) -> StoreResult<(Vec<Order>, i64)> {
    let inner = self.inner.lock();
    let mut matching: Vec<&StoredOrder> = inner
      .orders
      .iter()
      .filter(|o| completed.map_or(true, |c| o.order.is_completed == c))
      .collect();
    matching.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
    let total = matching.len() as i64;
    let items = matching
      .into_iter()
      .skip(page.offset() as usize)
      .take(page.limit() as usize)
      .map(|o| inner.render(o))
      .collect();
    Ok((items, total))
  }

  async fn complete_order(&self, id: Uuid) -> StoreResult<Order> {
    let mut inner = self.inner.lock();
    let idx = inner
      .orders
      .iter()
      .position(|o| o.order.id == id)
      .ok_or_else(|| StoreError::NotFound("Order".to_string()))?;
    if inner.orders[idx].order.is_completed {
      return Err(StoreError::AlreadyCompleted);
    }

    // Validate every line before mutating anything, like a rolled back transaction.
    let lines = inner.orders[idx].lines.clone();
    let mut updated = Vec::with_capacity(lines.len());
    for (product_id, amount) in &lines {
      let mut p = inner.product_mut(*product_id)?.clone();
      p.amount -= amount;
      p.reserved -= amount;
      check_stock(&p)?;
      updated.push(p);
    }
    for p in updated {
      let id = p.id;
      *inner.product_mut(id)? = p;
    }
    inner.orders[idx].order.is_completed = true;
    let stored = inner.orders[idx].clone();
    Ok(inner.render(&stored))
  }

  async fn restore_reservations(&self) -> StoreResult<u64> {
    let mut inner = self.inner.lock();
    let mut held: HashMap<Uuid, i32> = HashMap::new();
    for stored in inner.orders.iter().filter(|o| !o.order.is_completed) {
      for (product_id, amount) in &stored.lines {
        *held.entry(*product_id).or_insert(0) += amount;
      }
    }
    let mut changed = 0;
    for p in inner.products.iter_mut() {
      let reserved = held.get(&p.id).copied().unwrap_or(0);
      if p.reserved != reserved {
        p.reserved = reserved;
        check_stock(p)?;
        changed += 1;
      }
    }
    Ok(changed)
  }
}

/// Seeds one brand, one category and products with the given stock.
pub async fn seed_catalog(store: &MemoryStore, stock: &[(&str, i64, i32, i32)]) -> Vec<Product> {
  let brand = store.create_label(Taxonomy::Brand, "Acme").await.expect("brand");
  let category = store.create_label(Taxonomy::Category, "Shoes").await.expect("category");
  let mut products = Vec::new();
  for (name, price_cents, amount, discount) in stock {
    let product = store
      .create_product(NewProduct {
        name: (*name).to_string(),
        short_description: format!("{} short description", name),
        full_description: format!("{} full description", name),
        price_cents: *price_cents,
        amount: *amount,
        discount: *discount,
        brand_id: brand.id,
        category_id: category.id,
      })
      .await
      .expect("product");
    products.push(product);
  }
  products
}

/// Password of every user made by [`seed_user`] and [`seed_superuser`].
pub const SEED_PASSWORD: &str = "secret-pass";

pub async fn seed_user(store: &MemoryStore, username: &str, email: &str, confirmed: bool) -> User {
  insert_user(store, username, email, confirmed, false).await
}

pub async fn seed_superuser(store: &MemoryStore, username: &str, email: &str) -> User {
  insert_user(store, username, email, true, true).await
}

async fn insert_user(store: &MemoryStore, username: &str, email: &str, confirmed: bool, is_superuser: bool) -> User {
  let password_hash = crate::services::auth_service::hash_password(SEED_PASSWORD).expect("hash");
  store
    .create_user(NewUser {
      username: username.to_string(),
      email: email.to_string(),
      password_hash,
      confirmed,
      is_superuser,
    })
    .await
    .expect("user")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn adjust_reserved_enforces_reservation_bounds() {
    let store = MemoryStore::new();
    let product = seed_catalog(&store, &[("Boot", 5_000, 3, 0)]).await.remove(0);

    assert_eq!(store.adjust_reserved(product.id, 3).await.unwrap().available(), 0);
    let over = store.adjust_reserved(product.id, 1).await;
    assert!(matches!(over, Err(StoreError::Integrity(ref c)) if c == "product_reserved_within_amount_constraint"));
    let under = store.adjust_reserved(product.id, -4).await;
    assert!(matches!(under, Err(StoreError::Integrity(_))));
    assert_eq!(store.product(product.id).unwrap().reserved, 3);
  }

  #[tokio::test]
  async fn deleting_a_brand_cascades_to_its_products() {
    let store = MemoryStore::new();
    let product = seed_catalog(&store, &[("Boot", 5_000, 3, 0)]).await.remove(0);

    store.delete_label(Taxonomy::Brand, product.brand_id).await.unwrap();

    assert!(store.product(product.id).is_none());
    assert!(store.list_labels(Taxonomy::Category).await.unwrap().len() == 1);
  }

  #[tokio::test]
  async fn restoring_reservations_keeps_only_open_orders() {
    let store = MemoryStore::new();
    let mut products = seed_catalog(&store, &[("Boot", 5_000, 10, 0), ("Sock", 500, 10, 0)]).await;
    let sock = products.remove(1);
    let boot = products.remove(0);
    let user = seed_user(&store, "jo", "jo@example.com", true).await;
    store.adjust_reserved(boot.id, 4).await.unwrap();
    let open = store.create_order(user.id, &[(boot.id, 2)]).await.unwrap();
    store.adjust_reserved(sock.id, 3).await.unwrap();

    assert_eq!(store.restore_reservations().await.unwrap(), 2);

    assert_eq!(store.product(boot.id).unwrap().reserved, 2);
    assert_eq!(store.product(sock.id).unwrap().reserved, 0);
    assert_eq!(store.restore_reservations().await.unwrap(), 0);
    store.complete_order(open.id).await.unwrap();
    assert_eq!(store.product(boot.id).unwrap().amount, 8);
  }
}
