// storefront/src/repositories/mod.rs

//! Storage traits and their PostgreSQL implementations.

use async_trait::async_trait;
use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AccountToken, Label, NewProduct, NewUser, Order, Product, ProductFilter, Taxonomy, TokenPurpose, User};
use crate::pagination::PageRequest;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::{PgCatalogRepository, PgOrderRepository, PgUserRepository};

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{0} not found")]
  NotFound(String),

  #[error("{0} already exists")]
  AlreadyExists(String),

  #[error("related resource not found")]
  InvalidReference,

  #[error("missing required data")]
  MissingRequiredData,

  /// Carries the violated constraint name.
  #[error("constraint violated: {0}")]
  Integrity(String),

  #[error("order already completed")]
  AlreadyCompleted,

  #[error("storage error")]
  Sql(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
  fn from(error: sqlx::Error) -> Self {
    if matches!(error, sqlx::Error::RowNotFound) {
      return Self::NotFound("Record".to_string());
    }

    let constraint = error
      .as_database_error()
      .and_then(DatabaseError::constraint)
      .unwrap_or("unknown")
      .to_string();
    match error.as_database_error().map(DatabaseError::kind) {
      Some(ErrorKind::UniqueViolation) => Self::AlreadyExists(constraint),
      Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
      Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
      Some(ErrorKind::CheckViolation) => Self::Integrity(constraint),
      Some(ErrorKind::Other | _) | None => Self::Sql(error),
    }
  }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
  async fn list_labels(&self, kind: Taxonomy) -> StoreResult<Vec<Label>>;
  async fn find_label(&self, kind: Taxonomy, id: Uuid) -> StoreResult<Option<Label>>;
  async fn find_label_by_name(&self, kind: Taxonomy, name: &str) -> StoreResult<Option<Label>>;
  async fn create_label(&self, kind: Taxonomy, name: &str) -> StoreResult<Label>;
  async fn rename_label(&self, kind: Taxonomy, id: Uuid, name: &str) -> StoreResult<Label>;
  /// Deletes the label and every product attached to it.
  async fn delete_label(&self, kind: Taxonomy, id: Uuid) -> StoreResult<()>;

  /// One page of products ordered by name, plus the total match count.
  async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> StoreResult<(Vec<Product>, i64)>;
  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
  async fn find_product_by_name(&self, name: &str) -> StoreResult<Option<Product>>;
  async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;
  async fn create_product(&self, product: NewProduct) -> StoreResult<Product>;
  async fn update_product(&self, id: Uuid, product: NewProduct) -> StoreResult<Product>;
  async fn delete_product(&self, id: Uuid) -> StoreResult<()>;

  /// Shifts `reserved` by `delta` in one statement and returns the new row.
  ///
  /// The reserved-within-amount constraint rejects a shift that would
  /// oversell, surfacing as [`StoreError::Integrity`].
  async fn adjust_reserved(&self, id: Uuid, delta: i32) -> StoreResult<Product>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
  async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
  async fn create_user(&self, user: NewUser) -> StoreResult<User>;
  async fn set_confirmed(&self, id: Uuid) -> StoreResult<()>;
  async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

  async fn store_token(&self, token: &AccountToken) -> StoreResult<()>;
  async fn find_token(&self, token: &str, purpose: TokenPurpose) -> StoreResult<Option<AccountToken>>;
  /// Drops every token of `purpose` held by the user; returns how many.
  async fn revoke_tokens(&self, user_id: Uuid, purpose: TokenPurpose) -> StoreResult<u64>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
  /// Persists an order with `(product_id, amount)` lines in the given order.
  async fn create_order(&self, user_id: Uuid, lines: &[(Uuid, i32)]) -> StoreResult<Order>;
  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
  /// Newest first, optionally filtered by completion.
  async fn list_orders(&self, completed: Option<bool>, page: PageRequest) -> StoreResult<(Vec<Order>, i64)>;
  /// Moves the ordered units out of stock and marks the order completed.
  ///
  /// Fails with [`StoreError::AlreadyCompleted`] without touching stock when
  /// the order was completed before.
  async fn complete_order(&self, id: Uuid) -> StoreResult<Order>;
  /// Sets every product's `reserved` to the units held by open orders.
  ///
  /// Carts live only as long as the process, so whatever they reserved is
  /// released by this at startup. Returns the number of products changed.
  async fn restore_reservations(&self) -> StoreResult<u64>;
}
