// storefront/src/repositories/postgres/catalog.rs

use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, PgPool};
use uuid::Uuid;

use crate::models::{Label, NewProduct, Product, ProductFilter, Taxonomy};
use crate::pagination::PageRequest;
use crate::repositories::{CatalogRepository, StoreError, StoreResult};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.short_description, p.full_description, p.price_cents, \
   p.amount, p.reserved, p.discount, p.brand_id, p.category_id, p.created_at";

const PRODUCT_FILTER: &str = "FROM products p \
   JOIN brands b ON b.id = p.brand_id \
   JOIN categories c ON c.id = p.category_id \
   WHERE ($1::text IS NULL OR b.name = $1) AND ($2::text IS NULL OR c.name = $2)";

#[derive(Debug, Clone)]
pub struct PgCatalogRepository {
  pool: PgPool,
}

impl PgCatalogRepository {
  #[must_use]
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn label_conflict(kind: Taxonomy, err: sqlx::Error) -> StoreError {
  match StoreError::from(err) {
    StoreError::AlreadyExists(_) => StoreError::AlreadyExists(format!("{} with such name", kind.title())),
    other => other,
  }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
  async fn list_labels(&self, kind: Taxonomy) -> StoreResult<Vec<Label>> {
    let sql = format!("SELECT id, name FROM {} ORDER BY name", kind.table());
    Ok(query_as::<_, Label>(&sql).fetch_all(&self.pool).await?)
  }

  async fn find_label(&self, kind: Taxonomy, id: Uuid) -> StoreResult<Option<Label>> {
    let sql = format!("SELECT id, name FROM {} WHERE id = $1", kind.table());
    Ok(query_as::<_, Label>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_label_by_name(&self, kind: Taxonomy, name: &str) -> StoreResult<Option<Label>> {
    let sql = format!("SELECT id, name FROM {} WHERE name = $1", kind.table());
    Ok(query_as::<_, Label>(&sql).bind(name).fetch_optional(&self.pool).await?)
  }

  async fn create_label(&self, kind: Taxonomy, name: &str) -> StoreResult<Label> {
    let sql = format!("INSERT INTO {} (id, name) VALUES ($1, $2) RETURNING id, name", kind.table());
    query_as::<_, Label>(&sql)
      .bind(Uuid::new_v4())
      .bind(name)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| label_conflict(kind, e))
  }

  async fn rename_label(&self, kind: Taxonomy, id: Uuid, name: &str) -> StoreResult<Label> {
    let sql = format!("UPDATE {} SET name = $2 WHERE id = $1 RETURNING id, name", kind.table());
    query_as::<_, Label>(&sql)
      .bind(id)
      .bind(name)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| label_conflict(kind, e))?
      .ok_or_else(|| StoreError::NotFound(kind.title().to_string()))
  }

  async fn delete_label(&self, kind: Taxonomy, id: Uuid) -> StoreResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
    let done = query(&sql).bind(id).execute(&self.pool).await?;
    if done.rows_affected() == 0 {
      return Err(StoreError::NotFound(kind.title().to_string()));
    }
    Ok(())
  }

  async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> StoreResult<(Vec<Product>, i64)> {
    let total: i64 = query_scalar(&format!("SELECT COUNT(*) {}", PRODUCT_FILTER))
      .bind(filter.brand_name.as_deref())
      .bind(filter.category_name.as_deref())
      .fetch_one(&self.pool)
      .await?;

    let sql = format!(
      "SELECT {} {} ORDER BY p.name LIMIT $3 OFFSET $4",
      PRODUCT_COLUMNS, PRODUCT_FILTER
    );
    let products = query_as::<_, Product>(&sql)
      .bind(filter.brand_name.as_deref())
      .bind(filter.category_name.as_deref())
      .bind(page.limit())
      .bind(page.offset())
      .fetch_all(&self.pool)
      .await?;
    Ok((products, total))
  }

  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products p WHERE p.id = $1", PRODUCT_COLUMNS);
    Ok(query_as::<_, Product>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_product_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products p WHERE p.name = $1", PRODUCT_COLUMNS);
    Ok(query_as::<_, Product>(&sql).bind(name).fetch_optional(&self.pool).await?)
  }

  async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
    let sql = format!("SELECT {} FROM products p WHERE p.id = ANY($1)", PRODUCT_COLUMNS);
    Ok(query_as::<_, Product>(&sql).bind(ids).fetch_all(&self.pool).await?)
  }

  async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
    let sql = format!(
      "INSERT INTO products AS p (id, name, short_description, full_description, price_cents, amount, discount, brand_id, category_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
      PRODUCT_COLUMNS
    );
    query_as::<_, Product>(&sql)
      .bind(Uuid::new_v4())
      .bind(&product.name)
      .bind(&product.short_description)
      .bind(&product.full_description)
      .bind(product.price_cents)
      .bind(product.amount)
      .bind(product.discount)
      .bind(product.brand_id)
      .bind(product.category_id)
      .fetch_one(&self.pool)
      .await
      .map_err(Into::into)
  }

  async fn update_product(&self, id: Uuid, product: NewProduct) -> StoreResult<Product> {
    let sql = format!(
      "UPDATE products AS p SET name = $2, short_description = $3, full_description = $4, price_cents = $5, \
       amount = $6, discount = $7, brand_id = $8, category_id = $9 WHERE p.id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    );
    query_as::<_, Product>(&sql)
      .bind(id)
      .bind(&product.name)
      .bind(&product.short_description)
      .bind(&product.full_description)
      .bind(product.price_cents)
      .bind(product.amount)
      .bind(product.discount)
      .bind(product.brand_id)
      .bind(product.category_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| StoreError::NotFound("Product".to_string()))
  }

  async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
    let done = query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
    if done.rows_affected() == 0 {
      return Err(StoreError::NotFound("Product".to_string()));
    }
    Ok(())
  }

  async fn adjust_reserved(&self, id: Uuid, delta: i32) -> StoreResult<Product> {
    let sql = format!(
      "UPDATE products AS p SET reserved = p.reserved + $2 WHERE p.id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    );
    query_as::<_, Product>(&sql)
      .bind(id)
      .bind(delta)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| StoreError::NotFound("Product".to_string()))
  }
}
