// storefront/src/services/catalog.rs

//! Catalog browsing and the admin edits of brands, categories and products.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::label::validate_label_name;
use crate::models::{Label, NewProduct, Product, ProductDraft, ProductFilter, Taxonomy};
use crate::pagination::{Page, PageRequest, PRODUCTS_PER_PAGE};
use crate::repositories::{CatalogRepository, StoreError};

const PRODUCT_NAME_TAKEN: &str = "Product with such name already exists.";

#[instrument(name = "catalog::list_products", skip(catalog), fields(brand = ?filter.brand_name, category = ?filter.category_name))]
pub async fn list_products(
  catalog: &dyn CatalogRepository,
  filter: &ProductFilter,
  page: Option<i64>,
) -> Result<Page<Product>> {
  let req = PageRequest::new(page, PRODUCTS_PER_PAGE)?;
  let (items, total) = catalog.list_products(filter, req).await?;
  Page::new(items, req, total)
}

pub async fn product_detail(catalog: &dyn CatalogRepository, id: Uuid) -> Result<Product> {
  catalog
    .find_product(id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

pub async fn list_labels(catalog: &dyn CatalogRepository, kind: Taxonomy) -> Result<Vec<Label>> {
  Ok(catalog.list_labels(kind).await?)
}

#[instrument(name = "catalog::create_label", skip(catalog), err(Display))]
pub async fn create_label(catalog: &dyn CatalogRepository, kind: Taxonomy, name: &str) -> Result<Label> {
  let name = validate_label_name(kind, name)?;
  if catalog.find_label_by_name(kind, &name).await?.is_some() {
    return Err(label_taken(kind));
  }
  let label = catalog.create_label(kind, &name).await.map_err(|e| map_label_error(kind, e))?;
  info!(id = %label.id, "{} created.", kind.title());
  Ok(label)
}

#[instrument(name = "catalog::rename_label", skip(catalog), err(Display))]
pub async fn rename_label(catalog: &dyn CatalogRepository, kind: Taxonomy, id: Uuid, name: &str) -> Result<Label> {
  let name = validate_label_name(kind, name)?;
  if let Some(existing) = catalog.find_label_by_name(kind, &name).await? {
    if existing.id != id {
      return Err(label_taken(kind));
    }
  }
  catalog.rename_label(kind, id, &name).await.map_err(|e| map_label_error(kind, e))
}

/// Deleting a label takes its products with it.
#[instrument(name = "catalog::delete_label", skip(catalog), err(Display))]
pub async fn delete_label(catalog: &dyn CatalogRepository, kind: Taxonomy, id: Uuid) -> Result<()> {
  catalog.delete_label(kind, id).await.map_err(|e| map_label_error(kind, e))?;
  info!(%id, "{} deleted.", kind.title());
  Ok(())
}

fn label_taken(kind: Taxonomy) -> AppError {
  AppError::Validation(format!("{} with such name already exists.", kind.title()))
}

fn map_label_error(kind: Taxonomy, err: StoreError) -> AppError {
  match err {
    StoreError::AlreadyExists(_) => label_taken(kind),
    StoreError::NotFound(_) => AppError::NotFound(format!("{} not found", kind.title())),
    other => other.into(),
  }
}

async fn resolve_label(catalog: &dyn CatalogRepository, kind: Taxonomy, name: &str) -> Result<Uuid> {
  catalog
    .find_label_by_name(kind, name.trim())
    .await?
    .map(|l| l.id)
    .ok_or_else(|| AppError::Validation(format!("{} with such name not exists.", kind.title())))
}

/// Validates the draft and turns its label names into ids.
async fn resolve_draft(catalog: &dyn CatalogRepository, draft: ProductDraft) -> Result<NewProduct> {
  draft.validate()?;
  let brand_id = resolve_label(catalog, Taxonomy::Brand, &draft.brand_name).await?;
  let category_id = resolve_label(catalog, Taxonomy::Category, &draft.category_name).await?;
  Ok(NewProduct::from_draft(draft, brand_id, category_id))
}

fn map_product_error(err: StoreError) -> AppError {
  match err {
    StoreError::AlreadyExists(_) => AppError::Validation(PRODUCT_NAME_TAKEN.to_string()),
    StoreError::NotFound(_) => AppError::NotFound("Product not found".to_string()),
    other => other.into(),
  }
}

#[instrument(name = "catalog::create_product", skip(catalog, draft), fields(name = %draft.name), err(Display))]
pub async fn create_product(catalog: &dyn CatalogRepository, draft: ProductDraft) -> Result<Product> {
  let new = resolve_draft(catalog, draft).await?;
  if catalog.find_product_by_name(&new.name).await?.is_some() {
    return Err(AppError::Validation(PRODUCT_NAME_TAKEN.to_string()));
  }
  let product = catalog.create_product(new).await.map_err(map_product_error)?;
  info!(id = %product.id, "Product created.");
  Ok(product)
}

/// Replaces every editable field. Stock may not drop below what carts and
/// open orders hold.
#[instrument(name = "catalog::update_product", skip(catalog, draft), fields(name = %draft.name), err(Display))]
pub async fn update_product(catalog: &dyn CatalogRepository, id: Uuid, draft: ProductDraft) -> Result<Product> {
  let current = product_detail(catalog, id).await?;
  let new = resolve_draft(catalog, draft).await?;
  if let Some(other) = catalog.find_product_by_name(&new.name).await? {
    if other.id != id {
      return Err(AppError::Validation(PRODUCT_NAME_TAKEN.to_string()));
    }
  }
  if new.amount < current.reserved {
    return Err(AppError::Validation(format!(
      "Amount cannot be lower than the reserved amount ({}).",
      current.reserved
    )));
  }
  catalog.update_product(id, new).await.map_err(map_product_error)
}

#[instrument(name = "catalog::delete_product", skip(catalog), err(Display))]
pub async fn delete_product(catalog: &dyn CatalogRepository, id: Uuid) -> Result<()> {
  catalog.delete_product(id).await.map_err(map_product_error)?;
  info!(%id, "Product deleted.");
  Ok(())
}
