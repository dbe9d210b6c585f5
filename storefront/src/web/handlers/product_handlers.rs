// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ProductFilter, ProductView, Taxonomy};
use crate::services::catalog;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ListProductsQuery {
  pub brand_name: Option<String>,
  pub category_name: Option<String>,
  pub page: Option<i64>,
}

#[instrument(name = "handler::list_products", skip(app_state, query_params))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, AppError> {
  let query = query_params.into_inner();
  let filter = ProductFilter {
    brand_name: query.brand_name.filter(|n| !n.is_empty()),
    category_name: query.category_name.filter(|n| !n.is_empty()),
  };

  let page = catalog::list_products(app_state.catalog.as_ref(), &filter, query.page).await?;
  info!(count = page.items.len(), total = page.total, "Products listed.");
  Ok(HttpResponse::Ok().json(page.map(|p| ProductView::from(&p))))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = catalog::product_detail(app_state.catalog.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(ProductView::from(&product)))
}

pub async fn list_brands_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let brands = catalog::list_labels(app_state.catalog.as_ref(), Taxonomy::Brand).await?;
  Ok(HttpResponse::Ok().json(brands))
}

pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories = catalog::list_labels(app_state.catalog.as_ref(), Taxonomy::Category).await?;
  Ok(HttpResponse::Ok().json(categories))
}
