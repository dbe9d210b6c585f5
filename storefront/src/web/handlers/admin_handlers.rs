// storefront/src/web/handlers/admin_handlers.rs

//! Catalog and order administration. Every handler requires [`Admin`].

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use storefront_flow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{OrderView, ProductDraft, ProductView, Taxonomy};
use crate::pipelines::contexts::CompleteOrderCtxData;
use crate::services::{catalog, orders};
use crate::state::AppState;
use crate::web::extractors::Admin;

#[derive(Deserialize, Debug)]
pub struct LabelPayload {
  pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
  pub completed: Option<bool>,
  pub page: Option<i64>,
}

fn taxonomy(segment: &str) -> Result<Taxonomy, AppError> {
  Taxonomy::from_table(segment).ok_or_else(|| AppError::NotFound(format!("Unknown collection '{}'", segment)))
}

#[instrument(name = "handler::admin_create_label", skip(app_state, _admin, path, req_payload), fields(kind = %path.as_ref()))]
pub async fn create_label_handler(
  app_state: web::Data<AppState>,
  _admin: Admin,
  path: web::Path<String>,
  req_payload: web::Json<LabelPayload>,
) -> Result<HttpResponse, AppError> {
  let kind = taxonomy(&path)?;
  let label = catalog::create_label(app_state.catalog.as_ref(), kind, &req_payload.name).await?;
  Ok(HttpResponse::Created().json(label))
}

#[instrument(name = "handler::admin_rename_label", skip(app_state, _admin, path, req_payload))]
pub async fn rename_label_handler(
  app_state: web::Data<AppState>,
  _admin: Admin,
  path: web::Path<(String, Uuid)>,
  req_payload: web::Json<LabelPayload>,
) -> Result<HttpResponse, AppError> {
  let (segment, id) = path.into_inner();
  let kind = taxonomy(&segment)?;
  let label = catalog::rename_label(app_state.catalog.as_ref(), kind, id, &req_payload.name).await?;
  Ok(HttpResponse::Ok().json(label))
}

#[instrument(name = "handler::admin_delete_label", skip(app_state, _admin, path))]
pub async fn delete_label_handler(
  app_state: web::Data<AppState>,
  _admin: Admin,
  path: web::Path<(String, Uuid)>,
) -> Result<HttpResponse, AppError> {
  let (segment, id) = path.into_inner();
  let kind = taxonomy(&segment)?;
  catalog::delete_label(app_state.catalog.as_ref(), kind, id).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::admin_create_product", skip(app_state, _admin, req_payload), fields(name = %req_payload.name))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  _admin: Admin,
  req_payload: web::Json<ProductDraft>,
) -> Result<HttpResponse, AppError> {
  let product = catalog::create_product(app_state.catalog.as_ref(), req_payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(ProductView::from(&product)))
}

#[instrument(name = "handler::admin_update_product", skip(app_state, _admin, path, req_payload), fields(product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  _admin: Admin,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductDraft>,
) -> Result<HttpResponse, AppError> {
  let product =
    catalog::update_product(app_state.catalog.as_ref(), path.into_inner(), req_payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(ProductView::from(&product)))
}

#[instrument(name = "handler::admin_delete_product", skip(app_state, _admin, path), fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  _admin: Admin,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  catalog::delete_product(app_state.catalog.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, _admin, query_params))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  _admin: Admin,
  query_params: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let page = orders::list_orders(app_state.orders.as_ref(), query_params.completed, query_params.page).await?;
  Ok(HttpResponse::Ok().json(page))
}

#[instrument(name = "handler::admin_get_order", skip(app_state, _admin, path), fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  _admin: Admin,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = orders::order_detail(app_state.orders.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(OrderView::from(order)))
}

#[instrument(name = "handler::admin_complete_order", skip(app_state, admin, path), fields(order_id = %path.as_ref()))]
pub async fn complete_order_handler(
  app_state: web::Data<AppState>,
  admin: Admin,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(CompleteOrderCtxData {
    app_state: app_state.get_ref().clone(),
    order_id: path.into_inner(),
    order: None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let order = ctx
        .read()
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Completion finished without an order.".to_string()))?;
      info!(admin_id = %admin.0.user_id, "Order completed by admin.");
      Ok(HttpResponse::Ok().json(OrderView::from(order)))
    }
    PipelineResult::Stopped => {
      warn!("Order completion pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
  }
}
