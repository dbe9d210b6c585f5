// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_flow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::OrderView;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::cart;
use crate::state::AppState;
use crate::web::extractors::Shopper;

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub amount: i32,
}

#[derive(Deserialize, Debug)]
pub struct UpdateCartRequestPayload {
  pub amount: i32,
}

#[instrument(name = "handler::view_cart", skip(app_state, shopper), fields(user_id = %shopper.0.user_id))]
pub async fn view_cart_handler(app_state: web::Data<AppState>, shopper: Shopper) -> Result<HttpResponse, AppError> {
  let held = shopper.0.cart.lock().await;
  let summary = cart::summary(app_state.catalog.as_ref(), &held).await?;
  Ok(HttpResponse::Ok().json(summary))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, shopper),
    fields(user_id = %shopper.0.user_id, product_id = %req_payload.product_id, amount = %req_payload.amount)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  shopper: Shopper,
) -> Result<HttpResponse, AppError> {
  cart::check_add_request(req_payload.amount)?;

  let mut held = shopper.0.cart.lock().await;
  cart::add(app_state.catalog.as_ref(), &mut held, req_payload.product_id, req_payload.amount).await?;
  info!(lines = held.len(), "Product added to cart.");

  let summary = cart::summary(app_state.catalog.as_ref(), &held).await?;
  Ok(HttpResponse::Ok().json(summary))
}

/// Sets the cart quantity of one product; zero drops the line.
#[instrument(
    name = "handler::update_cart_item",
    skip(app_state, path, req_payload, shopper),
    fields(user_id = %shopper.0.user_id, product_id = %path.as_ref(), amount = %req_payload.amount)
)]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateCartRequestPayload>,
  shopper: Shopper,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let mut held = shopper.0.cart.lock().await;

  let product = app_state
    .catalog
    .find_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  cart::check_update_request(&product, held.quantity_of(product_id), req_payload.amount)?;
  cart::update(app_state.catalog.as_ref(), &mut held, product_id, req_payload.amount).await?;

  let summary = cart::summary(app_state.catalog.as_ref(), &held).await?;
  Ok(HttpResponse::Ok().json(summary))
}

#[instrument(
    name = "handler::remove_from_cart",
    skip(app_state, path, req_payload, shopper),
    fields(user_id = %shopper.0.user_id, product_id = %path.as_ref(), amount = %req_payload.amount)
)]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateCartRequestPayload>,
  shopper: Shopper,
) -> Result<HttpResponse, AppError> {
  let mut held = shopper.0.cart.lock().await;
  cart::remove(app_state.catalog.as_ref(), &mut held, path.into_inner(), req_payload.amount).await?;
  info!(lines = held.len(), "Product removed from cart.");

  let summary = cart::summary(app_state.catalog.as_ref(), &held).await?;
  Ok(HttpResponse::Ok().json(summary))
}

#[instrument(name = "handler::clear_cart", skip(app_state, shopper), fields(user_id = %shopper.0.user_id))]
pub async fn clear_cart_handler(app_state: web::Data<AppState>, shopper: Shopper) -> Result<HttpResponse, AppError> {
  let mut held = shopper.0.cart.lock().await;
  cart::clear(app_state.catalog.as_ref(), &mut held).await?;
  info!("Cart cleared.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Cart cleared." })))
}

/// Places the order through the checkout flow.
///
/// The cart stays locked for the whole run and receives whatever the flow
/// leaves in its context, so a failed order keeps its lines.
#[instrument(name = "handler::checkout", skip(app_state, shopper), fields(user_id = %shopper.0.user_id))]
pub async fn checkout_handler(app_state: web::Data<AppState>, shopper: Shopper) -> Result<HttpResponse, AppError> {
  let session = &shopper.0;
  let mut held = session.cart.lock().await;

  let ctx = ContextData::new(CheckoutCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: session.user_id,
    username: session.username.clone(),
    email: session.email.clone(),
    cart: std::mem::take(&mut *held),
    order: None,
    confirmation_sent: false,
  });

  let result = app_state.flows.run(ctx.clone()).await;
  *held = std::mem::take(&mut ctx.write().cart);

  match result? {
    PipelineResult::Completed => {
      let guard = ctx.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Checkout completed without an order.".to_string()))?;
      info!(order_id = %order.id, confirmation_sent = guard.confirmation_sent, "Checkout successful.");
      Ok(HttpResponse::Created().json(OrderView::from(order)))
    }
    PipelineResult::Stopped => {
      warn!("Checkout pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
  }
}
