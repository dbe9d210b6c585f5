// storefront/src/pipelines/checkout_pipeline.rs

use storefront_flow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{CheckoutCtxData, CompleteOrderCtxData};
use crate::services::cart::{self, CartError};
use crate::services::{mailer, orders};

pub fn register_checkout_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("ensure_cart_not_empty", false, None),
    ("place_order", false, None),
    ("send_order_confirmation", true, None),
  ]);

  p.on_root("ensure_cart_not_empty", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      guard.cart.ensure_open()?;
      if guard.cart.is_empty() {
        return Err(AppError::from(CartError::EmptyCart));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  p.on_root("place_order", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (order_repo, user_id, mut working_cart) = {
        let mut guard = ctx_data.write();
        (guard.app_state.orders.clone(), guard.user_id, std::mem::take(&mut guard.cart))
      };

      let placed = cart::checkout(order_repo.as_ref(), &mut working_cart, user_id).await;
      let mut guard = ctx_data.write();
      guard.cart = working_cart;
      let order = placed?;
      info!(order_id = %order.id, items = order.total_items(), total_cents = order.total_sum_cents(), "Order placed.");
      guard.order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("send_order_confirmation", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (app_state, email, username, order) = {
        let guard = ctx_data.read();
        (
          guard.app_state.clone(),
          guard.email.clone(),
          guard.username.clone(),
          guard.order.clone(),
        )
      };
      let Some(order) = order else {
        warn!("No order to confirm.");
        return Ok(PipelineControl::Continue);
      };

      let mail = mailer::order_placed_mail(&email, &username, &order);
      common_steps::send_mail_step(&app_state, mail).await?;
      ctx_data.write().confirmation_sent = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(p);
  info!("Checkout pipeline registered.");
  Ok(())
}

/// Registers the admin order completion flow.
pub fn register_complete_order_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut p = Pipeline::<CompleteOrderCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("ensure_open", false, None),
    ("apply_completion", false, None),
  ]);

  p.on_root("load_order", |ctx_data: ContextData<CompleteOrderCtxData>| {
    Box::pin(async move {
      let (order_repo, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.orders.clone(), guard.order_id)
      };

      let order = orders::order_detail(order_repo.as_ref(), order_id).await?;
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  p.on_root("ensure_open", |ctx_data: ContextData<CompleteOrderCtxData>| {
    Box::pin(async move {
      let completed = ctx_data.read().order.as_ref().is_some_and(|o| o.is_completed);
      if completed {
        return Err(AppError::Conflict("Order is already completed.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  // The repository re-checks under a row lock.
  p.on_root("apply_completion", |ctx_data: ContextData<CompleteOrderCtxData>| {
    Box::pin(async move {
      let (order_repo, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.orders.clone(), guard.order_id)
      };

      let order = orders::complete_order(order_repo.as_ref(), order_id).await?;
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(p);
  info!("Order completion pipeline registered.");
  Ok(())
}
