// storefront/src/pipelines/mod.rs

//! Account and order flows built on `storefront_flow`.

use storefront_flow::{FlowResult, Registry};

use crate::errors::AppError;

pub mod common_steps;
pub mod contexts;

pub mod checkout_pipeline;
pub mod password_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers every flow with the registry. Called once at startup.
pub fn register_all_pipelines(registry: &Registry<AppError>) -> FlowResult<()> {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(registry)?;
  signup_pipeline::register_confirm_email_pipeline(registry)?;
  signin_pipeline::register_signin_pipeline(registry)?;
  password_pipeline::register_password_reset_request_pipeline(registry)?;
  password_pipeline::register_password_reset_pipeline(registry)?;
  password_pipeline::register_update_password_pipeline(registry)?;
  checkout_pipeline::register_checkout_pipeline(registry)?;
  checkout_pipeline::register_complete_order_pipeline(registry)?;

  tracing::info!(count = registry.len(), "All application pipelines registered.");
  Ok(())
}
