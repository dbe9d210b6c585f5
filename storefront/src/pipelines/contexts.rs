// storefront/src/pipelines/contexts.rs

//! Data carried through each flow. Handlers receive it wrapped in
//! `storefront_flow::ContextData`.

use uuid::Uuid;

use crate::models::{Order, User};
use crate::services::cart::Cart;
use crate::state::AppState;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub username: String,
  pub email: String,
  pub password: String,
  pub confirm_password: String,
  pub created_user: Option<User>,
  pub confirm_token: Option<String>,
  pub confirmation_sent: bool,
}

#[derive(Clone)]
pub struct ConfirmEmailCtxData {
  pub app_state: AppState,
  pub token: String,
  pub user_id: Option<Uuid>,
  pub already_confirmed: bool,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub session_token: Option<String>,
}

#[derive(Clone)]
pub struct PasswordResetRequestCtxData {
  pub app_state: AppState,
  pub email: String,
  pub user: Option<User>,
  pub reset_token: Option<String>,
}

#[derive(Clone)]
pub struct PasswordResetCtxData {
  pub app_state: AppState,
  pub token: String,
  pub password: String,
  pub confirm_password: String,
  pub user_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct UpdatePasswordCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub current_password: String,
  pub new_password: String,
  pub confirm_password: String,
  pub stored_hash: Option<String>,
}

/// The cart is moved in by the caller and handed back, emptied on success.
#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub username: String,
  pub email: String,
  pub cart: Cart,
  pub order: Option<Order>,
  pub confirmation_sent: bool,
}

#[derive(Clone)]
pub struct CompleteOrderCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub order: Option<Order>,
}
