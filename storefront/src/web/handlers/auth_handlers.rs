// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_flow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::UserView;
use crate::pipelines::contexts::{
  ConfirmEmailCtxData, PasswordResetCtxData, PasswordResetRequestCtxData, SigninCtxData, SignupCtxData,
  UpdatePasswordCtxData,
};
use crate::state::AppState;
use crate::web::extractors::CurrentSession;

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub username: String,
  pub email: String,
  pub password: String,
  pub confirm_password: String,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetRequestPayload {
  pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct NewPasswordPayload {
  pub password: String,
  pub confirm_password: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdatePasswordPayload {
  pub current_password: String,
  pub password: String,
  pub confirm_password: String,
}

/// A flow that stops early has not done its job.
fn require_completed(result: PipelineResult, flow: &str) -> Result<(), AppError> {
  match result {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => {
      warn!(flow, "Pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
  }
}

#[instrument(
    name = "handler::signup",
    skip(app_state, req_payload),
    fields(req_email = %req_payload.email)
)]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    username: payload.username,
    email: payload.email,
    password: payload.password,
    confirm_password: payload.confirm_password,
    created_user: None,
    confirm_token: None,
    confirmation_sent: false,
  });

  let result = app_state.flows.run(ctx.clone()).await?;
  require_completed(result, "signup")?;

  let guard = ctx.read();
  let user = guard
    .created_user
    .as_ref()
    .ok_or_else(|| AppError::Internal("Signup completed without creating a user.".to_string()))?;
  info!(user_id = %user.id, confirmation_sent = guard.confirmation_sent, "Signup successful.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Your account has been created! A confirmation email has been sent via email.",
      "user": UserView::from(user),
      "confirmation_sent": guard.confirmation_sent,
  })))
}

#[instrument(name = "handler::confirm_email", skip(app_state, path))]
pub async fn confirm_email_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(ConfirmEmailCtxData {
    app_state: app_state.get_ref().clone(),
    token: path.into_inner(),
    user_id: None,
    already_confirmed: false,
  });

  let result = app_state.flows.run(ctx.clone()).await?;
  require_completed(result, "confirm_email")?;

  let message = if ctx.read().already_confirmed {
    "Account already confirmed. Please login."
  } else {
    "You have confirmed your account. Thanks!"
  };
  Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[instrument(
    name = "handler::login",
    skip(app_state, req_payload),
    fields(req_email = %req_payload.email)
)]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email,
    password: payload.password,
    user: None,
    session_token: None,
  });

  let result = app_state.flows.run(ctx.clone()).await?;
  require_completed(result, "signin")?;

  let guard = ctx.read();
  let (Some(user), Some(token)) = (guard.user.as_ref(), guard.session_token.clone()) else {
    return Err(AppError::Auth("Signin completed without session token generation.".to_string()));
  };
  info!(user_id = %user.id, "Signin successful.");
  Ok(HttpResponse::Ok().json(json!({
      "token": token,
      "user": UserView::from(user),
  })))
}

/// Releases the cart and ends the session.
#[instrument(name = "handler::logout", skip(app_state, current), fields(user_id = %current.user_id))]
pub async fn logout_handler(
  app_state: web::Data<AppState>,
  current: CurrentSession,
) -> Result<HttpResponse, AppError> {
  current.release_cart(app_state.catalog.as_ref()).await?;
  app_state.sessions.close(&current.token);
  info!("Session closed.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Logged out." })))
}

#[instrument(
    name = "handler::request_password_reset",
    skip(app_state, req_payload),
    fields(req_email = %req_payload.email)
)]
pub async fn request_password_reset_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ResetRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(PasswordResetRequestCtxData {
    app_state: app_state.get_ref().clone(),
    email: req_payload.into_inner().email,
    user: None,
    reset_token: None,
  });

  let result = app_state.flows.run(ctx).await?;
  require_completed(result, "password_reset_request")?;

  Ok(HttpResponse::Ok().json(json!({
      "message": "An email has been sent with instructions to reset your password."
  })))
}

#[instrument(name = "handler::reset_password", skip(app_state, path, req_payload))]
pub async fn reset_password_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_payload: web::Json<NewPasswordPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(PasswordResetCtxData {
    app_state: app_state.get_ref().clone(),
    token: path.into_inner(),
    password: payload.password,
    confirm_password: payload.confirm_password,
    user_id: None,
  });

  let result = app_state.flows.run(ctx).await?;
  require_completed(result, "password_reset")?;

  Ok(HttpResponse::Ok().json(json!({
      "message": "Your password has been updated! You are now able to log in"
  })))
}

#[instrument(name = "handler::update_password", skip(app_state, current, req_payload), fields(user_id = %current.user_id))]
pub async fn update_password_handler(
  app_state: web::Data<AppState>,
  current: CurrentSession,
  req_payload: web::Json<UpdatePasswordPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(UpdatePasswordCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: current.user_id,
    current_password: payload.current_password,
    new_password: payload.password,
    confirm_password: payload.confirm_password,
    stored_hash: None,
  });

  let result = app_state.flows.run(ctx).await?;
  require_completed(result, "update_password")?;

  Ok(HttpResponse::Ok().json(json!({ "message": "Your password has been updated!" })))
}
