// storefront/src/pipelines/signin_pipeline.rs

use storefront_flow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};
use tracing::{event, info, warn, Level};

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use crate::sessions::Session;

pub const BAD_CREDENTIALS: &str = "Login Unsuccessful. Please check provided email and password";
pub const NOT_CONFIRMED: &str = "Login Unsuccessful. Please confirm your email before first login";

/// Registers the sign-in flow.
pub fn register_signin_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_email", false, None),
    ("verify_user_password", false, None),
    ("ensure_confirmed", false, None),
    ("open_session", false, None),
  ]);

  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email_val, password_is_empty_val) = {
        let guard = ctx_data.read();
        (guard.email.trim().to_string(), guard.password.is_empty())
      };

      event!(Level::DEBUG, email = %email_val, "Validating sign-in input.");
      if email_val.is_empty() || !email_val.contains('@') {
        warn!("Invalid email format provided for sign-in.");
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if password_is_empty_val {
        warn!("Empty password provided for sign-in.");
        return Err(AppError::Validation("Password is required.".to_string()));
      }
      ctx_data.write().email = email_val;
      Ok(PipelineControl::Continue)
    })
  })?;

  signin_p.on_root("fetch_user_by_email", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email_val, users) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.users.clone())
      };

      match users.find_user_by_email(&email_val).await? {
        Some(user) => {
          event!(Level::INFO, user_id = %user.id, "User found for signin.");
          ctx_data.write().user = Some(user);
          Ok(PipelineControl::Continue)
        }
        None => {
          warn!(email = %email_val, "Sign-in for unknown email.");
          Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
        }
      }
    })
  })?;

  signin_p.on_root("verify_user_password", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (password_val, hash_val) = {
        let guard = ctx_data.read();
        let hash = guard.user.as_ref().map(|u| u.password_hash.clone());
        (guard.password.clone(), hash)
      };
      let hash_val = hash_val.ok_or_else(|| AppError::Internal("User missing before password check".to_string()))?;

      if !auth_service::verify_password(&hash_val, &password_val)? {
        warn!("Password mismatch on sign-in.");
        return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  signin_p.on_root("ensure_confirmed", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let confirmed = ctx_data.read().user.as_ref().is_some_and(|u| u.confirmed);
      if !confirmed {
        return Err(AppError::Auth(NOT_CONFIRMED.to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  signin_p.on_root("open_session", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (sessions, user) = {
        let guard = ctx_data.read();
        (guard.app_state.sessions.clone(), guard.user.clone())
      };
      let user = user.ok_or_else(|| AppError::Internal("User missing before session".to_string()))?;

      let token = sessions.open(Session::for_user(&user));
      info!(user_id = %user.id, "Session opened.");
      ctx_data.write().session_token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(signin_p);
  info!("Sign-in pipeline registered.");
  Ok(())
}
