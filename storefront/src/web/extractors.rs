// storefront/src/web/extractors.rs

//! Request extractors resolving the bearer token to a session.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use std::ops::Deref;
use tracing::warn;

use crate::errors::AppError;
use crate::sessions::SessionHandle;
use crate::state::AppState;

pub const LOGIN_REQUIRED: &str = "Please log in to access this page.";

/// Any logged-in user.
#[derive(Debug, Clone)]
pub struct CurrentSession {
  pub token: String,
  pub session: SessionHandle,
}

impl Deref for CurrentSession {
  type Target = SessionHandle;

  fn deref(&self) -> &Self::Target {
    &self.session
  }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
  req
    .headers()
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

fn resolve(req: &HttpRequest) -> Result<CurrentSession, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state not configured".to_string()))?;
  let Some(token) = bearer_token(req) else {
    return Err(AppError::Auth(LOGIN_REQUIRED.to_string()));
  };
  match state.sessions.get(token) {
    Some(session) => Ok(CurrentSession {
      token: token.to_string(),
      session,
    }),
    None => {
      warn!("Request with an unknown session token.");
      Err(AppError::Auth(LOGIN_REQUIRED.to_string()))
    }
  }
}

impl FromRequest for CurrentSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(resolve(req))
  }
}

/// A logged-in customer; administrators have no cart.
#[derive(Debug, Clone)]
pub struct Shopper(pub CurrentSession);

impl FromRequest for Shopper {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(resolve(req).and_then(|current| {
      if current.is_superuser {
        return Err(AppError::Forbidden("Administrators do not have a cart.".to_string()));
      }
      Ok(Shopper(current))
    }))
  }
}

/// A logged-in superuser.
#[derive(Debug, Clone)]
pub struct Admin(pub CurrentSession);

impl FromRequest for Admin {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(resolve(req).and_then(|current| {
      if !current.is_superuser {
        warn!(user_id = %current.user_id, "Admin route requested by a customer.");
        return Err(AppError::Forbidden("Administrator access required.".to_string()));
      }
      Ok(Admin(current))
    }))
  }
}
