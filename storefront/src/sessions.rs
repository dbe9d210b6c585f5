// storefront/src/sessions.rs

//! In-process session store keyed by bearer token.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::User;
use crate::repositories::CatalogRepository;
use crate::services::cart::{self, Cart};

/// Upper bound on the time between two idle sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A logged-in user. Identity is fixed at login; the cart is the only state
/// requests change, and requests of one session queue on its lock.
#[derive(Debug)]
pub struct Session {
  pub user_id: Uuid,
  pub username: String,
  pub email: String,
  pub is_superuser: bool,
  pub cart: Mutex<Cart>,
  last_seen: parking_lot::Mutex<Instant>,
}

impl Session {
  pub fn for_user(user: &User) -> Self {
    Self {
      user_id: user.id,
      username: user.username.clone(),
      email: user.email.clone(),
      is_superuser: user.is_superuser,
      cart: Mutex::new(Cart::new()),
      last_seen: parking_lot::Mutex::new(Instant::now()),
    }
  }

  fn touch(&self) {
    *self.last_seen.lock() = Instant::now();
  }

  fn idle_for(&self, now: Instant) -> Duration {
    now.saturating_duration_since(*self.last_seen.lock())
  }

  /// Releases every reservation of the cart and closes it.
  ///
  /// Requests still holding this session afterwards cannot reserve again.
  /// When releasing fails the cart stays open with its remaining lines.
  pub async fn release_cart(&self, catalog: &dyn CatalogRepository) -> Result<()> {
    let mut held = self.cart.lock().await;
    cart::clear(catalog, &mut held).await?;
    held.close();
    Ok(())
  }
}

pub type SessionHandle = Arc<Session>;

#[derive(Default)]
pub struct SessionStore {
  sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores the session and returns its new token.
  pub fn open(&self, session: Session) -> String {
    let token = Uuid::new_v4().simple().to_string();
    self.sessions.write().insert(token.clone(), Arc::new(session));
    token
  }

  /// Looks the session up and marks it as active.
  pub fn get(&self, token: &str) -> Option<SessionHandle> {
    let session = self.sessions.read().get(token).cloned()?;
    session.touch();
    Some(session)
  }

  pub fn close(&self, token: &str) -> Option<SessionHandle> {
    self.sessions.write().remove(token)
  }

  pub(crate) fn len(&self) -> usize {
    self.sessions.read().len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.sessions.read().is_empty()
  }

  /// Ends every session idle for longer than `ttl` at `now`, releasing its
  /// cart first. Sessions whose cart could not be released stay open for
  /// the next sweep. Returns how many sessions ended.
  pub async fn sweep_idle(&self, catalog: &dyn CatalogRepository, now: Instant, ttl: Duration) -> usize {
    let idle: Vec<(String, SessionHandle)> = self
      .sessions
      .read()
      .iter()
      .filter(|(_, s)| s.idle_for(now) > ttl)
      .map(|(token, s)| (token.clone(), Arc::clone(s)))
      .collect();

    let mut ended = 0;
    for (token, session) in idle {
      match session.release_cart(catalog).await {
        Ok(()) => {
          self.close(&token);
          ended += 1;
        }
        Err(e) => warn!(user_id = %session.user_id, error = %e, "Could not release cart of idle session."),
      }
    }
    ended
  }
}

/// Runs [`SessionStore::sweep_idle`] periodically on the tokio runtime.
pub fn spawn_idle_sweeper(
  sessions: Arc<SessionStore>,
  catalog: Arc<dyn CatalogRepository>,
  ttl: Duration,
) -> JoinHandle<()> {
  let period = ttl.min(MAX_SWEEP_INTERVAL).max(Duration::from_secs(1));
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(period);
    loop {
      ticker.tick().await;
      let ended = sessions.sweep_idle(catalog.as_ref(), Instant::now(), ttl).await;
      if ended > 0 {
        info!(ended, remaining = sessions.len(), "Idle sessions closed.");
      }
    }
  })
}
