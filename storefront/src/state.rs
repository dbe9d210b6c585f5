// storefront/src/state.rs
use sqlx::PgPool;
use std::sync::Arc;
use storefront_flow::Registry;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::repositories::{
  CatalogRepository, OrderRepository, PgCatalogRepository, PgOrderRepository, PgUserRepository, UserRepository,
};
use crate::services::mailer::{LogMailer, Mailer};
use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
  pub catalog: Arc<dyn CatalogRepository>,
  pub users: Arc<dyn UserRepository>,
  pub orders: Arc<dyn OrderRepository>,
  pub mailer: Arc<dyn Mailer>,
  pub sessions: Arc<SessionStore>,
  pub flows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// PostgreSQL repositories and the logging mailer. Flows are registered
  /// separately.
  pub fn postgres(pool: PgPool, config: AppConfig) -> Self {
    Self {
      catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
      users: Arc::new(PgUserRepository::new(pool.clone())),
      orders: Arc::new(PgOrderRepository::new(pool)),
      mailer: Arc::new(LogMailer::new(config.mail_sender.clone())),
      sessions: Arc::new(SessionStore::new()),
      flows: Arc::new(Registry::new()),
      config: Arc::new(config),
    }
  }
}
