// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use storefront::config::{AppConfig, LogFormat};
use storefront::repositories::postgres::apply_schema;
use storefront::sessions::spawn_idle_sweeper;
use storefront::state::AppState;
use storefront::{pipelines, seed, web};

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt().with_env_filter(filter);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Text => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;
  init_tracing(app_config.log_format);
  tracing::info!("Starting storefront server...");

  let db_pool = PgPoolOptions::new()
    .max_connections(10)
    .connect(&app_config.database_url)
    .await
    .context("Failed to connect to the database")?;
  tracing::info!("Successfully connected to the database.");

  apply_schema(&db_pool).await.context("Failed to apply the database schema")?;

  let server_address = app_config.bind_address();
  let seed_db = app_config.seed_db;
  let session_ttl = app_config.session_ttl();
  let app_state = AppState::postgres(db_pool, app_config);

  pipelines::register_all_pipelines(&app_state.flows).context("Failed to register pipelines")?;

  // Carts of the previous process are gone; only open orders still hold stock.
  let restored = app_state
    .orders
    .restore_reservations()
    .await
    .context("Failed to restore product reservations")?;
  tracing::info!(products = restored, "Reservations restored from open orders.");

  if seed_db {
    seed::seed_database(&app_state).await.context("Failed to seed the database")?;
  }

  spawn_idle_sweeper(app_state.sessions.clone(), app_state.catalog.clone(), session_ttl);

  tracing::info!("Attempting to bind server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await
  .context("Server terminated with an error")
}
