// storefront/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{admin_handlers, auth_handlers, cart_handlers, product_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/confirm/{token}", web::get().to(auth_handlers::confirm_email_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/reset", web::post().to(auth_handlers::request_password_reset_handler))
          .route("/reset/{token}", web::post().to(auth_handlers::reset_password_handler))
          .route("/password", web::post().to(auth_handlers::update_password_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
      )
      .route("/brands", web::get().to(product_handlers::list_brands_handler))
      .route("/categories", web::get().to(product_handlers::list_categories_handler))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart_handler))
          .route("", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/items", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/items/{product_id}", web::put().to(cart_handlers::update_cart_item_handler))
          .route("/items/{product_id}/remove", web::post().to(cart_handlers::remove_from_cart_handler))
          .route("/checkout", web::post().to(cart_handlers::checkout_handler)),
      )
      .service(
        web::scope("/admin")
          .route("/products", web::post().to(admin_handlers::create_product_handler))
          .route("/products/{product_id}", web::put().to(admin_handlers::update_product_handler))
          .route("/products/{product_id}", web::delete().to(admin_handlers::delete_product_handler))
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/orders/{order_id}", web::get().to(admin_handlers::get_order_handler))
          .route("/orders/{order_id}/complete", web::post().to(admin_handlers::complete_order_handler))
          // brands | categories
          .route("/{taxonomy}", web::post().to(admin_handlers::create_label_handler))
          .route("/{taxonomy}/{id}", web::put().to(admin_handlers::rename_label_handler))
          .route("/{taxonomy}/{id}", web::delete().to(admin_handlers::delete_label_handler)),
      ),
  );
}
