// src/web/routes.rs

use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called from `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/products")
          .route(
            "",
            web::get().to(crate::web::handlers::product_handlers::list_products_handler),
          )
          .route(
            "/{product_id}",
            web::get().to(crate::web::handlers::product_handlers::get_product_handler),
          ),
      )
      .service(
        web::scope("/cart")
          .route(
            "",
            web::get().to(crate::web::handlers::cart_handlers::get_cart_handler),
          )
          .route(
            "",
            web::post().to(crate::web::handlers::cart_handlers::add_to_cart_handler),
          )
          .route(
            "/{line_id}",
            web::patch().to(crate::web::handlers::cart_handlers::set_quantity_handler),
          )
          .route(
            "/{line_id}",
            web::delete().to(crate::web::handlers::cart_handlers::remove_cart_line_handler),
          ),
      )
      .service(
        web::scope("/checkout")
          .route(
            "",
            web::post().to(crate::web::handlers::checkout_handlers::start_checkout_handler),
          )
          .route(
            "/name",
            web::post().to(crate::web::handlers::checkout_handlers::submit_checkout_name_handler),
          ),
      ),
  );
}
