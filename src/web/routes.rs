use actix_web::web;

use crate::web::handlers::{
  auth_handlers, blog_handlers, checkout_handlers, contact_handlers, order_handlers, product_handlers,
  review_handlers, webhook_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Wires every route under `/api`. Paths mirror what the storefront already
/// calls.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/productos")
          .route("/lista", web::get().to(product_handlers::list_products_handler))
          .route("/ofertas", web::get().to(product_handlers::list_sale_products_handler))
          .route("/destacados", web::get().to(product_handlers::list_featured_products_handler))
          .route("/categorias", web::get().to(product_handlers::list_categories_handler))
          .route("/comprar", web::post().to(checkout_handlers::checkout_handler))
          .route("/mis-compras", web::get().to(order_handlers::purchase_history_handler))
          .route("/logs", web::get().to(order_handlers::list_purchase_logs_handler))
          .route(
            "/webhook/mercadopago",
            web::post().to(webhook_handlers::payment_webhook_handler),
          )
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
      )
      .service(
        web::scope("/blog")
          .route("", web::get().to(blog_handlers::list_posts_handler))
          .route("/{slug}", web::get().to(blog_handlers::get_post_handler)),
      )
      .route("/testimonios", web::get().to(review_handlers::list_testimonials_handler))
      .route(
        "/resenas/crear/{producto_id}",
        web::post().to(review_handlers::create_review_handler),
      )
      .route("/consultas", web::post().to(contact_handlers::submit_inquiry_handler))
      .service(
        web::scope("/usuarios")
          .route("/registro", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/me", web::get().to(auth_handlers::me_handler))
          .route("/perfil", web::put().to(auth_handlers::update_profile_handler)),
      ),
  );
}
