// server/src/web/routes.rs

use actix_web::{web, HttpRequest, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{cart_handlers, order_handlers, payment_handlers, product_handlers, review_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler(req: HttpRequest) -> Result<HttpResponse, AppError> {
  Err(AppError::NotFound(format!("can't find {} on this server!", req.path())))
}

/// Body, path and query extraction failures come back as validation errors.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()));
}

pub fn configure_app(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);

  cfg
    .service(
      web::scope("/api")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/cart")
            .route("/add", web::post().to(cart_handlers::add_to_cart_handler))
            .route("/getCart", web::get().to(cart_handlers::get_cart_handler))
            .route("/{id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
        )
        .service(
          web::scope("/order")
            .route("/create", web::post().to(order_handlers::create_order_handler))
            .route("/my-orders", web::get().to(order_handlers::my_orders_handler))
            .route("/{id}", web::delete().to(order_handlers::delete_order_handler)),
        )
        .service(
          web::scope("/product")
            .route("/get-all-product", web::get().to(product_handlers::list_products_handler))
            .route("/get-product/{id}", web::get().to(product_handlers::get_product_handler))
            .route("/create-product", web::post().to(product_handlers::create_product_handler))
            .route("/get-my-product", web::get().to(product_handlers::my_products_handler))
            .route("/update-product/{id}", web::patch().to(product_handlers::update_product_handler))
            .route("/delete-product/{id}", web::delete().to(product_handlers::delete_product_handler))
            .route(
              "/{productId}/create-review",
              web::post().to(review_handlers::create_product_review_handler),
            )
            .route(
              "/{productId}/get-all-review",
              web::get().to(review_handlers::list_product_reviews_handler),
            ),
        )
        .service(
          web::scope("/review")
            .route("/create-review", web::post().to(review_handlers::create_review_handler))
            .route("/get-all-review", web::get().to(review_handlers::list_all_reviews_handler))
            .route("/get-review/{productId}", web::get().to(review_handlers::list_product_reviews_handler))
            .route("/update-review/{id}", web::patch().to(review_handlers::update_review_handler))
            .route("/delete-review/{id}", web::delete().to(review_handlers::delete_review_handler)),
        )
        .service(
          web::scope("/payment").route(
            "/create-checkout-session",
            web::post().to(payment_handlers::create_checkout_session_handler),
          ),
        ),
    )
    .default_service(web::route().to(not_found_handler));
}
