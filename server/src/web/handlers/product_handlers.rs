// server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::{json, Value as Json};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Product, ProductDetail, ProductInput, ProductPatch};
use crate::query::{CollectionQuery, Filter, Projection, QueryFeatures, Value, PRODUCT_SCHEMA};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

fn build_query(base: Filter, params: Vec<(String, String)>) -> Result<CollectionQuery> {
  Ok(
    QueryFeatures::new(&PRODUCT_SCHEMA, base, params)
      .filter()?
      .sort()?
      .limit_fields()?
      .paginate()
      .build(),
  )
}

fn project<T: serde::Serialize>(record: &T, projection: &Projection) -> Result<Json> {
  let value = serde_json::to_value(record).map_err(|e| AppError::Internal(e.to_string()))?;
  Ok(projection.apply(value))
}

fn project_all(products: &[Product], projection: &Projection) -> Result<Vec<Json>> {
  products.iter().map(|p| project(p, projection)).collect()
}

fn default_projection() -> Projection {
  Projection::Exclude(PRODUCT_SCHEMA.hidden.to_vec())
}

#[instrument(name = "handler::list_products", skip(app_state, query), fields(params = query.len()))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse> {
  let query = build_query(Filter::new(), query.into_inner())?;
  let products = app_state.repos.products.find_products(&query).await?;
  let body = project_all(&products, &query.projection)?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "result": body.len(), "products": body })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path))]
pub async fn get_product_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
  let product_id = path.into_inner();
  let product = app_state
    .repos
    .products
    .get_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("No product found with that ID".to_string()))?;
  let reviews = app_state.repos.reviews.list_reviews(Some(product_id)).await?;

  let detail = project(&ProductDetail { product, reviews }, &default_projection())?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "product": detail })))
}

#[instrument(name = "handler::create_product", skip(app_state, payload, auth_user), fields(seller = %auth_user.user_id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<ProductInput>,
) -> Result<HttpResponse> {
  let new_product = payload.into_inner().validate(auth_user.user_id)?;
  let product = app_state.repos.products.insert_product(new_product).await?;
  info!(product_id = %product.id, "Product created.");
  let body = project(&product, &default_projection())?;
  Ok(HttpResponse::Created().json(json!({ "status": "success", "product": body })))
}

#[instrument(name = "handler::my_products", skip(app_state, query, auth_user), fields(seller = %auth_user.user_id))]
pub async fn my_products_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse> {
  let seller_field = PRODUCT_SCHEMA
    .field("seller")
    .ok_or_else(|| AppError::Internal("product schema has no seller field".to_string()))?;
  let base = Filter::new().eq(seller_field, Value::Id(auth_user.user_id));
  let query = build_query(base, query.into_inner())?;
  let products = app_state.repos.products.find_products(&query).await?;
  let body = project_all(&products, &query.projection)?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "results": body.len(), "data": body })))
}

#[instrument(
  name = "handler::update_product",
  skip(app_state, path, payload, auth_user),
  fields(seller = %auth_user.user_id, product_id = %path)
)]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  payload: web::Json<ProductPatch>,
) -> Result<HttpResponse> {
  let patch = payload.into_inner().validate()?;
  let product = app_state
    .repos
    .products
    .update_owned_product(path.into_inner(), auth_user.user_id, patch)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found or you are not authorized".to_string()))?;
  info!(product_id = %product.id, version = product.version, "Product updated.");
  let body = project(&product, &default_projection())?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "product": body })))
}

#[instrument(
  name = "handler::delete_product",
  skip(app_state, path, auth_user),
  fields(seller = %auth_user.user_id, product_id = %path)
)]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse> {
  let deleted = app_state
    .repos
    .products
    .delete_owned_product(path.into_inner(), auth_user.user_id)
    .await?;
  if !deleted {
    return Err(AppError::NotFound("Product not found or you are not authorized".to_string()));
  }
  Ok(HttpResponse::NoContent().finish())
}
