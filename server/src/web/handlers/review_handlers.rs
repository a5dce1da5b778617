// server/src/web/handlers/review_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{ReviewInput, ReviewPatch};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

async fn create_review(
  app_state: &AppState,
  route_product: Option<Uuid>,
  input: ReviewInput,
  auth_user: &AuthenticatedUser,
) -> Result<HttpResponse> {
  if !auth_user.has_role("user") {
    warn!(role = ?auth_user.role, "Review rejected for role.");
    return Err(AppError::Forbidden(
      "You do not have permission to perform this action".to_string(),
    ));
  }

  let new_review = input.validate(route_product, auth_user.user_id)?;
  if app_state.repos.products.get_product(new_review.product_id).await?.is_none() {
    return Err(AppError::NotFound("No product found with that ID".to_string()));
  }

  let review = app_state.repos.reviews.insert_review(new_review).await?;
  info!(review_id = %review.id, product_id = %review.product_id, "Review created.");
  Ok(HttpResponse::Created().json(json!({ "status": "success", "review": review })))
}

#[instrument(
  name = "handler::create_product_review",
  skip(app_state, path, payload, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %path)
)]
pub async fn create_product_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  payload: web::Json<ReviewInput>,
) -> Result<HttpResponse> {
  create_review(&app_state, Some(path.into_inner()), payload.into_inner(), &auth_user).await
}

#[instrument(name = "handler::create_review", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn create_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<ReviewInput>,
) -> Result<HttpResponse> {
  create_review(&app_state, None, payload.into_inner(), &auth_user).await
}

#[instrument(name = "handler::list_reviews", skip(app_state))]
pub async fn list_all_reviews_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  let reviews = app_state.repos.reviews.list_reviews(None).await?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "review": reviews })))
}

#[instrument(name = "handler::list_product_reviews", skip(app_state, path), fields(product_id = %path))]
pub async fn list_product_reviews_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse> {
  let reviews = app_state.repos.reviews.list_reviews(Some(path.into_inner())).await?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "review": reviews })))
}

#[instrument(
  name = "handler::update_review",
  skip(app_state, path, payload, auth_user),
  fields(user_id = %auth_user.user_id, review_id = %path)
)]
pub async fn update_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  payload: web::Json<ReviewPatch>,
) -> Result<HttpResponse> {
  let patch = payload.into_inner().validate()?;
  let review = app_state
    .repos
    .reviews
    .update_owned_review(path.into_inner(), auth_user.user_id, patch)
    .await?
    .ok_or_else(|| AppError::NotFound("No review found with that ID".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "review": review })))
}

#[instrument(
  name = "handler::delete_review",
  skip(app_state, path, auth_user),
  fields(user_id = %auth_user.user_id, review_id = %path)
)]
pub async fn delete_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse> {
  let deleted = app_state
    .repos
    .reviews
    .delete_owned_review(path.into_inner(), auth_user.user_id)
    .await?;
  if !deleted {
    return Err(AppError::NotFound("No review found with that ID".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "data": null })))
}
