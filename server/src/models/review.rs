// server/src/models/review.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::required_text;
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  pub id: Uuid,
  #[serde(rename = "product")]
  pub product_id: Uuid,
  #[serde(rename = "user")]
  pub user_id: Uuid,
  pub rating: i32,
  pub review: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
  pub product_id: Uuid,
  pub user_id: Uuid,
  pub rating: i32,
  pub review: String,
}

/// Body of `create-review`. `product` is only read when the route does not name one.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewInput {
  pub product: Option<Uuid>,
  pub rating: Option<i32>,
  pub review: Option<String>,
}

impl ReviewInput {
  pub fn validate(self, route_product: Option<Uuid>, user_id: Uuid) -> Result<NewReview> {
    let product_id = route_product
      .or(self.product)
      .ok_or_else(|| AppError::Validation("Review must belong to a product".to_string()))?;
    let rating = self
      .rating
      .ok_or_else(|| AppError::Validation("rating is required".to_string()))?;
    Ok(NewReview {
      product_id,
      user_id,
      rating: check_rating(rating)?,
      review: required_text("review", self.review)?,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
  pub rating: Option<i32>,
  pub review: Option<String>,
}

impl ReviewPatch {
  pub fn validate(self) -> Result<Self> {
    Ok(Self {
      rating: self.rating.map(check_rating).transpose()?,
      review: self.review.map(|r| required_text("review", Some(r))).transpose()?,
    })
  }

  pub fn apply_to(&self, review: &mut Review) {
    if let Some(rating) = self.rating {
      review.rating = rating;
    }
    if let Some(text) = &self.review {
      review.review = text.clone();
    }
  }
}

fn check_rating(rating: i32) -> Result<i32> {
  if (1..=5).contains(&rating) {
    Ok(rating)
  } else {
    Err(AppError::Validation("rating must be between 1 and 5".to_string()))
  }
}
