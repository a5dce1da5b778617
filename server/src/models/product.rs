// server/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{required_text, Review};
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub title: String,
  pub description: String,
  pub price: f64,
  pub category: String,
  pub image: Option<String>,
  pub rating: Option<f64>,
  #[sqlx(rename = "seller_id")]
  pub seller: Option<Uuid>,
  /// Bumped on every update; hidden from list responses unless asked for.
  pub version: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The product fields joined into a cart line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
  pub id: Uuid,
  pub title: String,
  pub price: f64,
  pub image: Option<String>,
}

impl From<&Product> for ProductSummary {
  fn from(p: &Product) -> Self {
    Self {
      id: p.id,
      title: p.title.clone(),
      price: p.price,
      image: p.image.clone(),
    }
  }
}

/// A single product with its reviews joined in.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
  #[serde(flatten)]
  pub product: Product,
  pub reviews: Vec<Review>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
  pub title: String,
  pub description: String,
  pub price: f64,
  pub category: String,
  pub image: Option<String>,
  pub rating: Option<f64>,
  pub seller: Option<Uuid>,
}

/// Body of `create-product`. Any `seller` in the body is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
  pub title: Option<String>,
  pub description: Option<String>,
  pub price: Option<f64>,
  pub category: Option<String>,
  pub image: Option<String>,
  pub rating: Option<f64>,
}

impl ProductInput {
  pub fn validate(self, seller: Uuid) -> Result<NewProduct> {
    let price = self
      .price
      .ok_or_else(|| AppError::Validation("price is required".to_string()))?;
    Ok(NewProduct {
      title: required_text("title", self.title)?,
      description: required_text("description", self.description)?,
      price: check_price(price)?,
      category: required_text("category", self.category)?,
      image: self.image.map(check_image).transpose()?,
      rating: self.rating.map(check_rating).transpose()?,
      seller: Some(seller),
    })
  }
}

/// Body of `update-product`. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  pub title: Option<String>,
  pub description: Option<String>,
  pub price: Option<f64>,
  pub category: Option<String>,
  pub image: Option<String>,
  pub rating: Option<f64>,
}

impl ProductPatch {
  pub fn validate(self) -> Result<Self> {
    Ok(Self {
      title: self.title.map(|t| required_text("title", Some(t))).transpose()?,
      description: self.description.map(|d| required_text("description", Some(d))).transpose()?,
      price: self.price.map(check_price).transpose()?,
      category: self.category.map(|c| required_text("category", Some(c))).transpose()?,
      image: self.image.map(check_image).transpose()?,
      rating: self.rating.map(check_rating).transpose()?,
    })
  }

  pub fn apply_to(&self, product: &mut Product) {
    if let Some(title) = &self.title {
      product.title = title.clone();
    }
    if let Some(description) = &self.description {
      product.description = description.clone();
    }
    if let Some(price) = self.price {
      product.price = price;
    }
    if let Some(category) = &self.category {
      product.category = category.clone();
    }
    if let Some(image) = &self.image {
      product.image = Some(image.clone());
    }
    if let Some(rating) = self.rating {
      product.rating = Some(rating);
    }
  }
}

fn check_price(price: f64) -> Result<f64> {
  if price.is_finite() && price >= 0.0 {
    Ok(price)
  } else {
    Err(AppError::Validation("price must be a non-negative number".to_string()))
  }
}

fn check_rating(rating: f64) -> Result<f64> {
  if rating.is_finite() && (0.0..=5.0).contains(&rating) {
    Ok(rating)
  } else {
    Err(AppError::Validation("rating must be between 0 and 5".to_string()))
  }
}

fn check_image(image: String) -> Result<String> {
  let image = image.trim().to_string();
  if image.starts_with("http://") || image.starts_with("https://") {
    Ok(image)
  } else {
    Err(AppError::Validation("image must be an http(s) URL".to_string()))
  }
}
