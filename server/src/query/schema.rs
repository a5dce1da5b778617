// server/src/query/schema.rs

//! Field schemas that tell the query builder which API names may be filtered,
//! sorted or projected, and how their values are typed.

use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Number,
  Text,
  Id,
  Time,
}

/// An API field name and the column that stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: &'static str,
  pub column: &'static str,
  pub kind: FieldKind,
}

#[derive(Debug)]
pub struct CollectionSchema {
  pub fields: &'static [FieldSpec],
  pub default_sort: &'static str,
  /// Fields left out of responses when no projection is requested.
  pub hidden: &'static [&'static str],
}

impl CollectionSchema {
  pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
    self.fields.iter().find(|f| f.name == name)
  }
}

pub static PRODUCT_SCHEMA: CollectionSchema = CollectionSchema {
  fields: &[
    FieldSpec { name: "id", column: "id", kind: FieldKind::Id },
    FieldSpec { name: "title", column: "title", kind: FieldKind::Text },
    FieldSpec { name: "description", column: "description", kind: FieldKind::Text },
    FieldSpec { name: "price", column: "price", kind: FieldKind::Number },
    FieldSpec { name: "category", column: "category", kind: FieldKind::Text },
    FieldSpec { name: "image", column: "image", kind: FieldKind::Text },
    FieldSpec { name: "rating", column: "rating", kind: FieldKind::Number },
    FieldSpec { name: "seller", column: "seller_id", kind: FieldKind::Id },
    FieldSpec { name: "version", column: "version", kind: FieldKind::Number },
    FieldSpec { name: "createdAt", column: "created_at", kind: FieldKind::Time },
    FieldSpec { name: "updatedAt", column: "updated_at", kind: FieldKind::Time },
  ],
  default_sort: "-createdAt",
  hidden: &["version"],
};

/// A typed filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Number(f64),
  Text(String),
  Id(Uuid),
  Time(DateTime<Utc>),
}

impl Value {
  /// Coerces a raw query-string value into the field's type.
  ///
  /// Numeric fields take anything that parses as a finite number after
  /// trimming. Text fields keep the original text even when it looks numeric.
  pub fn parse(field: &FieldSpec, raw: &str) -> Result<Value, String> {
    match field.kind {
      FieldKind::Number => raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Value::Number)
        .ok_or_else(|| format!("'{}' is not a number for field '{}'", raw, field.name)),
      FieldKind::Text => Ok(Value::Text(raw.to_string())),
      FieldKind::Id => Uuid::parse_str(raw.trim())
        .map(Value::Id)
        .map_err(|_| format!("'{}' is not a valid id for field '{}'", raw, field.name)),
      FieldKind::Time => parse_time(raw.trim())
        .map(Value::Time)
        .ok_or_else(|| format!("'{}' is not a valid timestamp for field '{}'", raw, field.name)),
    }
  }

  /// Ordering between two values of the same kind. Mixed kinds do not compare.
  pub fn compare(&self, other: &Value) -> Option<Ordering> {
    match (self, other) {
      (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
      (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
      (Value::Id(a), Value::Id(b)) => Some(a.cmp(b)),
      (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
      _ => None,
    }
  }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return Some(ts.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numbers_are_trimmed_and_must_be_finite() {
    let price = PRODUCT_SCHEMA.field("price").unwrap();
    assert_eq!(Value::parse(price, " 25 "), Ok(Value::Number(25.0)));
    assert!(Value::parse(price, "abc").is_err());
    assert!(Value::parse(price, "NaN").is_err());
    assert!(Value::parse(price, "inf").is_err());
  }

  #[test]
  fn text_fields_keep_numeric_looking_values_as_text() {
    let title = PRODUCT_SCHEMA.field("title").unwrap();
    assert_eq!(Value::parse(title, "42"), Ok(Value::Text("42".into())));
  }

  #[test]
  fn dates_and_timestamps_parse() {
    let created = PRODUCT_SCHEMA.field("createdAt").unwrap();
    assert!(matches!(Value::parse(created, "2024-05-01"), Ok(Value::Time(_))));
    assert!(matches!(Value::parse(created, "2024-05-01T10:00:00Z"), Ok(Value::Time(_))));
    assert!(Value::parse(created, "yesterday").is_err());
  }

  #[test]
  fn seller_maps_to_its_column() {
    assert_eq!(PRODUCT_SCHEMA.field("seller").unwrap().column, "seller_id");
    assert!(PRODUCT_SCHEMA.field("seller_id").is_none());
  }
}
