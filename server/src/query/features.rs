// server/src/query/features.rs

use thiserror::Error;

use super::schema::{CollectionSchema, FieldKind, FieldSpec, Value};
use super::{Clause, CollectionQuery, Condition, Filter, Projection, Range, RangeOp, SortKey};

const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];
const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
  #[error("Unknown field '{0}'")]
  UnknownField(String),

  #[error("Unsupported filter '{0}'")]
  UnsupportedOperator(String),

  #[error("{0}")]
  InvalidValue(String),

  #[error("Cannot mix included and excluded fields")]
  MixedProjection,
}

/// Chainable builder from raw query-string pairs to a [`CollectionQuery`].
///
/// ```ignore
/// let query = QueryFeatures::new(&PRODUCT_SCHEMA, Filter::new(), pairs)
///   .filter()?
///   .sort()?
///   .limit_fields()?
///   .paginate()
///   .build();
/// ```
pub struct QueryFeatures {
  schema: &'static CollectionSchema,
  params: Vec<(String, String)>,
  query: CollectionQuery,
}

impl QueryFeatures {
  /// Starts from `base`, the default sort and the default projection.
  pub fn new(schema: &'static CollectionSchema, base: Filter, params: Vec<(String, String)>) -> Self {
    let sort = parse_sort(schema, schema.default_sort).unwrap_or_default();
    Self {
      schema,
      params,
      query: CollectionQuery {
        filter: base,
        sort,
        projection: Projection::Exclude(schema.hidden.to_vec()),
        skip: 0,
        limit: None,
      },
    }
  }

  /// Last value of a reserved key.
  fn reserved(&self, key: &str) -> Option<&str> {
    self
      .params
      .iter()
      .rev()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  /// Adds a clause for every non-reserved key.
  pub fn filter(mut self) -> Result<Self, QueryError> {
    let mut exact: Vec<(&'static FieldSpec, Vec<Value>)> = Vec::new();
    let mut ranges: Vec<(&'static FieldSpec, Range)> = Vec::new();

    for (key, raw) in &self.params {
      if key.is_empty() || RESERVED_KEYS.contains(&key.as_str()) {
        continue;
      }
      let (name, op) = split_operator(key)?;
      let field = self
        .schema
        .field(name)
        .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
      let value = Value::parse(field, raw).map_err(QueryError::InvalidValue)?;

      match op {
        None => match exact.iter_mut().find(|(f, _)| f.name == field.name) {
          Some((_, values)) => values.push(value),
          None => exact.push((field, vec![value])),
        },
        Some(op) => {
          if field.kind == FieldKind::Id {
            return Err(QueryError::UnsupportedOperator(key.clone()));
          }
          match ranges.iter_mut().find(|(f, _)| f.name == field.name) {
            Some((_, range)) => range.set(op, value),
            None => {
              let mut range = Range::default();
              range.set(op, value);
              ranges.push((field, range));
            }
          }
        }
      }
    }

    for (field, mut values) in exact {
      let condition = if values.len() == 1 {
        Condition::Eq(values.remove(0))
      } else {
        Condition::In(values)
      };
      self.query.filter.clauses.push(Clause { field, condition });
    }
    for (field, range) in ranges {
      self.query.filter.clauses.push(Clause {
        field,
        condition: Condition::Range(range),
      });
    }
    Ok(self)
  }

  pub fn sort(mut self) -> Result<Self, QueryError> {
    if let Some(raw) = self.reserved("sort") {
      let keys = parse_sort(self.schema, raw)?;
      if !keys.is_empty() {
        self.query.sort = keys;
      }
    }
    Ok(self)
  }

  pub fn limit_fields(mut self) -> Result<Self, QueryError> {
    let Some(raw) = self.reserved("fields") else {
      return Ok(self);
    };

    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
      let (name, excluded) = match entry.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (entry, false),
      };
      let field = self
        .schema
        .field(name)
        .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
      if excluded {
        exclude.push(field.name);
      } else {
        include.push(field.name);
      }
    }

    match (include.is_empty(), exclude.is_empty()) {
      (false, false) => return Err(QueryError::MixedProjection),
      (false, true) => self.query.projection = Projection::Include(include),
      (true, false) => self.query.projection = Projection::Exclude(exclude),
      (true, true) => {}
    }
    Ok(self)
  }

  /// Non-numeric or non-positive values fall back to the defaults.
  pub fn paginate(mut self) -> Self {
    let page = positive(self.reserved("page")).unwrap_or(DEFAULT_PAGE);
    let limit = positive(self.reserved("limit")).unwrap_or(DEFAULT_LIMIT);
    self.query.skip = (page - 1).saturating_mul(limit);
    self.query.limit = Some(limit);
    self
  }

  pub fn build(self) -> CollectionQuery {
    self.query
  }
}

fn split_operator(key: &str) -> Result<(&str, Option<RangeOp>), QueryError> {
  let Some(open) = key.find('[') else {
    return Ok((key, None));
  };
  let op = key[open + 1..]
    .strip_suffix(']')
    .and_then(RangeOp::parse)
    .ok_or_else(|| QueryError::UnsupportedOperator(key.to_string()))?;
  Ok((&key[..open], Some(op)))
}

fn parse_sort(schema: &CollectionSchema, raw: &str) -> Result<Vec<SortKey>, QueryError> {
  let mut keys: Vec<SortKey> = Vec::new();
  for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
    let (name, descending) = match entry.strip_prefix('-') {
      Some(rest) => (rest, true),
      None => (entry, false),
    };
    let field = schema
      .field(name)
      .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
    if !keys.iter().any(|k| k.field.name == field.name) {
      keys.push(SortKey { field, descending });
    }
  }
  Ok(keys)
}

fn positive(raw: Option<&str>) -> Option<u64> {
  raw.and_then(|r| r.trim().parse::<u64>().ok()).filter(|n| *n > 0)
}
