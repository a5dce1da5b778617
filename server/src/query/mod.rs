// server/src/query/mod.rs

//! Collection queries built from HTTP query strings.
//!
//! [`QueryFeatures`] turns raw `key=value` pairs into a [`CollectionQuery`]:
//! a filter, a sort order, a field projection and a skip/limit window. The
//! store executes the query; the projection is applied to the serialized
//! records afterwards.

pub mod features;
pub mod schema;

pub use features::{QueryError, QueryFeatures};
pub use schema::{CollectionSchema, FieldKind, FieldSpec, Value, PRODUCT_SCHEMA};

use std::cmp::Ordering;
use uuid::Uuid;

/// A record the in-memory store can filter and sort by API field name.
pub trait Document {
  fn id(&self) -> Uuid;
  fn field_value(&self, field: &FieldSpec) -> Option<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
  Gte,
  Gt,
  Lte,
  Lt,
}

impl RangeOp {
  pub fn parse(op: &str) -> Option<Self> {
    match op {
      "gte" => Some(RangeOp::Gte),
      "gt" => Some(RangeOp::Gt),
      "lte" => Some(RangeOp::Lte),
      "lt" => Some(RangeOp::Lt),
      _ => None,
    }
  }

  pub fn sql(self) -> &'static str {
    match self {
      RangeOp::Gte => ">=",
      RangeOp::Gt => ">",
      RangeOp::Lte => "<=",
      RangeOp::Lt => "<",
    }
  }
}

/// Bounds on one field. Several operators on the same field land in one range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Range {
  pub bounds: Vec<(RangeOp, Value)>,
}

impl Range {
  /// Sets `op`, replacing an earlier bound with the same operator.
  pub fn set(&mut self, op: RangeOp, value: Value) {
    self.bounds.retain(|(existing, _)| *existing != op);
    self.bounds.push((op, value));
  }

  pub fn contains(&self, value: &Value) -> bool {
    self.bounds.iter().all(|(op, bound)| match value.compare(bound) {
      Some(ordering) => match op {
        RangeOp::Gte => ordering != Ordering::Less,
        RangeOp::Gt => ordering == Ordering::Greater,
        RangeOp::Lte => ordering != Ordering::Greater,
        RangeOp::Lt => ordering == Ordering::Less,
      },
      None => false,
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
  Eq(Value),
  /// A repeated exact-match key: any of the values matches.
  In(Vec<Value>),
  Range(Range),
}

impl Condition {
  /// A missing value never matches.
  pub fn matches(&self, value: Option<&Value>) -> bool {
    let Some(value) = value else {
      return false;
    };
    match self {
      Condition::Eq(expected) => value.compare(expected) == Some(Ordering::Equal),
      Condition::In(options) => options.iter().any(|o| value.compare(o) == Some(Ordering::Equal)),
      Condition::Range(range) => range.contains(value),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
  pub field: &'static FieldSpec,
  pub condition: Condition,
}

/// A conjunction of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
  pub clauses: Vec<Clause>,
}

impl Filter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn eq(mut self, field: &'static FieldSpec, value: Value) -> Self {
    self.clauses.push(Clause {
      field,
      condition: Condition::Eq(value),
    });
    self
  }

  pub fn matches<D: Document>(&self, doc: &D) -> bool {
    self
      .clauses
      .iter()
      .all(|c| c.condition.matches(doc.field_value(c.field).as_ref()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortKey {
  pub field: &'static FieldSpec,
  pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
  /// Only these fields, plus `id`.
  Include(Vec<&'static str>),
  Exclude(Vec<&'static str>),
}

impl Projection {
  pub fn apply(&self, doc: serde_json::Value) -> serde_json::Value {
    match doc {
      serde_json::Value::Object(mut map) => {
        match self {
          Projection::Include(fields) => map.retain(|k, _| k == "id" || fields.contains(&k.as_str())),
          Projection::Exclude(fields) => map.retain(|k, _| !fields.contains(&k.as_str())),
        }
        serde_json::Value::Object(map)
      }
      other => other,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
  pub filter: Filter,
  pub sort: Vec<SortKey>,
  pub projection: Projection,
  pub skip: u64,
  /// `None` until `paginate` runs.
  pub limit: Option<u64>,
}

impl CollectionQuery {
  /// Orders two documents by the sort keys, breaking ties on id.
  ///
  /// Missing values sort after present ones ascending and before them
  /// descending, the way Postgres orders NULLs.
  pub fn compare<D: Document>(&self, a: &D, b: &D) -> Ordering {
    for key in &self.sort {
      let ordering = match (a.field_value(key.field), b.field_value(key.field)) {
        (Some(x), Some(y)) => x.compare(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
      };
      let ordering = if key.descending { ordering.reverse() } else { ordering };
      if ordering != Ordering::Equal {
        return ordering;
      }
    }
    a.id().cmp(&b.id())
  }

  /// Filters, sorts and windows `docs` in memory.
  pub fn execute<D: Document + Clone>(&self, docs: impl IntoIterator<Item = D>) -> Vec<D> {
    let mut matched: Vec<D> = docs.into_iter().filter(|d| self.filter.matches(d)).collect();
    matched.sort_by(|a, b| self.compare(a, b));
    let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
    let limit = self
      .limit
      .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
      .unwrap_or(usize::MAX);
    matched.into_iter().skip(skip).take(limit).collect()
  }
}
