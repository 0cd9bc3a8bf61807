//! Query construction and evaluation.
//!
//! A [`Query`] is a plain value built with chained methods (filter, order,
//! limit, offset, projection, distinct, keys-only) and handed to a
//! [`Datastore`](crate::Datastore) to run. The backing stores here support
//! only simple equality/range filters on single fields — no multi-field
//! inequality and no joins — which is exactly why the query engine above
//! this layer merges key sets itself.
//!
//! Evaluation helpers live here so that every in-memory store implementation
//! shares the same filter/order/projection semantics.

use chrono::DateTime;
use runboard_core::Key;
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operator for a query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Field equals value. On a repeated (array) field this means
    /// "contains", matching datastore semantics for repeated properties.
    Eq,
    /// Field is less than value.
    Lt,
    /// Field is less than or equal to value.
    Le,
    /// Field is greater than value.
    Gt,
    /// Field is greater than or equal to value.
    Ge,
}

/// A single field filter.
#[derive(Debug, Clone)]
pub struct Filter {
    /// The entity field the filter applies to.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value compared against.
    pub value: Value,
}

/// Sort direction for [`Query::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

#[derive(Debug, Clone)]
struct Order {
    field: String,
    direction: Direction,
}

/// A query over one entity kind.
#[derive(Debug, Clone)]
pub struct Query {
    kind: String,
    filters: Vec<Filter>,
    order: Option<Order>,
    limit: Option<usize>,
    offset: usize,
    keys_only: bool,
    projection: Vec<String>,
    distinct: bool,
}

impl Query {
    /// A new query over the given kind, with no constraints.
    pub fn new(kind: impl Into<String>) -> Self {
        Query {
            kind: kind.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: 0,
            keys_only: false,
            projection: Vec::new(),
            distinct: false,
        }
    }

    /// Add a field filter.
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    /// Order results by the given field.
    pub fn order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            field: field.into(),
            direction,
        });
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` matching results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Return keys without materializing entities.
    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    /// Project entities down to the given fields.
    pub fn project(mut self, fields: &[&str]) -> Self {
        self.projection = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Deduplicate projected results.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// The entity kind this query scans.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether this query returns keys without entities.
    pub fn is_keys_only(&self) -> bool {
        self.keys_only
    }

    /// Whether the entity satisfies every filter on this query.
    pub fn matches(&self, entity: &Value) -> bool {
        self.filters.iter().all(|f| filter_matches(f, entity))
    }

    /// Evaluate this query over a snapshot of (key, entity) pairs.
    ///
    /// Applies filters, ordering, offset, limit, projection, and distinct;
    /// for keys-only queries the entity halves of the result are `None`.
    pub fn evaluate(&self, snapshot: Vec<(Key, Value)>) -> Vec<(Key, Option<Value>)> {
        let mut rows: Vec<(Key, Value)> = snapshot
            .into_iter()
            .filter(|(_, entity)| self.matches(entity))
            .collect();

        if let Some(order) = &self.order {
            // Stable sort, tie-broken by key so scans are deterministic.
            rows.sort_by(|(ka, a), (kb, b)| {
                let ord = compare_values(a.get(&order.field), b.get(&order.field));
                let ord = match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                ord.then_with(|| ka.cmp(kb))
            });
        }

        let mut rows: Vec<(Key, Value)> = rows
            .into_iter()
            .skip(self.offset)
            .map(|(key, entity)| {
                if self.projection.is_empty() {
                    (key, entity)
                } else {
                    (key, project_entity(&entity, &self.projection))
                }
            })
            .collect();

        if self.distinct && !self.projection.is_empty() {
            let mut seen = Vec::new();
            rows.retain(|(_, entity)| {
                if seen.contains(entity) {
                    false
                } else {
                    seen.push(entity.clone());
                    true
                }
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        rows.into_iter()
            .map(|(key, entity)| {
                if self.keys_only {
                    (key, None)
                } else {
                    (key, Some(entity))
                }
            })
            .collect()
    }
}

fn filter_matches(filter: &Filter, entity: &Value) -> bool {
    let field = match entity.get(&filter.field) {
        Some(v) => v,
        None => return false,
    };
    // Repeated property: equality means containment, range ops apply to any
    // element.
    if let Value::Array(items) = field {
        return items
            .iter()
            .any(|item| op_holds(filter.op, compare_values(Some(item), Some(&filter.value))));
    }
    op_holds(filter.op, compare_values(Some(field), Some(&filter.value)))
}

fn op_holds(op: FilterOp, ord: Ordering) -> bool {
    match op {
        FilterOp::Eq => ord == Ordering::Equal,
        FilterOp::Lt => ord == Ordering::Less,
        FilterOp::Le => ord != Ordering::Greater,
        FilterOp::Gt => ord == Ordering::Greater,
        FilterOp::Ge => ord != Ordering::Less,
    }
}

/// Compare two entity field values.
///
/// Numbers compare numerically, strings lexicographically — except strings
/// that both parse as RFC 3339 timestamps, which compare as instants so
/// that fractional-second encodings order correctly. Missing values sort
/// before present ones.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => {
                match (
                    DateTime::parse_from_rfc3339(x),
                    DateTime::parse_from_rfc3339(y),
                ) {
                    (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                    _ => x.cmp(y),
                }
            }
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            // Mixed types have no meaningful order; fall back to their JSON
            // text so the result is at least total and deterministic.
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

fn project_entity(entity: &Value, fields: &[String]) -> Value {
    let mut out = serde_json::Map::new();
    for field in fields {
        if let Some(v) = entity.get(field) {
            out.insert(field.clone(), v.clone());
        }
    }
    Value::Object(out)
}
