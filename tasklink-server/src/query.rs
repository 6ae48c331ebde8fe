//! List-query translation: `where` / `sort` / `select` / `skip` / `limit` /
//! `count` parameters evaluated over JSON representations of the entities.
//!
//! Parameter values carrying structure (`where`, `sort`, `select`) are
//! JSON-encoded in the query string. `skip` and `limit` parse leniently:
//! a non-numeric value falls back to the default, matching the original
//! service. `count=true` replaces the document list with a match count.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw query-string parameters for list endpoints, before JSON decoding.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawListParams {
    /// JSON object of field → expected value (equality match).
    #[serde(rename = "where")]
    pub filter: Option<String>,
    /// JSON object of field → 1 (ascending) or -1 (descending).
    pub sort: Option<String>,
    /// JSON object of field → 1 (include) or 0 (exclude).
    pub select: Option<String>,
    /// Number of matching documents to skip.
    pub skip: Option<String>,
    /// Maximum number of documents to return.
    pub limit: Option<String>,
    /// When `"true"`, return the match count instead of documents.
    pub count: Option<String>,
}

/// Errors produced while decoding query parameters.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A structured parameter did not contain valid JSON.
    #[error("invalid JSON for query param '{param}'")]
    InvalidJson {
        /// Name of the offending parameter.
        param: &'static str,
    },
    /// A structured parameter decoded to something other than an object.
    #[error("query param '{param}' must be a JSON object")]
    NotAnObject {
        /// Name of the offending parameter.
        param: &'static str,
    },
}

/// A decoded list query ready to be applied to a document snapshot.
#[derive(Debug, Default)]
pub struct ListQuery {
    /// Equality filter, field → expected value.
    pub filter: Option<Map<String, Value>>,
    /// Sort keys in priority order, field → direction.
    pub sort: Option<Map<String, Value>>,
    /// Projection, field → include/exclude flag.
    pub select: Option<Map<String, Value>>,
    /// Documents to skip after filtering and sorting.
    pub skip: usize,
    /// Explicit limit; `None` falls back to the endpoint default.
    pub limit: Option<usize>,
    /// Whether to return a count instead of documents.
    pub count: bool,
}

impl ListQuery {
    /// Decodes raw query-string parameters into a [`ListQuery`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if `where`, `sort`, or `select` carry invalid
    /// JSON or decode to a non-object.
    pub fn parse(raw: &RawListParams) -> Result<Self, QueryError> {
        Ok(Self {
            filter: parse_object("where", raw.filter.as_deref())?,
            sort: parse_object("sort", raw.sort.as_deref())?,
            select: parse_object("select", raw.select.as_deref())?,
            skip: raw
                .skip
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            limit: raw.limit.as_deref().and_then(|s| s.parse().ok()),
            count: raw.count.as_deref() == Some("true"),
        })
    }

    /// Applies filter, sort, skip, limit, and projection to a snapshot of
    /// documents. `default_limit` applies only when no explicit limit was
    /// given; `None` means unlimited.
    #[must_use]
    pub fn apply(&self, docs: Vec<Value>, default_limit: Option<usize>) -> Vec<Value> {
        let mut docs: Vec<Value> = docs
            .into_iter()
            .filter(|doc| self.matches(doc))
            .collect();

        if let Some(sort) = &self.sort {
            sort_docs(&mut docs, sort);
        }

        let mut docs: Vec<Value> = docs.into_iter().skip(self.skip).collect();
        if let Some(limit) = self.limit.or(default_limit) {
            docs.truncate(limit);
        }

        match &self.select {
            Some(select) => docs.iter().map(|doc| project(doc, select)).collect(),
            None => docs,
        }
    }

    /// Counts documents matching the filter. Skip and limit are ignored,
    /// matching the original service's count semantics.
    #[must_use]
    pub fn count_matching(&self, docs: &[Value]) -> usize {
        docs.iter().filter(|doc| self.matches(doc)).count()
    }

    fn matches(&self, doc: &Value) -> bool {
        self.filter.as_ref().is_none_or(|filter| {
            filter
                .iter()
                .all(|(field, expected)| doc.get(field).unwrap_or(&Value::Null) == expected)
        })
    }
}

/// Applies a projection to one document.
///
/// If any field is flagged truthy, the projection is inclusive: named truthy
/// fields are kept, plus `id` unless explicitly excluded with 0. Otherwise
/// the projection is exclusive: named fields are dropped.
#[must_use]
pub fn project(doc: &Value, select: &Map<String, Value>) -> Value {
    let Some(fields) = doc.as_object() else {
        return doc.clone();
    };
    let inclusive = select.values().any(is_truthy);

    let projected: Map<String, Value> = if inclusive {
        fields
            .iter()
            .filter(|(name, _)| select.get(*name).map_or(*name == "id", is_truthy))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    } else {
        fields
            .iter()
            .filter(|(name, _)| !select.contains_key(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    };
    Value::Object(projected)
}

fn is_truthy(flag: &Value) -> bool {
    match flag {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        _ => false,
    }
}

fn parse_object(
    param: &'static str,
    raw: Option<&str>,
) -> Result<Option<Map<String, Value>>, QueryError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: Value =
        serde_json::from_str(raw).map_err(|_| QueryError::InvalidJson { param })?;
    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(QueryError::NotAnObject { param }),
    }
}

/// Stable multi-key sort; keys apply in insertion order, direction -1 (or
/// any negative number) reverses.
fn sort_docs(docs: &mut [Value], sort: &Map<String, Value>) {
    docs.sort_by(|a, b| {
        for (field, direction) in sort {
            let ord = compare_values(
                a.get(field).unwrap_or(&Value::Null),
                b.get(field).unwrap_or(&Value::Null),
            );
            let descending = direction.as_f64().unwrap_or(1.0) < 0.0;
            let ord = if descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Total order over JSON values: null < bool < number < string < array <
/// object, with natural ordering within numbers and strings.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&y.as_f64().unwrap_or(0.0)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
