//! Query-string driven filtering, projection, sorting and pagination for list
//! endpoints.
//!
//! Operates on the serialized (JSON) form of records so every resource type
//! gets the same behavior:
//!
//! - `field=value` / `field[op]=value` with `op` in `gt|gte|lt|lte|in`
//! - `select=a,b` keeps only those fields (plus `id`)
//! - `sort=a,-b` (default `-createdAt`)
//! - `page` (default 1) and `limit` (default 25, max 100)

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value};

use craftmart_core::{DomainError, DomainResult};

pub const DEFAULT_LIMIT: usize = 25;
pub const MAX_LIMIT: usize = 100;
const DEFAULT_SORT: &str = "-createdAt";
const RESERVED: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Parsed list options.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: usize,
    pub limit: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            select: None,
            sort: parse_sort(DEFAULT_SORT),
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// One page of results. `count` is the number of records in `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPage {
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

impl ListQuery {
    pub fn parse<'a, I>(params: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = ListQuery::default();

        for (key, value) in params {
            match key {
                "select" => query.select = Some(split_list(value)),
                "sort" => query.sort = parse_sort(value),
                "page" => query.page = parse_positive("page", value)?,
                "limit" => query.limit = parse_positive("limit", value)?.min(MAX_LIMIT),
                _ => query.filters.push(parse_filter(key, value)?),
            }
        }

        Ok(query)
    }

    /// Filter, sort, paginate and project `records`.
    pub fn apply<T: Serialize>(&self, records: &[T]) -> DomainResult<ListPage> {
        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            let doc = serde_json::to_value(record)
                .map_err(|e| DomainError::validation(format!("unserializable record: {e}")))?;
            if self.filters.iter().all(|f| matches_filter(&doc, f)) {
                docs.push(doc);
            }
        }

        docs.sort_by(|a, b| self.compare(a, b));

        let total = docs.len();
        let start = (self.page - 1).saturating_mul(self.limit);
        let end = start.saturating_add(self.limit);

        let pagination = Pagination {
            next: (end < total).then_some(PageRef {
                page: self.page + 1,
                limit: self.limit,
            }),
            prev: (start > 0).then_some(PageRef {
                page: self.page - 1,
                limit: self.limit,
            }),
        };

        let data: Vec<Value> = docs
            .into_iter()
            .skip(start)
            .take(self.limit)
            .map(|doc| self.project(doc))
            .collect();

        Ok(ListPage {
            count: data.len(),
            pagination,
            data,
        })
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.sort {
            let ord = compare_values(a.get(&key.field), b.get(&key.field));
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn project(&self, doc: Value) -> Value {
        let (Some(fields), Value::Object(map)) = (&self.select, &doc) else {
            return doc;
        };
        let kept: Map<String, Value> = map
            .iter()
            .filter(|(k, _)| k.as_str() == "id" || fields.iter().any(|f| f == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(kept)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_sort(value: &str) -> Vec<SortKey> {
    split_list(value)
        .into_iter()
        .map(|field| match field.strip_prefix('-') {
            Some(rest) => SortKey {
                field: rest.to_string(),
                descending: true,
            },
            None => SortKey {
                field,
                descending: false,
            },
        })
        .collect()
}

fn parse_positive(name: &str, value: &str) -> DomainResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(DomainError::validation(format!(
            "{name} must be a positive integer"
        ))),
    }
}

fn parse_filter(key: &str, value: &str) -> DomainResult<Filter> {
    let (field, op) = match key.split_once('[') {
        None => (key, FilterOp::Eq),
        Some((field, rest)) => {
            let op = match rest.strip_suffix(']') {
                Some("gt") => FilterOp::Gt,
                Some("gte") => FilterOp::Gte,
                Some("lt") => FilterOp::Lt,
                Some("lte") => FilterOp::Lte,
                Some("in") => FilterOp::In,
                _ => {
                    return Err(DomainError::validation(format!(
                        "unsupported filter operator in '{key}'"
                    )));
                }
            };
            (field, op)
        }
    };

    if field.is_empty() || RESERVED.contains(&field) {
        return Err(DomainError::validation(format!("invalid filter field '{key}'")));
    }

    Ok(Filter {
        field: field.to_string(),
        op,
        value: value.to_string(),
    })
}

fn matches_filter(doc: &Value, filter: &Filter) -> bool {
    let Some(actual) = doc.get(&filter.field) else {
        return false;
    };
    match actual {
        Value::Array(items) => items.iter().any(|item| matches_scalar(item, filter)),
        other => matches_scalar(other, filter),
    }
}

fn matches_scalar(actual: &Value, filter: &Filter) -> bool {
    match filter.op {
        FilterOp::Eq => scalar_eq(actual, &filter.value),
        FilterOp::In => split_list(&filter.value)
            .iter()
            .any(|candidate| scalar_eq(actual, candidate)),
        FilterOp::Gt => compare_scalar(actual, &filter.value) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(
            compare_scalar(actual, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lt => compare_scalar(actual, &filter.value) == Some(Ordering::Less),
        FilterOp::Lte => matches!(
            compare_scalar(actual, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

fn scalar_eq(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::String(s) => s == expected,
        Value::Number(n) => match (n.as_f64(), expected.trim().parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        Value::Bool(b) => expected.trim().parse::<bool>() == Ok(*b),
        Value::Null => expected == "null",
        _ => false,
    }
}

/// Numeric comparison when both sides are numbers, string comparison for
/// strings (which orders RFC 3339 timestamps correctly).
fn compare_scalar(actual: &Value, expected: &str) -> Option<Ordering> {
    match actual {
        Value::Number(n) => {
            let b = expected.trim().parse::<f64>().ok()?;
            n.as_f64()?.partial_cmp(&b)
        }
        Value::String(s) => Some(s.as_str().cmp(expected)),
        _ => None,
    }
}

/// Total order used for sorting. Missing and null values sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<Value> {
        vec![
            json!({"id": "1", "name": "Vase", "cost": 10, "category": ["Statue"], "available": true, "createdAt": "2024-01-01T00:00:00Z"}),
            json!({"id": "2", "name": "Boots", "cost": 80, "category": ["Shoes"], "available": false, "createdAt": "2024-01-03T00:00:00Z"}),
            json!({"id": "3", "name": "Scarf", "cost": 25, "category": ["Clothes", "Handicraft"], "available": true, "createdAt": "2024-01-02T00:00:00Z"}),
        ]
    }

    fn ids(page: &ListPage) -> Vec<&str> {
        page.data.iter().map(|d| d["id"].as_str().unwrap()).collect()
    }

    fn run(params: &[(&str, &str)]) -> ListPage {
        ListQuery::parse(params.iter().copied())
            .unwrap()
            .apply(&docs())
            .unwrap()
    }

    #[test]
    fn default_sort_is_newest_first() {
        assert_eq!(ids(&run(&[])), vec!["2", "3", "1"]);
    }

    #[test]
    fn numeric_range_filters() {
        let page = run(&[("cost[gte]", "20"), ("cost[lt]", "80")]);
        assert_eq!(ids(&page), vec!["3"]);
    }

    #[test]
    fn equality_matches_array_elements_and_bools() {
        assert_eq!(ids(&run(&[("category", "Handicraft")])), vec!["3"]);
        assert_eq!(ids(&run(&[("available", "true"), ("sort", "name")])), vec!["3", "1"]);
    }

    #[test]
    fn in_operator_accepts_any_listed_value() {
        let page = run(&[("category[in]", "Statue,Shoes"), ("sort", "cost")]);
        assert_eq!(ids(&page), vec!["1", "2"]);
    }

    #[test]
    fn select_keeps_requested_fields_and_id() {
        let page = run(&[("select", "name")]);
        assert_eq!(page.data[0], json!({"id": "2", "name": "Boots"}));
    }

    #[test]
    fn pagination_links() {
        let page = run(&[("limit", "1"), ("page", "2"), ("sort", "cost")]);
        assert_eq!(ids(&page), vec!["3"]);
        assert_eq!(page.count, 1);
        assert_eq!(page.pagination.next, Some(PageRef { page: 3, limit: 1 }));
        assert_eq!(page.pagination.prev, Some(PageRef { page: 1, limit: 1 }));

        let last = run(&[("limit", "2"), ("page", "2")]);
        assert_eq!(last.pagination.next, None);
    }

    #[test]
    fn limit_is_capped() {
        let q = ListQuery::parse([("limit", "1000")]).unwrap();
        assert_eq!(q.limit, MAX_LIMIT);
    }

    #[test]
    fn rejects_bad_options() {
        assert!(ListQuery::parse([("page", "0")]).is_err());
        assert!(ListQuery::parse([("cost[regex]", "x")]).is_err());
        assert!(ListQuery::parse([("[gt]", "1")]).is_err());
    }

    #[test]
    fn missing_field_never_matches() {
        assert!(run(&[("color", "red")]).data.is_empty());
    }
}
