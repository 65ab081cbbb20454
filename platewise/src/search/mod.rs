//! # Listing, filtering and RediSearch query building
//!
//! Every collection is listed through one search index. List requests arrive as
//! flat query parameters (`page`, `limit`, `sort_by`, `sort_type` plus
//! collection-specific filters), are checked against the collection's
//! [`EntityDescriptor`], and become [`SearchParams`]. The Redis store turns those
//! into `FT.SEARCH`/`FT.AGGREGATE` calls; the memory store evaluates the same
//! conditions with [`FilterCondition::matches`].
//!
//! | Filter kind | Index type | Query clause            |
//! |-------------|------------|-------------------------|
//! | `Contains`  | TEXT       | `@name:*piz*`           |
//! | `Tag`       | TAG        | `@owner_id:{abc}`       |
//! | `Bool`      | TAG        | `@active:{true}`        |
//! | `Min`       | NUMERIC    | `@rating:[4 +inf]`      |

use std::{borrow::Cow, cmp::Ordering, collections::HashMap};

use redis::{Value, aio::ConnectionManager, cmd, from_redis_value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{errors::RepoError, types::EntityDescriptor};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
const TAG_SEPARATOR: &str = "|";
const INCLUDE_INACTIVE_PARAM: &str = "include_inactive";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, RepoError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "1" => Ok(SortOrder::Asc),
            "desc" | "-1" => Ok(SortOrder::Desc),
            other => Err(RepoError::InvalidRequest {
                message: format!("Unsupported sort direction: {other}"),
            }),
        }
    }
}

/// A sortable field: `name` is what callers pass in `sort_by`, `field` is the
/// indexed document field.
#[derive(Debug, Clone, Copy)]
pub struct SortField {
    pub name: &'static str,
    pub field: &'static str,
    pub default_order: SortOrder,
}

impl SortField {
    pub const fn desc(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            field,
            default_order: SortOrder::Desc,
        }
    }

    pub const fn asc(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            field,
            default_order: SortOrder::Asc,
        }
    }
}

/// Sort fields every collection supports.
pub const CREATED_AT_SORT: SortField = SortField::desc("created_at", "created_at_ts");
pub const UPDATED_AT_SORT: SortField = SortField::desc("updated_at", "updated_at_ts");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Contains,
    Tag,
    Bool,
    Min,
}

/// A query parameter accepted by a collection's list operation.
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub param: &'static str,
    pub field: &'static str,
    pub kind: FilterKind,
}

impl FilterField {
    pub const fn new(param: &'static str, field: &'static str, kind: FilterKind) -> Self {
        Self { param, field, kind }
    }
}

/// A composable filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    TagEquals { field: String, values: Vec<String> },
    NumericRange { field: String, min: Option<f64>, max: Option<f64> },
    BooleanEquals { field: String, value: bool },
    TextContains { field: String, value: String },
    And(Vec<FilterCondition>),
}

impl FilterCondition {
    #[inline]
    pub fn tag_eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::TagEquals {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    #[inline]
    pub fn bool_eq(field: impl Into<String>, value: bool) -> Self {
        Self::BooleanEquals {
            field: field.into(),
            value,
        }
    }

    #[inline]
    pub fn numeric_range(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self::NumericRange {
            field: field.into(),
            min,
            max,
        }
    }

    #[inline]
    pub fn text_contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::TextContains {
            field: field.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn and(conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    /// Convert this condition to a RediSearch query clause.
    pub fn to_query_clause(&self) -> String {
        match self {
            Self::TagEquals { field, values } => {
                let escaped: Vec<String> = values.iter().map(|v| escape_for_tag_query(v)).collect();
                format!("(@{}:{{{}}})", field, escaped.join(TAG_SEPARATOR))
            }
            Self::NumericRange { field, min, max } => {
                let min_s = min.map(format_numeric).unwrap_or_else(|| "-inf".to_string());
                let max_s = max.map(format_numeric).unwrap_or_else(|| "+inf".to_string());
                format!("(@{}:[{} {}])", field, min_s, max_s)
            }
            Self::BooleanEquals { field, value } => {
                format!("(@{}:{{{}}})", field, value)
            }
            Self::TextContains { field, value } => {
                let terms: Vec<String> = value.split_whitespace().map(escape_for_text_contains).collect();
                match terms.len() {
                    0 => String::new(),
                    1 => format!("(@{}:{})", field, terms.join("")),
                    _ => format!("(@{}:({}))", field, terms.join(" ")),
                }
            }
            Self::And(conditions) => {
                let clauses: Vec<String> = conditions
                    .iter()
                    .map(|c| c.to_query_clause())
                    .filter(|s| !s.is_empty())
                    .collect();
                match clauses.len() {
                    0 => String::new(),
                    1 => clauses.into_iter().next().unwrap_or_default(),
                    _ => format!("({})", clauses.join(" ")),
                }
            }
        }
    }

    /// Evaluate the condition against a stored document.
    pub fn matches(&self, document: &JsonValue) -> bool {
        match self {
            Self::TagEquals { field, values } => match document.get(field) {
                Some(JsonValue::String(actual)) => values.iter().any(|v| v.eq_ignore_ascii_case(actual)),
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .any(|actual| values.iter().any(|v| v.eq_ignore_ascii_case(actual))),
                _ => false,
            },
            Self::NumericRange { field, min, max } => match document.get(field).and_then(JsonValue::as_f64) {
                Some(actual) => min.is_none_or(|min| actual >= min) && max.is_none_or(|max| actual <= max),
                None => false,
            },
            Self::BooleanEquals { field, value } => document.get(field).and_then(JsonValue::as_bool) == Some(*value),
            // every whitespace-separated term must appear
            Self::TextContains { field, value } => document
                .get(field)
                .and_then(JsonValue::as_str)
                .is_some_and(|actual| {
                    let actual = actual.to_lowercase();
                    value
                        .split_whitespace()
                        .all(|term| actual.contains(&term.to_lowercase()))
                }),
            Self::And(conditions) => conditions.iter().all(|c| c.matches(document)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSort {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub page: u64,
    pub limit: u64,
    pub sort: SearchSort,
    /// All conditions are ANDed at top level.
    pub conditions: Vec<FilterCondition>,
}

impl SearchParams {
    pub fn new(sort: SearchSort) -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort,
            conditions: Vec::new(),
        }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    #[inline]
    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[inline]
    pub fn with_page(mut self, page: u64, limit: u64) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn build_query(&self) -> String {
        let clauses: Vec<String> = self
            .conditions
            .iter()
            .map(FilterCondition::to_query_clause)
            .filter(|clause| !clause.is_empty())
            .collect();
        if clauses.is_empty() {
            "*".to_string()
        } else {
            clauses.join(" ")
        }
    }

    pub fn matches(&self, document: &JsonValue) -> bool {
        self.conditions.iter().all(|condition| condition.matches(document))
    }

    /// Orders documents by the sort field, breaking ties by id so that page
    /// boundaries are stable.
    pub fn compare(&self, left: &JsonValue, right: &JsonValue) -> Ordering {
        let primary = compare_json(left.get(&self.sort.field), right.get(&self.sort.field));
        let primary = match self.sort.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| compare_json(left.get("id"), right.get("id")))
    }
}

fn compare_json(left: Option<&JsonValue>, right: Option<&JsonValue>) -> Ordering {
    match (left, right) {
        (Some(JsonValue::Number(a)), Some(JsonValue::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(a)), Some(JsonValue::String(b))) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Some(JsonValue::Bool(a)), Some(JsonValue::Bool(b))) => a.cmp(b),
        (None | Some(JsonValue::Null), None | Some(JsonValue::Null)) => Ordering::Equal,
        (None | Some(JsonValue::Null), _) => Ordering::Less,
        (_, None | Some(JsonValue::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// List request as received from a caller, before it is checked against a collection.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_type: Option<SortOrder>,
    pub include_inactive: bool,
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split raw query parameters into paging, sorting and filters.
    pub fn from_params(params: HashMap<String, String>) -> Result<Self, RepoError> {
        let mut query = Self::new();
        for (name, value) in params {
            match name.as_str() {
                "page" => query.page = Some(parse_number(&name, &value)?),
                "limit" => query.limit = Some(parse_number(&name, &value)?),
                "sort_by" => query.sort_by = Some(value),
                "sort_type" => query.sort_type = Some(SortOrder::parse(&value)?),
                INCLUDE_INACTIVE_PARAM => query.include_inactive = parse_bool(&name, &value)?,
                _ => query.filters.push((name, value)),
            }
        }
        Ok(query)
    }

    pub fn page(mut self, page: u64, limit: u64) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_type = Some(order);
        self
    }

    pub fn filter(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((param.into(), value.into()));
        self
    }

    pub fn including_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    /// Resolve against a collection: unknown sort fields and filters are rejected,
    /// `limit` is clamped to `1..=MAX_LIMIT` and `page` to at least 1.
    pub fn into_params(self, descriptor: &EntityDescriptor) -> Result<SearchParams, RepoError> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);

        let sort_field = match self.sort_by.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => descriptor
                .sorts
                .iter()
                .find(|field| field.name.eq_ignore_ascii_case(name))
                .copied()
                .ok_or_else(|| RepoError::InvalidRequest {
                    message: format!("Unsupported sort field: {name}"),
                })?,
            None => descriptor.default_sort,
        };
        let sort = SearchSort {
            field: sort_field.field.to_string(),
            order: self.sort_type.unwrap_or(sort_field.default_order),
        };

        let mut params = SearchParams::new(sort).with_page(page, limit);

        if let Some(visibility) = descriptor.visibility_field
            && !self.include_inactive
        {
            params = params.with_condition(FilterCondition::bool_eq(visibility, true));
        }

        for (param, value) in self.filters {
            let filter = descriptor
                .filters
                .iter()
                .find(|filter| filter.param == param)
                .ok_or_else(|| RepoError::InvalidRequest {
                    message: format!("Unsupported filter: {param}"),
                })?;
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let condition = match filter.kind {
                FilterKind::Contains => FilterCondition::text_contains(filter.field, value),
                FilterKind::Tag => FilterCondition::tag_eq(filter.field, value),
                FilterKind::Bool => FilterCondition::bool_eq(filter.field, parse_bool(&param, value)?),
                FilterKind::Min => {
                    let min = value.parse::<f64>().map_err(|_| RepoError::InvalidRequest {
                        message: format!("{param} must be a number"),
                    })?;
                    FilterCondition::numeric_range(filter.field, Some(min), None)
                }
            };
            params = params.with_condition(condition);
        }

        Ok(params)
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64, RepoError> {
    value.trim().parse::<u64>().map_err(|_| RepoError::InvalidRequest {
        message: format!("{name} must be a positive integer"),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, RepoError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(RepoError::InvalidRequest {
            message: format!("{name} must be true or false"),
        }),
    }
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_record: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            total_record: self.total_record,
            limit: self.limit,
            page: self.page,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total_record: self.total_record,
            page: self.page,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_record: u64,
    pub limit: u64,
    pub page: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum IndexFieldType {
    Tag,
    Text,
    Numeric,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexField {
    pub field_name: &'static str,
    pub field_type: IndexFieldType,
    pub sortable: bool,
}

impl IndexField {
    pub const fn tag(field_name: &'static str) -> Self {
        Self {
            field_name,
            field_type: IndexFieldType::Tag,
            sortable: false,
        }
    }

    pub const fn text(field_name: &'static str) -> Self {
        Self {
            field_name,
            field_type: IndexFieldType::Text,
            sortable: true,
        }
    }

    pub const fn numeric(field_name: &'static str) -> Self {
        Self {
            field_name,
            field_type: IndexFieldType::Numeric,
            sortable: true,
        }
    }

    pub const fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }
}

/// Index fields shared by every collection.
pub const BASE_INDEX: [IndexField; 3] = [
    IndexField::tag("id").sortable(),
    IndexField::numeric("created_at_ts"),
    IndexField::numeric("updated_at_ts"),
];

#[derive(Debug, Clone)]
pub struct IndexDefinition {
    pub name: String,
    pub prefix: String,
    pub schema: Vec<IndexField>,
}

pub async fn ensure_index(conn: &mut ConnectionManager, definition: &IndexDefinition) -> Result<(), RepoError> {
    let indexes: Vec<String> = cmd("FT._LIST").query_async(conn).await?;
    if indexes.iter().any(|name| name == &definition.name) {
        return Ok(());
    }

    let mut command = cmd("FT.CREATE");
    command.arg(definition.name.as_str());
    command.arg("ON").arg("JSON");
    command.arg("PREFIX").arg(1).arg(definition.prefix.as_str());

    command.arg("SCHEMA");
    for field in &definition.schema {
        command.arg(format!("$.{}", field.field_name));
        command.arg("AS").arg(field.field_name);
        match field.field_type {
            IndexFieldType::Tag => {
                command.arg("TAG");
                command.arg("SEPARATOR").arg(TAG_SEPARATOR);
            }
            IndexFieldType::Text => {
                command.arg("TEXT");
            }
            IndexFieldType::Numeric => {
                command.arg("NUMERIC");
            }
        }

        if field.sortable {
            command.arg("SORTABLE");
        }
    }

    if let Err(err) = command.query_async::<()>(conn).await {
        if index_exists_error(&err) {
            return Ok(());
        }
        return Err(err.into());
    }

    log::info!("created search index {}", definition.name);
    Ok(())
}

fn index_exists_error(err: &redis::RedisError) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("already exists") && msg.contains("index")
}

/// Runs a paged search. The total comes from `FT.SEARCH ... LIMIT 0 0`; the page
/// itself from `FT.AGGREGATE`, which can sort on the requested field and then on
/// `id`.
pub async fn execute_search(
    conn: &mut ConnectionManager,
    index_name: &str,
    params: &SearchParams,
) -> Result<Page<JsonValue>, RepoError> {
    let query = params.build_query();

    let mut count = cmd("FT.SEARCH");
    count.arg(index_name).arg(&query).arg("LIMIT").arg(0).arg(0).arg("DIALECT").arg(2);
    let raw: Value = count.query_async(conn).await?;
    let values: Vec<Value> = from_redis_value(&raw).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("Failed to parse search response: {}", err)),
    })?;
    let total = match values.first() {
        Some(value) => value_to_string(value)?.parse::<u64>().map_err(|_| RepoError::Other {
            message: Cow::Borrowed("Invalid total count in search response"),
        })?,
        None => 0,
    };

    let mut page = Page {
        items: Vec::new(),
        total_record: total,
        page: params.page,
        limit: params.limit,
    };
    if total == 0 || params.offset() >= total {
        return Ok(page);
    }

    let mut command = cmd("FT.AGGREGATE");
    command.arg(index_name).arg(&query);
    command.arg("LOAD").arg(1).arg("$");
    command
        .arg("SORTBY")
        .arg(4)
        .arg(format!("@{}", params.sort.field))
        .arg(params.sort.order.as_str())
        .arg("@id")
        .arg("ASC");
    command.arg("LIMIT").arg(params.offset()).arg(params.limit);
    command.arg("DIALECT").arg(2);

    let raw: Value = command.query_async(conn).await?;
    let rows: Vec<Value> = from_redis_value(&raw).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("Failed to parse aggregate response: {}", err)),
    })?;

    for row in rows.iter().skip(1) {
        let json_payload = extract_json_payload(row)?;
        let item: JsonValue = serde_json::from_str(&json_payload).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("Failed to deserialize search document: {}", err)),
        })?;
        page.items.push(item);
    }

    Ok(page)
}

fn extract_json_payload(value: &Value) -> Result<String, RepoError> {
    match value {
        Value::Array(items) => {
            for chunk in items.chunks(2) {
                if chunk.len() != 2 {
                    continue;
                }

                let alias = value_to_string(&chunk[0])?;
                if alias == "$" {
                    let payload = value_to_string(&chunk[1])?;
                    return normalize_json_payload(payload);
                }
            }

            Err(RepoError::Other {
                message: Cow::Borrowed("Search response missing JSON payload"),
            })
        }
        other => normalize_json_payload(value_to_string(other)?),
    }
}

fn normalize_json_payload(mut payload: String) -> Result<String, RepoError> {
    let trimmed = payload.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        let value: JsonValue = serde_json::from_str(trimmed).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("Failed to parse JSON payload array: {}", err)),
        })?;
        if let Some(first) = value.as_array().and_then(|arr| arr.first()) {
            payload = first.to_string();
        }
    }
    Ok(payload)
}

fn value_to_string(value: &Value) -> Result<String, RepoError> {
    match value {
        Value::BulkString(bytes) => String::from_utf8(bytes.clone()).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("Invalid UTF-8 in search response: {}", err)),
        }),
        Value::SimpleString(status) => Ok(status.clone()),
        Value::Int(v) => Ok(v.to_string()),
        Value::Double(v) => Ok(v.to_string()),
        Value::VerbatimString { text, .. } => Ok(text.clone()),
        _ => from_redis_value::<String>(value).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("Unexpected search value type: {}", err)),
        }),
    }
}

/// Escape a value for RediSearch TAG field queries.
///
/// ```
/// use platewise::search::escape_for_tag_query;
///
/// assert_eq!(escape_for_tag_query("active"), "active");
/// assert_eq!(escape_for_tag_query("abc-def"), "abc\\-def");
/// assert_eq!(escape_for_tag_query("a|b"), "a\\|b");
/// ```
pub fn escape_for_tag_query(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            // `-` is the NOT operator, `.` the JSON path separator
            '$' | '{' | '}' | '\\' | '|' | '.' | '-' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape and wrap a value in `*...*` for RediSearch TEXT substring matching.
///
/// ```
/// use platewise::search::escape_for_text_contains;
///
/// assert_eq!(escape_for_text_contains("pizza"), "*pizza*");
/// assert_eq!(escape_for_text_contains("a@b"), "*a\\@b*");
/// ```
pub fn escape_for_text_contains(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('*');
    for ch in value.chars() {
        match ch {
            // '-' and '/' are tokenizers in TEXT fields and stay as-is
            '\\' | '(' | ')' | '|' | '\'' | '"' | '[' | ']' | '{' | '}' | ':' | '@' | '?' | '~' | '&' | '!' | '.'
            | '*' | '%' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped.push('*');
    escaped
}

fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Post, User};
    use crate::types::Entity;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_to_first_page_newest_first() {
        let params = ListQuery::new().into_params(User::descriptor()).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
        assert_eq!(
            params.sort,
            SearchSort {
                field: "created_at_ts".to_string(),
                order: SortOrder::Desc
            }
        );
        assert_eq!(params.build_query(), "*");
    }

    #[test]
    fn parses_paging_sorting_and_filters() {
        let query = ListQuery::from_params(params(&[
            ("page", "2"),
            ("limit", "500"),
            ("sort_by", "username"),
            ("sort_type", "asc"),
            ("username", "ali"),
        ]))
        .unwrap();
        let params = query.into_params(User::descriptor()).unwrap();
        assert_eq!(params.page, 2);
        assert_eq!(params.limit, MAX_LIMIT);
        assert_eq!(params.offset(), 100);
        assert_eq!(params.sort.order, SortOrder::Asc);
        assert_eq!(params.build_query(), "(@username:*ali*)");
    }

    #[test]
    fn rejects_unknown_sort_and_filter() {
        let err = ListQuery::new()
            .sort("password_hash", SortOrder::Asc)
            .into_params(User::descriptor())
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidRequest { .. }));

        let err = ListQuery::new()
            .filter("password_hash", "x")
            .into_params(User::descriptor())
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidRequest { .. }));

        assert!(ListQuery::from_params(params(&[("page", "first")])).is_err());
        assert!(ListQuery::from_params(params(&[("sort_type", "sideways")])).is_err());
    }

    #[test]
    fn visibility_filter_applies_unless_inactive_requested() {
        let visible = ListQuery::new().into_params(Post::descriptor()).unwrap();
        assert_eq!(visible.build_query(), "(@active:{true})");

        let all = ListQuery::new().including_inactive().into_params(Post::descriptor()).unwrap();
        assert_eq!(all.build_query(), "*");
    }

    #[test]
    fn conditions_match_documents() {
        let doc = json!({"id": "p1", "title": "Best Pizza in Town", "author_id": "u1", "active": true, "rating": 4.5});
        assert!(FilterCondition::text_contains("title", "pizza").matches(&doc));
        assert!(!FilterCondition::text_contains("title", "sushi").matches(&doc));
        assert!(FilterCondition::tag_eq("author_id", "u1").matches(&doc));
        assert!(FilterCondition::bool_eq("active", true).matches(&doc));
        assert!(FilterCondition::numeric_range("rating", Some(4.0), None).matches(&doc));
        assert!(!FilterCondition::numeric_range("rating", Some(4.8), None).matches(&doc));
        assert!(!FilterCondition::tag_eq("missing", "x").matches(&doc));
    }

    #[test]
    fn compare_breaks_ties_by_id() {
        let params = SearchParams::new(SearchSort {
            field: "created_at_ts".into(),
            order: SortOrder::Desc,
        });
        let a = json!({"id": "a", "created_at_ts": 5});
        let b = json!({"id": "b", "created_at_ts": 5});
        let c = json!({"id": "c", "created_at_ts": 9});
        assert_eq!(params.compare(&a, &b), Ordering::Less);
        assert_eq!(params.compare(&c, &a), Ordering::Less);
    }

    #[test]
    fn builds_clauses() {
        assert_eq!(FilterCondition::tag_eq("owner_id", "ab-c").to_query_clause(), "(@owner_id:{ab\\-c})");
        assert_eq!(
            FilterCondition::numeric_range("rating", Some(4.0), None).to_query_clause(),
            "(@rating:[4 +inf])"
        );
        let both = FilterCondition::and([
            FilterCondition::bool_eq("active", true),
            FilterCondition::text_contains("name", "thai"),
        ]);
        assert_eq!(both.to_query_clause(), "((@active:{true}) (@name:*thai*))");
    }

    #[test]
    fn multi_word_contains_matches_each_term() {
        let condition = FilterCondition::text_contains("title", "best  pizza");
        assert_eq!(condition.to_query_clause(), "(@title:(*best* *pizza*))");

        let doc = json!({"title": "Pizza, the best in town"});
        assert!(condition.matches(&doc));
        assert!(!condition.matches(&json!({"title": "Best sushi"})));
    }

    #[test]
    fn offset_saturates_for_huge_pages() {
        let params = SearchParams::new(SearchSort {
            field: "created_at_ts".into(),
            order: SortOrder::Desc,
        })
        .with_page(u64::MAX, 10);
        assert_eq!(params.offset(), u64::MAX);
    }

    #[test]
    fn pagination_serializes_camel_case() {
        let page: Page<u8> = Page {
            items: vec![],
            total_record: 12,
            page: 2,
            limit: 10,
        };
        assert_eq!(
            serde_json::to_value(page.pagination()).unwrap(),
            json!({"totalRecord": 12, "limit": 10, "page": 2})
        );
    }
}
