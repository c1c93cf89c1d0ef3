//! Page/size/sort/keyword handling shared by every list endpoint.
//!
//! Query values arrive as raw strings so that garbage input degrades to the
//! defaults instead of rejecting the request.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 50;

/// A sortable field: the name clients use and the column it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    pub name: &'static str,
    pub column: &'static str,
}

impl SortField {
    pub const fn new(name: &'static str, column: &'static str) -> Self {
        Self { name, column }
    }
}

pub const CREATED_AT: SortField = SortField::new("createdAt", "created_at");
pub const UPDATED_AT: SortField = SortField::new("updatedAt", "updated_at");
pub const TITLE: SortField = SortField::new("title", "title");
pub const EMAIL: SortField = SortField::new("email", "email");
pub const NAME: SortField = SortField::new("name", "name");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Parse `field,DIR`. Unknown fields fall back to the default field; the
    /// direction is ASC only when spelled so (case-insensitive), else the
    /// default direction applies when omitted and DESC otherwise.
    pub fn parse(raw: Option<&str>, allowed: &[SortField], default: Sort) -> Sort {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return default;
        };

        let mut parts = raw.splitn(2, ',');
        let field_name = parts.next().unwrap_or_default().trim();
        let direction_raw = parts.next().map(str::trim);

        let field = allowed
            .iter()
            .copied()
            .find(|f| f.name == field_name)
            .unwrap_or(default.field);

        let direction = match direction_raw {
            None | Some("") => default.direction,
            Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(_) => SortDirection::Desc,
        };

        Sort { field, direction }
    }

    /// `ORDER BY` body; ties broken by id in the same direction.
    pub fn order_by(&self, table_alias: &str) -> String {
        let dir = self.direction.as_sql();
        format!(
            "{alias}.{col} {dir}, {alias}.id {dir}",
            alias = table_alias,
            col = self.field.column,
        )
    }

    pub fn label(&self) -> String {
        format!("{},{}", self.field.name, self.direction.as_sql())
    }
}

/// Raw list query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub size: Option<String>,
    pub sort: Option<String>,
    pub keyword: Option<String>,
}

/// Validated page request handed to the stores.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    pub sort: Sort,
    /// Trimmed keyword; empty means no filter.
    pub keyword: String,
}

impl PageRequest {
    pub fn from_params(params: &PageParams, allowed: &[SortField], default_sort: Sort) -> Self {
        let page = parse_int(params.page.as_deref())
            .unwrap_or(0)
            .max(0);
        let size = parse_int(params.size.as_deref())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let sort = Sort::parse(params.sort.as_deref(), allowed, default_sort);
        let keyword = params
            .keyword
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        Self {
            page,
            size,
            sort,
            keyword,
        }
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    /// SQL LIKE pattern for the keyword, with `\` as the escape character.
    pub fn like_pattern(&self) -> Option<String> {
        if self.keyword.is_empty() {
            return None;
        }
        let escaped = self
            .keyword
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }
}

/// Leading-integer parse in the manner of query strings like `size=10abc`.
fn parse_int(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    let end = raw
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

/// Paginated response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub sort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: i64) -> Self {
        let total_pages = (total_elements + request.size - 1) / request.size;
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            sort: request.sort.label(),
            keyword: None,
        }
    }

    /// Echo the keyword back (even when empty).
    pub fn with_keyword(mut self, request: &PageRequest) -> Self {
        self.keyword = Some(request.keyword.clone());
        self
    }
}
