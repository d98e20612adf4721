use crate::config::CmsConfig;
use crate::core::{Document, DocumentStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which lifecycle states `find_all` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Published documents only, when the collection has drafts.
    #[default]
    Default,
    All,
    Only(DocumentStatus),
}

impl StatusFilter {
    /// `all`, a status name, or anything else for the default.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "all" => StatusFilter::All,
            other => other
                .parse()
                .map(StatusFilter::Only)
                .unwrap_or(StatusFilter::Default),
        }
    }
}

/// Listing request for `ContentEngine::find_all`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    /// Equality filters, applied verbatim.
    pub filters: Vec<(String, serde_json::Value)>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub locale: Option<String>,
    pub status: StatusFilter,
    /// `field` or `-field`; defaults to newest first.
    pub sort: Option<String>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Builds a query from URL query parameters. `page`, `limit`, `locale`,
    /// `status` and `sort` are reserved; every other parameter becomes an
    /// equality filter. Unparseable numbers fall back to the defaults.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut query = Self::new();
        let mut filters: Vec<(String, serde_json::Value)> = Vec::new();
        for (key, value) in params {
            match key.as_str() {
                "page" => query.page = value.parse().ok(),
                "limit" => query.limit = value.parse().ok(),
                "locale" => query.locale = Some(value.clone()),
                "status" => query.status = StatusFilter::parse(value),
                "sort" => query.sort = Some(value.clone()),
                _ => filters.push((key.clone(), serde_json::Value::String(value.clone()))),
            }
        }
        filters.sort_by(|a, b| a.0.cmp(&b.0));
        query.filters = filters;
        query
    }

    /// (page, limit, skip) after applying defaults and bounds.
    pub(crate) fn window(&self, config: &CmsConfig) -> (usize, usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = config.clamp_limit(self.limit);
        (page, limit, (page - 1).saturating_mul(limit))
    }
}

/// Options for `ContentEngine::find_one`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOneOptions {
    pub locale: Option<String>,
    /// Return stored locale maps untouched.
    pub raw: bool,
    /// Population request, e.g. `author,tags`.
    pub populate: Option<String>,
}

impl FindOneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn populate(mut self, spec: impl Into<String>) -> Self {
        self.populate = Some(spec.into());
        self
    }
}

/// One page of `find_all` results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedDocuments {
    pub docs: Vec<Document>,
    pub total_docs: usize,
    pub page: usize,
    pub total_pages: usize,
    pub limit: usize,
}

impl PaginatedDocuments {
    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Outcome of `ContentEngine::delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub id: String,
    pub deleted: bool,
}
