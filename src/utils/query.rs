//! Builder for Strapi-style query strings.
//!
//! Bracketed keys (`filters[garden][id][$eq]`, `pagination[page]`) are kept
//! literal; values are form-encoded.

use url::form_urlencoded::byte_serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
    populated: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// `populate=*`
    pub fn populate_all(self) -> Self {
        self.param("populate", "*")
    }

    /// Indexed populate: `populate[0]=hero_image`, `populate[1]=...`.
    pub fn populate(mut self, field: &str) -> Self {
        let key = format!("populate[{}]", self.populated);
        self.populated += 1;
        self.param(key, field)
    }

    /// Unindexed populate: `populate=plant&populate=user`.
    pub fn populate_each(self, field: &str) -> Self {
        self.param("populate", field)
    }

    /// `filters[a][b][$eq]=value`
    pub fn filter_eq(self, path: &[&str], value: impl ToString) -> Self {
        self.filter(path, "$eq", value)
    }

    pub fn filter(self, path: &[&str], operator: &str, value: impl ToString) -> Self {
        let mut key = String::from("filters");
        for segment in path.iter().chain([&operator]) {
            key.push('[');
            key.push_str(segment);
            key.push(']');
        }
        self.param(key, value.to_string())
    }

    /// `sort=createdAt:desc`
    pub fn sort(self, order: &str) -> Self {
        self.param("sort", order)
    }

    pub fn page(self, page: u32) -> Self {
        self.param("pagination[page]", page.to_string())
    }

    pub fn page_size(self, size: u32) -> Self {
        self.param("pagination[pageSize]", size.to_string())
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The query without the leading `?`.
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| format!("{}={}", key, byte_serialize(value.as_bytes()).collect::<String>()))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Append the query to `base`.
    pub fn apply(&self, base: &str) -> String {
        if self.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, self.to_query_string())
        }
    }
}
