//! PostgREST query string building and `Content-Range` parsing.

/// Query parameters for a REST table request.
///
/// Parameters keep insertion order; reqwest percent-encodes them when the
/// request is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestQuery {
    params: Vec<(String, String)>,
}

impl RestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return (`select=`).
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    /// Equality predicate (`col=eq.value`).
    pub fn eq(mut self, column: &str, value: impl AsRef<str>) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value.as_ref())));
        self
    }

    /// Equality predicate only when a value is present.
    pub fn eq_opt(self, column: &str, value: Option<impl AsRef<str>>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// Non-null predicate (`col=not.is.null`).
    pub fn not_null(mut self, column: &str) -> Self {
        self.params
            .push((column.to_string(), "not.is.null".to_string()));
        self
    }

    /// Ordering clause, e.g. `published_at.desc.nullslast,created_at.desc`.
    pub fn order(mut self, clause: &str) -> Self {
        self.params.push(("order".to_string(), clause.to_string()));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.params.push(("offset".to_string(), offset.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Value of the first parameter named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Extract the total row count from a `Content-Range` header.
///
/// Accepts `0-4/23` and `*/0`. An unknown total (`0-4/*`) yields `None`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    if total == "*" {
        return None;
    }
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let query = RestQuery::new()
            .select("*")
            .eq("job_status", "published")
            .eq_opt("location", Some("Berlin"))
            .eq_opt("job_type", None::<&str>)
            .order("published_at.desc.nullslast,created_at.desc")
            .limit(5)
            .offset(10);

        let keys: Vec<&str> = query.params().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["select", "job_status", "location", "order", "limit", "offset"]);
        assert_eq!(query.get("location"), Some("eq.Berlin"));
        assert_eq!(query.get("offset"), Some("10"));
        assert_eq!(query.get("job_type"), None);
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range_total("0-4/23"), Some(23));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total(" 10-14/15 "), Some(15));
        assert_eq!(parse_content_range_total("0-4/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
